use std::time::{Duration, Instant};

use crate::core::{Config, Error, Result};
use crate::protocol::hex;
use super::clock::Clock;
use super::echo::SharedEcho;
use super::serial::SerialChannel;

/// How an outgoing buffer maps onto wire units and how replies are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Buffer holds hex digit pairs, each sent as one raw byte; replies are
    /// rendered back as hex digits
    Binary,
    /// Buffer holds text sent character by character; replies are kept as text
    Text,
}

/// Line settings of one module type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireFormat {
    /// Name used in echo lines
    pub label: &'static str,
    /// Serial bit rate
    pub bit_rate: u32,
    /// Byte that ends one response from the module
    pub marker: u8,
    /// Buffer encoding
    pub framing: Framing,
}

/// Delays applied around serial I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Wait after opening the channel
    pub open_settle: Duration,
    /// Wait after each outbound unit; slow UARTs have no FIFO
    pub write_pacing: Duration,
    /// Wait between polls when nothing has arrived
    pub poll_interval: Duration,
}

impl From<&Config> for Pacing {
    fn from(config: &Config) -> Self {
        Pacing {
            open_settle: config.open_settle,
            write_pacing: config.write_pacing,
            poll_interval: config.poll_interval,
        }
    }
}

/// Result of one request/response exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Reply with markers removed
    pub body: String,
    /// Number of markers seen
    pub markers: usize,
    /// Reply byte offsets at which each marker arrived
    pub marker_offsets: Vec<usize>,
}

impl Response {
    /// True for a reply with no body and no markers
    pub fn is_silent(&self) -> bool {
        self.body.is_empty() && self.markers == 0
    }
}

/// Closes the channel when dropped, whatever way the transaction ends
struct OpenChannel<'a, S: SerialChannel>(&'a mut S);

impl<S: SerialChannel> Drop for OpenChannel<'_, S> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Executes markered request/response transactions over a serial channel
pub struct TransactionEngine<S, C> {
    serial: S,
    clock: C,
    wire: WireFormat,
    pacing: Pacing,
    echo: SharedEcho,
    /// Log transactions without touching the channel
    offline: bool,
}

impl<S: SerialChannel, C: Clock> TransactionEngine<S, C> {
    /// Creates an engine; the channel stays closed until a transaction runs
    pub fn new(serial: S, clock: C, wire: WireFormat, pacing: Pacing, echo: SharedEcho) -> Self {
        TransactionEngine {
            serial,
            clock,
            wire,
            pacing,
            echo,
            offline: false,
        }
    }

    /// When offline, every transaction succeeds at once with an empty reply
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Line settings of this engine
    pub fn wire(&self) -> &WireFormat {
        &self.wire
    }

    /// Diagnostic sink
    pub fn echo(&self) -> &SharedEcho {
        &self.echo
    }

    /// Sends `outgoing` while collecting the reply.
    ///
    /// The deadline restarts after every unit sent, so `timeout` bounds the
    /// silence after the last one. The transaction ends early once
    /// `expected_markers` markers arrived; with fewer it fails with
    /// [`Error::Timeout`] when nothing came back and
    /// [`Error::UnexpectedResponse`] otherwise.
    pub fn execute(&mut self, outgoing: &str, timeout: Duration, expected_markers: usize) -> Result<Response> {
        let label = self.wire.label;
        self.echo.echo(&format!("{}.send_buffer: {}", label, outgoing));
        if self.offline {
            return Ok(Response::default());
        }

        let units = self.encode_units(outgoing);
        let mut received: Vec<u8> = Vec::new();
        let mut marker_offsets: Vec<usize> = Vec::new();

        self.serial.open(self.wire.bit_rate)?;
        {
            let channel = OpenChannel(&mut self.serial);
            self.clock.sleep(self.pacing.open_settle);

            let mut deadline = Self::deadline(&self.clock, timeout);
            let mut next = 0;
            loop {
                if next < units.len() {
                    channel.0.write_byte(units[next])?;
                    next += 1;
                    self.clock.sleep(self.pacing.write_pacing);
                    deadline = Self::deadline(&self.clock, timeout);
                }

                if self.clock.now() > deadline {
                    break;
                }

                if channel.0.available()? == 0 {
                    if next >= units.len() {
                        self.clock.sleep(self.pacing.poll_interval);
                    }
                    continue;
                }

                let Some(byte) = channel.0.read_byte()? else {
                    continue;
                };
                if byte == self.wire.marker {
                    marker_offsets.push(received.len());
                    if marker_offsets.len() >= expected_markers {
                        break;
                    }
                } else {
                    received.push(byte);
                }
            }
        }

        self.echo.echo(&self.trace(">> ", &units, &[]));
        self.echo.echo(&self.trace("<< ", &received, &marker_offsets));

        let response = Response {
            body: self.render(&received),
            markers: marker_offsets.len(),
            marker_offsets,
        };

        if response.markers < expected_markers {
            if received.is_empty() {
                self.echo.warn(&format!("{}.send_buffer: Error: No response", label));
                return Err(Error::Timeout(timeout));
            }
            self.echo.warn(&format!("{}.send_buffer: Error: Unknown response: {}", label, response.body));
            return Err(Error::unexpected(response.body));
        }
        self.echo.echo(&format!("{}.send_buffer: response: {}", label, response.body));
        Ok(response)
    }

    /// `timeout` from now, saturating at the furthest representable instant
    fn deadline(clock: &C, timeout: Duration) -> Instant {
        let now = clock.now();
        now.checked_add(timeout).unwrap_or_else(|| far_future(now))
    }

    fn encode_units(&self, outgoing: &str) -> Vec<u8> {
        match self.wire.framing {
            Framing::Text => outgoing.as_bytes().to_vec(),
            Framing::Binary => {
                if !hex::is_hex(outgoing) {
                    self.echo.warn(&format!("{}.send_buffer: Error: Invalid hex buffer {}", self.wire.label, outgoing));
                }
                let digits: Vec<char> = outgoing.chars().collect();
                digits
                    .chunks(2)
                    .map(|pair| hex::decode_byte(pair[0], pair.get(1).copied().unwrap_or('0')))
                    .collect()
            }
        }
    }

    fn render(&self, bytes: &[u8]) -> String {
        match self.wire.framing {
            Framing::Binary => hex::encode_bytes(bytes),
            Framing::Text => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Renders a buffer for the echo with markers shown where they arrived
    fn trace(&self, prefix: &str, bytes: &[u8], marker_offsets: &[usize]) -> String {
        let marker = hex::encode_bytes(&[self.wire.marker]);
        let mut line = String::from(prefix);
        let mut markers = marker_offsets.iter().peekable();
        for i in 0..=bytes.len() {
            while markers.next_if(|&&offset| offset == i).is_some() {
                match self.wire.framing {
                    Framing::Binary => line.push_str(&format!("{} ", marker)),
                    Framing::Text => line.push_str(&format!("0x{}", marker)),
                }
            }
            if let Some(&b) = bytes.get(i) {
                match self.wire.framing {
                    Framing::Binary => line.push_str(&format!("{} ", hex::encode_bytes(&[b]))),
                    Framing::Text => line.push(b as char),
                }
            }
        }
        line
    }
}

/// Latest instant reachable from `now`, found by halving the step
fn far_future(now: Instant) -> Instant {
    let mut step = Duration::MAX;
    let mut far = now;
    while !step.is_zero() {
        if let Some(later) = far.checked_add(step) {
            far = later;
        }
        step /= 2;
    }
    far
}
