use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::core::{Config, DeviceIdentity, Error, Result, Zone};
use crate::device::{
    Clock, DutyCycleGovernor, Echo, EchoSwitch, Framing, ModeController, Pacing, SerialChannel,
    SharedEcho, TransactionEngine, WireFormat,
};
use super::{retry_bring_up, validate_payload, Transceiver};

/// Response timeout of the module; a send with downlink takes close to a minute
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

const WIRE: WireFormat = WireFormat {
    label: "Wisol",
    bit_rate: 9600,
    marker: b'\r',
    framing: Framing::Text,
};

const CMD_END: &str = "\r";
const CMD_OUTPUT_POWER_MAX: &str = "ATS302=15";
const CMD_PRESEND: &str = "AT$GI?";
const CMD_PRESEND2: &str = "AT$RC";
const CMD_SEND_MESSAGE: &str = "AT$SF=";
const CMD_SEND_MESSAGE_RESPONSE: &str = ",1";
const CMD_GET_ID: &str = "AT$I=10";
const CMD_GET_PAC: &str = "AT$I=11";
const CMD_GET_TEMPERATURE: &str = "AT$T?";
const CMD_GET_VOLTAGE: &str = "AT$V?";
const CMD_RESET: &str = "AT$P=0";
const CMD_EMULATOR_DISABLE: &str = "ATS410=0";
const CMD_EMULATOR_ENABLE: &str = "ATS410=1";

const DOWNLINK_PREFIX: &str = "OK\nRX=";

/// Driver for Wisol WSSFM10R modules.
///
/// Commands are AT strings answered by `\r`-terminated lines. The module
/// accepts commands at any time, so mode switching is a no-op. Before every
/// send the output power is prepared for the current zone.
pub struct Wssfm10<S, C> {
    mode: ModeController<S, C>,
    duty: DutyCycleGovernor<C>,
    echo: Arc<EchoSwitch>,
    clock: C,
    config: Config,
    /// Zone used for output power; only tracked locally
    zone: Zone,
    device: String,
}

impl<S: SerialChannel, C: Clock> Wssfm10<S, C> {
    /// Creates a driver; the module is not touched until [`Transceiver::begin`]
    pub fn new(serial: S, clock: C, config: Config) -> Result<Self> {
        config.validate()?;
        let echo = Arc::new(EchoSwitch::new(config.echo));
        let shared: SharedEcho = echo.clone();

        let engine = TransactionEngine::new(
            serial,
            clock.clone(),
            WIRE,
            Pacing::from(&config),
            shared.clone(),
        );
        let timeout = config.command_timeout.unwrap_or(COMMAND_TIMEOUT);
        let mode = ModeController::new(engine, None, timeout, config.exit_retry_limit);
        let duty = DutyCycleGovernor::new(clock.clone(), &config, shared);

        Ok(Wssfm10 {
            mode,
            duty,
            echo,
            clock,
            zone: config.country.zone(),
            device: config.device.clone(),
            config,
        })
    }

    /// Device name or, after [`Transceiver::get_id`], the device ID
    pub fn device(&self) -> &str {
        &self.device
    }

    fn command(&mut self, cmd: &str) -> Result<String> {
        let line = format!("{}{}", cmd, CMD_END);
        self.mode.with_command(|m| Ok(m.transact(&line, 1)?.body))
    }

    /// Prepares the output power for the zone before a send
    fn set_output_power(&mut self) -> Result<()> {
        match self.zone {
            Zone::Rcz1 | Zone::Rcz3 => {
                self.command(CMD_OUTPUT_POWER_MAX)?;
            }
            Zone::Rcz2 | Zone::Rcz4 => {
                let data = self.command(CMD_PRESEND)?;
                let (x, y) = parse_presend(&data).unwrap_or_else(|| {
                    self.echo.warn(&format!(" - Wisol.set_output_power: Unknown response: {}", data));
                    (0, 0)
                });
                debug!("Presend returned x={}, y={}", x, y);
                if x == 0 || y < 3 {
                    if let Err(e) = self.command(CMD_PRESEND2) {
                        self.echo.warn(&format!(" - Wisol.set_output_power: {} failed: {}", CMD_PRESEND2, e));
                    }
                }
            }
        }
        Ok(())
    }

    /// Shared send path; returns the raw reply body
    fn transmit(&mut self, payload: &str, downlink: bool) -> Result<String> {
        validate_payload(payload)?;
        self.duty.check()?;
        self.mode.ensure_send()?;
        self.set_output_power()?;

        let (suffix, markers) = if downlink {
            // "OK\r" then "RX=..\r"
            (CMD_SEND_MESSAGE_RESPONSE, 2)
        } else {
            ("", 1)
        };
        let message = format!("{}{}{}{}", CMD_SEND_MESSAGE, payload, suffix, CMD_END);
        let response = self.mode.transact(&message, markers)?;
        self.echo.echo(&response.body);
        self.duty.record_send();
        info!("Message sent: {}", payload);
        Ok(response.body)
    }

    fn bring_up(&mut self) -> Result<()> {
        if self.config.use_emulator {
            self.enable_emulator()?;
        } else {
            self.disable_emulator()?;
        }

        let identity = self.get_id()?;
        self.echo.echo(&format!(" - SIGFOX ID = {}", identity.id));
        self.echo.echo(&format!(" - PAC = {}", identity.pac));

        let zone = self.config.country.zone();
        self.set_frequency_zone(zone)?;
        let actual = self.get_frequency_zone()?;
        self.echo.echo(&format!(" - Frequency (expecting {}) = {}", zone, actual));
        Ok(())
    }
}

impl<S: SerialChannel, C: Clock> Transceiver for Wssfm10<S, C> {
    fn begin(&mut self) -> Result<()> {
        self.duty.reset();
        let clock = self.clock.clone();
        let echo = self.echo.clone();
        let (attempts, delay) = (self.config.init_attempts, self.config.init_delay);
        retry_bring_up(&clock, attempts, delay, echo.as_ref(), || self.bring_up())
    }

    fn is_ready(&self) -> bool {
        self.duty.is_ready()
    }

    fn send_message(&mut self, payload: &str) -> Result<()> {
        self.echo.echo(&format!(" - Wisol.send_message: {},{}", self.device, payload));
        self.transmit(payload, false)?;
        Ok(())
    }

    fn send_message_and_get_response(&mut self, payload: &str) -> Result<Option<String>> {
        self.echo.echo(&format!(" - Wisol.send_message_and_get_response: {},{}", self.device, payload));
        let body = self.transmit(payload, true)?;
        // OK\nRX=01 23 45 67 89 AB CD EF
        Ok(Some(body.replace(DOWNLINK_PREFIX, "").replace(' ', "")))
    }

    fn get_id(&mut self) -> Result<DeviceIdentity> {
        let id = self.command(CMD_GET_ID)?;
        self.device = id.clone();
        let pac = self.command(CMD_GET_PAC)?;
        self.echo.echo(&format!(" - Wisol.get_id: returned id={}, pac={}", id, pac));
        Ok(DeviceIdentity { id, pac })
    }

    fn get_temperature(&mut self) -> Result<f32> {
        let data = self.command(CMD_GET_TEMPERATURE)?;
        let tenths: i32 = data.trim().parse().map_err(|_| Error::unexpected(data.clone()))?;
        let temperature = tenths as f32 / 10.0;
        self.echo.echo(&format!(" - Wisol.get_temperature: returned {}", temperature));
        Ok(temperature)
    }

    fn get_voltage(&mut self) -> Result<f32> {
        let data = self.command(CMD_GET_VOLTAGE)?;
        let millivolts: f32 = data.trim().parse().map_err(|_| Error::unexpected(data.clone()))?;
        let voltage = millivolts / 1000.0;
        self.echo.echo(&format!(" - Wisol.get_voltage: returned {}", voltage));
        Ok(voltage)
    }

    fn get_frequency_zone(&mut self) -> Result<Zone> {
        Ok(self.zone)
    }

    fn set_frequency_zone(&mut self, zone: Zone) -> Result<()> {
        // TODO: send AT$IF with the zone's uplink frequency once modules
        // without factory zone settings need it
        self.echo.echo(&format!(" - Wisol.set_frequency_zone: {}", zone));
        self.zone = zone;
        Ok(())
    }

    fn enable_emulator(&mut self) -> Result<()> {
        self.echo.echo(" - Enabling SNEK emulation mode...");
        self.echo.warn(" - WARNING: SNEK emulation mode will NOT work with a Sigfox network");
        self.command(CMD_EMULATOR_ENABLE)?;
        Ok(())
    }

    fn disable_emulator(&mut self) -> Result<()> {
        self.echo.echo(" - Disabling SNEK emulation mode...");
        self.command(CMD_EMULATOR_DISABLE)?;
        Ok(())
    }

    fn get_emulator(&mut self) -> Result<bool> {
        Err(Error::Unsupported("get_emulator"))
    }

    fn reboot(&mut self) -> Result<()> {
        self.echo.echo(" - Wisol.reboot");
        self.command(CMD_RESET)?;
        Ok(())
    }

    fn echo_on(&mut self) {
        self.echo.on();
        self.echo.echo(" - Wisol.echo_on");
    }

    fn echo_off(&mut self) {
        self.echo.echo(" - Wisol.echo_off");
        self.echo.off();
    }

    fn set_echo(&mut self, sink: SharedEcho) {
        self.echo.set(sink);
    }
}

/// Parses the `X,Y` reply of the presend query
fn parse_presend(data: &str) -> Option<(u32, u32)> {
    let (x, y) = data.trim().split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}
