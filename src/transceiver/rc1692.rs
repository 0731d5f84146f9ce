use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::core::{Config, DeviceIdentity, Error, Result, Zone, MAX_HEX_DIGITS};
use crate::device::{
    Clock, DutyCycleGovernor, Echo, EchoSwitch, Framing, ModeCommands, ModeController, Pacing,
    SerialChannel, SharedEcho, TransactionEngine, WireFormat,
};
use crate::protocol::hex::{self, ToHex};
use super::{retry_bring_up, validate_payload, Transceiver};

/// Response timeout of the module
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

const WIRE: WireFormat = WireFormat {
    label: "Radiocrafts",
    bit_rate: 19200,
    marker: b'>',
    framing: Framing::Binary,
};

const MODE_COMMANDS: ModeCommands = ModeCommands {
    enter_command: "00",
    exit_command: "58",  // 'X'
    enter_config: "4d",  // 'M'
    exit_config: "ff",
};

const CMD_GET_ID: char = '9';
const CMD_GET_TEMPERATURE: char = 'U';
const CMD_GET_VOLTAGE: char = 'V';
const CMD_READ_MEMORY: char = 'Y';

const PARAM_FREQUENCY_DOMAIN: u8 = 0x00;
const PARAM_RF_POWER: u8 = 0x01;
const PARAM_PUBLIC_KEY: u8 = 0x28;

// Stand-in readings while emulating, when the module is not queried
const EMULATED_TEMPERATURE: f32 = 36.0;
const EMULATED_VOLTAGE: f32 = 12.3;

/// Driver for Radiocrafts RC1692HP modules.
///
/// Payload bytes travel raw, framed by a leading length byte. Management
/// commands need the module in Command or Config mode, which the driver
/// enters and leaves around every command. With `use_emulator` set, no
/// traffic reaches the serial port and readings fall back to fixed values.
pub struct Rc1692<S, C> {
    mode: ModeController<S, C>,
    duty: DutyCycleGovernor<C>,
    echo: Arc<EchoSwitch>,
    clock: C,
    config: Config,
    /// Device name, replaced by the ID once read
    device: String,
}

impl<S: SerialChannel, C: Clock> Rc1692<S, C> {
    /// Creates a driver; the module is not touched until [`Transceiver::begin`]
    pub fn new(serial: S, clock: C, config: Config) -> Result<Self> {
        config.validate()?;
        let echo = Arc::new(EchoSwitch::new(config.echo));
        let shared: SharedEcho = echo.clone();

        let mut engine = TransactionEngine::new(
            serial,
            clock.clone(),
            WIRE,
            Pacing::from(&config),
            shared.clone(),
        );
        engine.set_offline(config.use_emulator);

        let timeout = config.command_timeout.unwrap_or(COMMAND_TIMEOUT);
        let mode = ModeController::new(engine, Some(MODE_COMMANDS), timeout, config.exit_retry_limit);
        let duty = DutyCycleGovernor::new(clock.clone(), &config, shared);

        Ok(Rc1692 {
            mode,
            duty,
            echo,
            clock,
            device: config.device.clone(),
            config,
        })
    }

    /// Device name or, after [`Transceiver::get_id`], the device ID
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Mode controller, for inspecting the tracked mode
    pub fn mode(&self) -> &ModeController<S, C> {
        &self.mode
    }

    fn command(&mut self, cmd: &str, expected_markers: usize) -> Result<String> {
        self.mode
            .with_command(|m| Ok(m.transact(cmd, expected_markers)?.body))
    }

    fn config_command(&mut self, cmd: &str) -> Result<String> {
        self.mode.with_config(|m| Ok(m.transact(cmd, 0)?.body))
    }

    /// Reads the module memory at `address`, returned as hex digits
    pub fn get_parameter(&mut self, address: u8) -> Result<String> {
        // One marker for the command, one for the response
        let value = self.command(&format!("{}{}", CMD_READ_MEMORY.to_hex(), address.to_hex()), 2)?;
        self.echo.echo(&format!(
            " - Radiocrafts.get_parameter: address=0x{} returned {}",
            address.to_hex(),
            value
        ));
        Ok(value)
    }

    /// Output power step-down
    pub fn get_power(&mut self) -> Result<u8> {
        let value = self.get_parameter(PARAM_RF_POWER)?;
        parse_byte(&value)
    }

    /// Reads a one-byte reading, falling back to `emulated` while emulating
    fn read_byte_or<T>(
        &mut self,
        cmd: char,
        operation: &str,
        emulated: T,
        convert: impl FnOnce(u8) -> T,
    ) -> Result<T> {
        let data = self.command(&cmd.to_hex(), 1)?;
        match parse_byte(&data) {
            Ok(byte) => Ok(convert(byte)),
            Err(_) if self.config.use_emulator => Ok(emulated),
            Err(e) => {
                self.echo.warn(&format!(" - Radiocrafts.{}: Unknown response: {}", operation, data));
                Err(e)
            }
        }
    }

    fn bring_up(&mut self) -> Result<()> {
        if self.config.use_emulator {
            self.enable_emulator()?;
        } else {
            self.echo.echo(" - Disabling emulation mode...");
            self.disable_emulator()?;
            self.echo.echo(" - Checking emulation mode (expecting 0)...");
            if self.get_emulator()? {
                self.echo.warn(" - Radiocrafts.begin: Emulation mode still enabled");
            }
        }

        let identity = self.get_id()?;
        self.echo.echo(&format!(" - SIGFOX ID = {}", identity.id));
        self.echo.echo(&format!(" - PAC = {}", identity.pac));

        let zone = self.config.country.zone();
        self.echo.echo(&format!(" - Setting frequency for country {}", self.config.country));
        self.set_frequency_zone(zone)?;

        let actual = self.get_frequency_zone()?;
        self.echo.echo(&format!(" - Frequency (expecting {}) = {}", zone, actual));
        Ok(())
    }
}

impl<S: SerialChannel, C: Clock> Transceiver for Rc1692<S, C> {
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
        self.echo.echo(&format!(" - Radiocrafts.send_message: {},{}", self.device, payload));
        validate_payload(payload)?;
        self.duty.check()?;
        self.mode.ensure_send()?;

        // First byte is the payload length
        let message = format!("{}{}", ((payload.len() / 2) as u8).to_hex(), payload);
        let response = self.mode.transact(&message, 0)?;
        self.echo.echo(&response.body);
        self.duty.record_send();
        info!("Message sent: {}", payload);
        Ok(())
    }

    fn send_message_and_get_response(&mut self, payload: &str) -> Result<Option<String>> {
        self.send_message(payload)?;
        Ok(None)
    }

    fn get_id(&mut self) -> Result<DeviceIdentity> {
        let data = self.command(&CMD_GET_ID.to_hex(), 1)?;
        // 4 bytes ID, least significant first, then 8 bytes PAC
        if data.len() != MAX_HEX_DIGITS || !hex::is_hex(&data) {
            if self.config.use_emulator {
                return Ok(DeviceIdentity {
                    id: self.device.clone(),
                    pac: String::new(),
                });
            }
            self.echo.warn(&format!(" - Radiocrafts.get_id: Unknown response: {}", data));
            return Err(Error::unexpected(data));
        }
        let id: String = (0..4).rev().map(|i| &data[i * 2..i * 2 + 2]).collect();
        let pac = data[8..].to_string();
        self.device = id.clone();
        self.echo.echo(&format!(" - Radiocrafts.get_id: returned id={}, pac={}", id, pac));
        Ok(DeviceIdentity { id, pac })
    }

    fn get_temperature(&mut self) -> Result<f32> {
        let temperature = self.read_byte_or(CMD_GET_TEMPERATURE, "get_temperature", EMULATED_TEMPERATURE, |b| {
            (b as i32 - 128) as f32
        })?;
        self.echo.echo(&format!(" - Radiocrafts.get_temperature: returned {}", temperature));
        Ok(temperature)
    }

    fn get_voltage(&mut self) -> Result<f32> {
        let voltage = self.read_byte_or(CMD_GET_VOLTAGE, "get_voltage", EMULATED_VOLTAGE, |b| 0.030 * b as f32)?;
        self.echo.echo(&format!(" - Radiocrafts.get_voltage: returned {}", voltage));
        Ok(voltage)
    }

    fn get_frequency_zone(&mut self) -> Result<Zone> {
        let cmd = format!("{}{}", CMD_READ_MEMORY.to_hex(), PARAM_FREQUENCY_DOMAIN.to_hex());
        let data = self.command(&cmd, 1)?;
        // The module stores the zone number minus one
        let zone = parse_byte(&data)
            .ok()
            .and_then(|domain| Zone::from_number(domain.wrapping_add(1)));
        match zone {
            Some(zone) => Ok(zone),
            None if self.config.use_emulator => Ok(self.config.country.zone()),
            None => Err(Error::unexpected(data)),
        }
    }

    fn set_frequency_zone(&mut self, zone: Zone) -> Result<()> {
        debug!("Setting frequency zone {}", zone);
        let cmd = format!("{}{}", PARAM_FREQUENCY_DOMAIN.to_hex(), (zone.number() - 1).to_hex());
        self.config_command(&cmd)?;
        Ok(())
    }

    fn enable_emulator(&mut self) -> Result<()> {
        self.config_command(&format!("{}01", PARAM_PUBLIC_KEY.to_hex()))?;
        Ok(())
    }

    fn disable_emulator(&mut self) -> Result<()> {
        self.config_command(&format!("{}00", PARAM_PUBLIC_KEY.to_hex()))?;
        Ok(())
    }

    fn get_emulator(&mut self) -> Result<bool> {
        let value = self.get_parameter(PARAM_PUBLIC_KEY)?;
        if value.is_empty() && self.config.use_emulator {
            return Ok(true);
        }
        Ok(parse_byte(&value)? != 0)
    }

    fn reboot(&mut self) -> Result<()> {
        self.echo.warn(" - Radiocrafts.reboot: ERROR - Not implemented");
        Err(Error::Unsupported("reboot"))
    }

    fn write_settings(&mut self) -> Result<()> {
        self.echo.warn(" - Radiocrafts.write_settings: ERROR - Not implemented");
        Err(Error::Unsupported("write_settings"))
    }

    fn echo_on(&mut self) {
        self.echo.on();
        self.echo.echo(" - Radiocrafts.echo_on");
    }

    fn echo_off(&mut self) {
        self.echo.echo(" - Radiocrafts.echo_off");
        self.echo.off();
    }

    fn set_echo(&mut self, sink: SharedEcho) {
        self.echo.set(sink);
    }
}

/// Parses a reply of exactly one byte
fn parse_byte(data: &str) -> Result<u8> {
    let mut digits = data.chars();
    match (digits.next(), digits.next(), digits.next()) {
        (Some(high), Some(low), None) => {
            match (hex::try_decode_hex_digit(high), hex::try_decode_hex_digit(low)) {
                (Some(h), Some(l)) => Ok((h << 4) | l),
                _ => Err(Error::unexpected(data)),
            }
        }
        _ => Err(Error::unexpected(data)),
    }
}
