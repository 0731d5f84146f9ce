use std::time::Duration;

use tracing::debug;

use crate::core::{DeviceMode, Error, Result};
use super::clock::Clock;
use super::serial::SerialChannel;
use super::transaction::{Response, TransactionEngine};

/// Command buffers that switch a module between modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCommands {
    /// Send to Command, answered by one marker
    pub enter_command: &'static str,
    /// Command to Send, acknowledged by silence
    pub exit_command: &'static str,
    /// Command to Config, answered by one marker
    pub enter_config: &'static str,
    /// Config to Command, answered by one marker
    pub exit_config: &'static str,
}

/// Tracks the module's mode and drives the transitions between them.
///
/// The tracked mode is the driver's own belief and is never read back from
/// the module. A mismatch on entry to a transition is only logged.
pub struct ModeController<S, C> {
    engine: TransactionEngine<S, C>,
    /// `None` for modules that take commands in any mode
    commands: Option<ModeCommands>,
    mode: DeviceMode,
    timeout: Duration,
    exit_retry_limit: u32,
}

impl<S: SerialChannel, C: Clock> ModeController<S, C> {
    /// Creates a controller tracking Send mode, as after power-up
    pub fn new(
        engine: TransactionEngine<S, C>,
        commands: Option<ModeCommands>,
        timeout: Duration,
        exit_retry_limit: u32,
    ) -> Self {
        ModeController {
            engine,
            commands,
            mode: DeviceMode::Send,
            timeout,
            exit_retry_limit,
        }
    }

    /// Mode the driver believes the module is in
    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// Response timeout for transactions run through this controller
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one transaction in whatever mode is current
    pub fn transact(&mut self, outgoing: &str, expected_markers: usize) -> Result<Response> {
        self.engine.execute(outgoing, self.timeout, expected_markers)
    }

    fn expect_mode(&self, expected: DeviceMode, operation: &str) {
        if self.mode != expected {
            self.engine.echo().warn(&format!(
                "{}.{} did not detect expected {:?} mode, may be in incorrect mode",
                self.engine.wire().label,
                operation,
                expected
            ));
        }
    }

    /// Switches from Send to Command mode
    pub fn enter_command(&mut self) -> Result<()> {
        let Some(commands) = self.commands else {
            self.mode = DeviceMode::Command;
            return Ok(());
        };
        self.expect_mode(DeviceMode::Send, "enter_command");
        let response = self.transact(commands.enter_command, 1)?;
        if !response.body.is_empty() || response.markers != 1 {
            self.engine.echo().warn(&format!(
                "{}.enter_command did not receive expected marker, may be in incorrect mode",
                self.engine.wire().label
            ));
        }
        self.mode = DeviceMode::Command;
        debug!("Entered command mode");
        Ok(())
    }

    /// Switches from Command back to Send mode.
    ///
    /// Stale input can swallow the acknowledgment, so the exit command is
    /// resent until the module answers with silence. Gives up with
    /// [`Error::ModeStuck`] after `exit_retry_limit` attempts.
    pub fn exit_command(&mut self) -> Result<()> {
        let Some(commands) = self.commands else {
            self.mode = DeviceMode::Send;
            return Ok(());
        };
        self.expect_mode(DeviceMode::Command, "exit_command");
        for attempt in 1..=self.exit_retry_limit {
            let response = self.transact(commands.exit_command, 0)?;
            if response.is_silent() {
                self.mode = DeviceMode::Send;
                debug!("Exited command mode after {} attempt(s)", attempt);
                return Ok(());
            }
            self.engine.echo().warn(&format!(
                "{}.exit_command resending exit command, may be in incorrect mode",
                self.engine.wire().label
            ));
        }
        Err(Error::ModeStuck(self.exit_retry_limit))
    }

    /// Switches from Send to Config mode through Command mode.
    ///
    /// If the module refuses Config mode it is taken back to Send mode
    /// before the error is returned.
    pub fn enter_config(&mut self) -> Result<()> {
        self.enter_command()?;
        let Some(commands) = self.commands else {
            self.mode = DeviceMode::Config;
            return Ok(());
        };
        self.expect_mode(DeviceMode::Command, "enter_config");
        if let Err(e) = self.transact(commands.enter_config, 1) {
            self.exit_command()?;
            return Err(e);
        }
        self.mode = DeviceMode::Config;
        debug!("Entered config mode");
        Ok(())
    }

    /// Switches from Config back to Send mode through Command mode
    pub fn exit_config(&mut self) -> Result<()> {
        if let Some(commands) = self.commands {
            self.expect_mode(DeviceMode::Config, "exit_config");
            self.transact(commands.exit_config, 1)?;
        }
        self.mode = DeviceMode::Command;
        self.exit_command()
    }

    /// Brings the module back to Send mode from wherever it is believed to be
    pub fn ensure_send(&mut self) -> Result<()> {
        match self.mode {
            DeviceMode::Send => Ok(()),
            DeviceMode::Command => self.exit_command(),
            DeviceMode::Config => self.exit_config(),
        }
    }

    /// Runs `f` in Command mode and returns to Send mode whatever `f` returned.
    ///
    /// A failed exit takes precedence over the result of `f`.
    pub fn with_command<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.enter_command()?;
        let result = f(self);
        self.exit_command()?;
        result
    }

    /// Runs `f` in Config mode and returns to Send mode whatever `f` returned
    pub fn with_config<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.enter_config()?;
        let result = f(self);
        self.exit_config()?;
        result
    }
}
