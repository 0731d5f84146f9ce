//! Serial transaction engine, mode control and duty-cycle gating
//!
//! These pieces are shared by every transceiver model. The models differ only
//! in the [`WireFormat`] and [`ModeCommands`] they plug in.

pub mod clock;
pub mod duty;
pub mod echo;
pub mod mode;
pub mod serial;
pub mod transaction;

#[cfg(test)]
pub(crate) mod mock;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::duty::DutyCycleGovernor;
pub use self::echo::{Echo, EchoSwitch, NullEcho, SharedEcho, TracingEcho};
pub use self::mode::{ModeCommands, ModeController};
pub use self::serial::{SerialChannel, SerialPortChannel};
pub use self::transaction::{Framing, Pacing, Response, TransactionEngine, WireFormat};
