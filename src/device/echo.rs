use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

/// Sink for the driver's diagnostic echo.
///
/// Echo is best effort and never changes control flow.
pub trait Echo: Send + Sync {
    /// Records a diagnostic line
    fn echo(&self, text: &str);

    /// Records a warning, by default as a plain line
    fn warn(&self, text: &str) {
        self.echo(text);
    }
}

/// Shared handle to an echo sink
pub type SharedEcho = Arc<dyn Echo>;

/// Forwards echo to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEcho;

impl Echo for TracingEcho {
    fn echo(&self, text: &str) {
        debug!(target: "sigfox::echo", "{}", text);
    }

    fn warn(&self, text: &str) {
        warn!(target: "sigfox::echo", "{}", text);
    }
}

/// Drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEcho;

impl Echo for NullEcho {
    fn echo(&self, _text: &str) {}
}

/// Switchable echo output shared by one transceiver and its parts.
///
/// The transceiver flips the switch; the engine, mode controller and duty
/// governor only ever see it as an [`Echo`].
pub struct EchoSwitch {
    /// (active sink, sink to restore on `on`)
    state: RwLock<(SharedEcho, SharedEcho)>,
}

impl EchoSwitch {
    /// Starts with tracing output enabled or silenced
    pub fn new(enabled: bool) -> Self {
        let tracing: SharedEcho = Arc::new(TracingEcho);
        let state = if enabled {
            (tracing.clone(), tracing)
        } else {
            (Arc::new(NullEcho) as SharedEcho, tracing)
        };
        EchoSwitch { state: RwLock::new(state) }
    }

    fn active(&self) -> SharedEcho {
        self.state.read().unwrap_or_else(|e| e.into_inner()).0.clone()
    }

    /// Restores the sink in use before the last `off` or `set`
    pub fn on(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.0 = state.1.clone();
    }

    /// Silences echo until `on`
    pub fn off(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut state.0, Arc::new(NullEcho));
        state.1 = previous;
    }

    /// Routes echo to `sink`
    pub fn set(&self, sink: SharedEcho) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut state.0, sink);
        state.1 = previous;
    }
}

impl Echo for EchoSwitch {
    fn echo(&self, text: &str) {
        self.active().echo(text);
    }

    fn warn(&self, text: &str) {
        self.active().warn(text);
    }
}
