use std::time::{Duration, Instant};

use crate::core::{Config, Error, Result};
use super::clock::Clock;
use super::echo::SharedEcho;

/// Gates transmissions on the time since the last successful send.
///
/// Sends closer together than `floor` are refused. Sends closer than
/// `interval` go through with an advisory warning.
pub struct DutyCycleGovernor<C> {
    clock: C,
    last_send: Option<Instant>,
    floor: Duration,
    interval: Duration,
    echo: SharedEcho,
}

impl<C: Clock> DutyCycleGovernor<C> {
    /// Creates a governor with no send recorded, taking its limits from `config`
    pub fn new(clock: C, config: &Config, echo: SharedEcho) -> Self {
        DutyCycleGovernor {
            clock,
            last_send: None,
            floor: config.min_send_spacing,
            interval: config.send_interval,
            echo,
        }
    }

    /// Time since the last recorded send, `None` before the first one
    pub fn elapsed(&self) -> Option<Duration> {
        self.last_send.map(|at| self.clock.now().saturating_duration_since(at))
    }

    /// Returns true when a send may proceed
    pub fn is_ready(&self) -> bool {
        self.check().is_ok()
    }

    /// Like [`is_ready`](Self::is_ready) but reports the violation
    pub fn check(&self) -> Result<()> {
        let Some(elapsed) = self.elapsed() else {
            return Ok(());
        };
        if elapsed <= self.floor {
            self.echo.warn(&format!(
                "***MESSAGE NOT SENT - Must wait {} seconds, only {:.1} elapsed",
                self.floor.as_secs(),
                elapsed.as_secs_f64()
            ));
            return Err(Error::DutyCycleViolation(elapsed));
        }
        if elapsed < self.interval {
            self.echo.warn(&format!(
                "Warning: Should wait {} mins before sending the next message",
                self.interval.as_secs() / 60
            ));
        }
        Ok(())
    }

    /// Marks now as the time of the last successful send
    pub fn record_send(&mut self) {
        self.last_send = Some(self.clock.now());
    }

    /// Forgets the last send, as after a device restart
    pub fn reset(&mut self) {
        self.last_send = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::device::clock::ManualClock;
    use crate::device::mock::RecordingEcho;

    fn governor() -> (DutyCycleGovernor<ManualClock>, ManualClock, Arc<RecordingEcho>) {
        let clock = ManualClock::new();
        let echo = Arc::new(RecordingEcho::default());
        let governor = DutyCycleGovernor::new(clock.clone(), &Config::default(), echo.clone());
        (governor, clock, echo)
    }

    #[test]
    fn test_ready_before_first_send() {
        let (governor, _, echo) = governor();
        assert!(governor.is_ready());
        assert!(governor.elapsed().is_none());
        assert!(echo.lines().is_empty());
    }

    #[test]
    fn test_floor_vetoes_then_releases() {
        let (mut governor, clock, echo) = governor();
        governor.record_send();

        clock.advance(Duration::from_secs(1));
        assert!(!governor.is_ready());
        assert!(echo.contains("MESSAGE NOT SENT"));

        clock.advance(Duration::from_secs(1));
        assert!(matches!(governor.check(), Err(Error::DutyCycleViolation(_))));

        clock.advance(Duration::from_millis(1));
        assert!(governor.is_ready());
        assert!(echo.contains("Should wait 10 mins"));
    }

    #[test]
    fn test_no_warning_after_interval() {
        let (mut governor, clock, echo) = governor();
        governor.record_send();
        clock.advance(Duration::from_secs(600));

        assert!(governor.is_ready());
        assert!(echo.lines().is_empty());
    }

    #[test]
    fn test_reset_clears_last_send() {
        let (mut governor, _, _) = governor();
        governor.record_send();
        assert!(!governor.is_ready());

        governor.reset();
        assert!(governor.is_ready());
    }
}
