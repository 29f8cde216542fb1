//! Clock-domain translation for camera capture timestamps.

/// Translates a timestamp from a camera's clock domain into the control
/// loop's clock domain.
pub trait ClockSync: Send {
    fn to_local_time(&self, remote_seconds: f64) -> f64;
}

/// Camera and robot already share a clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityClock;

impl ClockSync for IdentityClock {
    fn to_local_time(&self, remote_seconds: f64) -> f64 {
        remote_seconds
    }
}

/// Fixed offset between the two domains: `local = remote + offset_seconds`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetClock {
    pub offset_seconds: f64,
}

impl OffsetClock {
    pub fn new(offset_seconds: f64) -> Self {
        Self { offset_seconds }
    }
}

impl ClockSync for OffsetClock {
    fn to_local_time(&self, remote_seconds: f64) -> f64 {
        remote_seconds + self.offset_seconds
    }
}

impl<F> ClockSync for F
where
    F: Fn(f64) -> f64 + Send,
{
    fn to_local_time(&self, remote_seconds: f64) -> f64 {
        self(remote_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_through() {
        assert_eq!(IdentityClock.to_local_time(12.5), 12.5);
    }

    #[test]
    fn offset_is_added() {
        let clock = OffsetClock::new(-0.25);
        assert!((clock.to_local_time(10.0) - 9.75).abs() < 1e-12);
    }

    #[test]
    fn closures_are_clocks() {
        let clock: Box<dyn ClockSync> = Box::new(|t: f64| t * 2.0);
        assert_eq!(clock.to_local_time(3.0), 6.0);
    }
}
