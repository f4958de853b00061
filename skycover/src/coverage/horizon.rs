//! Sampling horizon: the finite sequence of instants a coverage run visits.

use chrono::{DateTime, Duration, Utc};

/// Default number of samples in a horizon.
pub const DEFAULT_STEPS: usize = 24;

/// Default spacing between samples (minutes).
pub const DEFAULT_STEP_MINUTES: i64 = 60;

/// One instant of the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    /// Position in the horizon, `0..steps`.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
}

/// Evenly spaced instants starting `start_offset_minutes` after `origin`.
///
/// Sample `i` falls at `origin + start_offset + i * step`. The sequence is
/// computed on demand and can be iterated any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    origin: DateTime<Utc>,
    start_offset_minutes: i64,
    steps: usize,
    step_minutes: i64,
}

impl Horizon {
    /// 24 hourly samples starting at `origin`.
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            start_offset_minutes: 0,
            steps: DEFAULT_STEPS,
            step_minutes: DEFAULT_STEP_MINUTES,
        }
    }

    pub fn with_start_offset_minutes(mut self, minutes: i64) -> Self {
        self.start_offset_minutes = minutes;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_step_minutes(mut self, minutes: i64) -> Self {
        self.step_minutes = minutes;
        self
    }

    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }

    /// Sample at `index`, or `None` past the end or outside the
    /// representable time range.
    pub fn sample(&self, index: usize) -> Option<TimeSample> {
        if index >= self.steps {
            return None;
        }
        let minutes = i64::try_from(index)
            .ok()?
            .checked_mul(self.step_minutes)?
            .checked_add(self.start_offset_minutes)?;
        let timestamp = self
            .origin
            .checked_add_signed(Duration::try_minutes(minutes)?)?;
        Some(TimeSample { index, timestamp })
    }

    /// Iterate over every sample in order.
    pub fn samples(&self) -> impl Iterator<Item = TimeSample> + Clone + '_ {
        (0..self.steps).filter_map(move |i| self.sample(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_default_horizon_is_24_hourly_samples() {
        let horizon = Horizon::new(origin());
        let samples: Vec<_> = horizon.samples().collect();

        assert_eq!(samples.len(), 24);
        assert_eq!(samples[0].timestamp, origin());
        assert_eq!(samples[23].timestamp, origin() + Duration::hours(23));
        assert!(samples.iter().enumerate().all(|(i, s)| s.index == i));
    }

    #[test]
    fn test_start_offset_shifts_every_sample() {
        let horizon = Horizon::new(origin()).with_start_offset_minutes(90);
        assert_eq!(
            horizon.sample(0).unwrap().timestamp,
            origin() + Duration::minutes(90)
        );
        assert_eq!(
            horizon.sample(2).unwrap().timestamp,
            origin() + Duration::minutes(210)
        );
    }

    #[test]
    fn test_samples_restart() {
        let horizon = Horizon::new(origin()).with_steps(3).with_step_minutes(15);
        let first: Vec<_> = horizon.samples().collect();
        let second: Vec<_> = horizon.samples().collect();
        assert_eq!(first, second);
        assert_eq!(first[2].timestamp, origin() + Duration::minutes(30));
    }

    #[test]
    fn test_out_of_range_offset_yields_no_sample() {
        let horizon = Horizon::new(origin()).with_start_offset_minutes(i64::MAX / 1000);
        assert!(horizon.sample(0).is_none());

        let horizon = Horizon::new(origin())
            .with_steps(3)
            .with_step_minutes(i64::MAX / 2);
        assert!(horizon.sample(0).is_some());
        assert!(horizon.sample(2).is_none());
    }

    #[test]
    fn test_empty_horizon() {
        let horizon = Horizon::new(origin()).with_steps(0);
        assert!(horizon.is_empty());
        assert_eq!(horizon.samples().count(), 0);
        assert!(horizon.sample(0).is_none());
    }
}
