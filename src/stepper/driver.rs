#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperAxis {
    Azimuth,
    Altitude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Boundary to the step/direction outputs. One call per physical motor
/// increment; the implementation owns pulse widths and pin polarity.
pub trait StepDriver {
    fn pulse(&mut self, axis: StepperAxis, dir: Direction);

    fn set_enabled(&mut self, _enabled: bool) {}
}

/// Driver without hardware: keeps signed pulse totals per axis.
#[derive(Default)]
pub struct SimStepDriver {
    az_pulses:  i64,
    alt_pulses: i64,
    enabled:    bool,
}

impl SimStepDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn az_pulses(&self) -> i64 {
        self.az_pulses
    }

    pub fn alt_pulses(&self) -> i64 {
        self.alt_pulses
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl StepDriver for SimStepDriver {
    fn pulse(&mut self, axis: StepperAxis, dir: Direction) {
        let delta = match dir {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };
        match axis {
            StepperAxis::Azimuth => self.az_pulses += delta,
            StepperAxis::Altitude => self.alt_pulses += delta,
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Decorator tracing every pulse. Useful during bring-up, too noisy for
/// anything else unless the `trace` level is off.
pub struct LogStepDriver<T: StepDriver> {
    inner: T,
}

impl<T: StepDriver> LogStepDriver<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: StepDriver> StepDriver for LogStepDriver<T> {
    fn pulse(&mut self, axis: StepperAxis, dir: Direction) {
        log::trace!("pulse {:?} {:?}", axis, dir);
        self.inner.pulse(axis, dir);
    }

    fn set_enabled(&mut self, enabled: bool) {
        log::debug!("driver enabled = {}", enabled);
        self.inner.set_enabled(enabled);
    }
}

#[test]
fn test_sim_driver_counts() {
    let mut driver = SimStepDriver::new();
    driver.pulse(StepperAxis::Azimuth, Direction::Forward);
    driver.pulse(StepperAxis::Azimuth, Direction::Forward);
    driver.pulse(StepperAxis::Azimuth, Direction::Backward);
    driver.pulse(StepperAxis::Altitude, Direction::Backward);
    assert_eq!(driver.az_pulses(), 1);
    assert_eq!(driver.alt_pulses(), -1);
}
