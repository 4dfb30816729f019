use std::time::Duration;

use crate::log_utils::TimeLogger;
use super::{Direction, StepDriver, StepperAxis};

/// Range-of-motion check: one full revolution forward, pause, one full
/// revolution back. Blocks for the whole sweep — diagnostic use only,
/// never called from the control loop.
pub fn sweep_axis(
    driver:        &mut dyn StepDriver,
    axis:          StepperAxis,
    steps_per_rev: i64,
    settle:        Duration,
) {
    log::info!("Sweeping {:?} axis, {} steps each way", axis, steps_per_rev);
    let bench = TimeLogger::start();

    std::thread::sleep(settle);
    for _ in 0..steps_per_rev {
        driver.pulse(axis, Direction::Forward);
    }

    std::thread::sleep(settle);
    for _ in 0..steps_per_rev {
        driver.pulse(axis, Direction::Backward);
    }

    bench.log("axis sweep");
    log::info!("Sweep of {:?} axis finished", axis);
}

#[test]
fn test_sweep_returns_to_start() {
    let mut driver = super::SimStepDriver::new();
    sweep_axis(&mut driver, StepperAxis::Altitude, 100, Duration::ZERO);
    assert_eq!(driver.alt_pulses(), 0);
    assert_eq!(driver.az_pulses(), 0);
}
