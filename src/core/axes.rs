use crate::{
    astro::HorizCoord,
    options::AxisOptions,
    stepper::{Direction, StepDriver, StepperAxis},
};
use super::error::{MountError, Result};

struct AxisState {
    cur:    i64,
    target: i64,
    acc:    f64, // fractional progress toward the next whole step
}

impl AxisState {
    fn new() -> Self {
        Self { cur: 0, target: 0, acc: 0.0 }
    }

    fn remaining(&self) -> i64 {
        self.target - self.cur
    }
}

/// Planner for the two mechanically coupled axes.
///
/// Azimuth is free-running 0–360°. The altitude assembly rides on the
/// azimuth ring, so azimuth rotation drags the altitude axis by a gear
/// ratio amount; the altitude step target absorbs that displacement so
/// the optical altitude lands where commanded.
pub struct AxisMotionPlanner {
    az_opts:  AxisOptions,
    alt_opts: AxisOptions,
    az:       AxisState,
    alt:      AxisState,
    moving:   bool,
}

impl AxisMotionPlanner {
    pub fn new(az_opts: &AxisOptions, alt_opts: &AxisOptions) -> Self {
        Self {
            az_opts:  az_opts.clone(),
            alt_opts: alt_opts.clone(),
            az:       AxisState::new(),
            alt:      AxisState::new(),
            moving:   false,
        }
    }

    /// Altitude-axis steps dragged in per azimuth-axis step
    fn coupling_ratio(&self) -> f64 {
        self.alt_opts.steps_per_rev() as f64 / self.az_opts.steps_per_rev() as f64
    }

    pub fn set_target(&mut self, crd: &HorizCoord) -> Result<()> {
        if !(0.0..=90.0).contains(&crd.alt) {
            return Err(MountError::OutOfRange("Altitude", crd.alt));
        }
        if !(0.0..=360.0).contains(&crd.az) {
            return Err(MountError::OutOfRange("Azimuth", crd.az));
        }

        let az_spr = self.az_opts.steps_per_rev() as f64;
        let alt_spr = self.alt_opts.steps_per_rev() as f64;

        let az_target = (az_spr * crd.az / 360.0).round() as i64;

        // Coupling correction, from the absolute azimuth target so that
        // it stays exact across consecutive slews
        let dragged = az_target as f64 * self.coupling_ratio();
        let alt_target = (dragged + alt_spr * crd.alt / 360.0).round() as i64;

        self.az.target = az_target;
        self.alt.target = alt_target;
        self.az.acc = 0.0;
        self.alt.acc = 0.0;
        self.moving = self.az.remaining() != 0 || self.alt.remaining() != 0;

        log::debug!(
            "New target: alt={:.4}° az={:.4}° -> alt={} az={} steps, moving={}",
            crd.alt, crd.az, alt_target, az_target, self.moving
        );
        Ok(())
    }

    /// One increment of the synchronized path: at most one pulse per
    /// axis per call, both axes' completion kept proportional so they
    /// arrive together. O(1) and non-blocking.
    pub fn advance(&mut self, driver: &mut dyn StepDriver) {
        if !self.moving {
            return;
        }

        let divisor = i64::max(self.az.remaining().abs(), self.alt.remaining().abs());
        if divisor == 0 {
            self.finish_move();
            return;
        }

        Self::advance_axis(&mut self.az, divisor, StepperAxis::Azimuth, driver);
        Self::advance_axis(&mut self.alt, divisor, StepperAxis::Altitude, driver);

        if self.az.remaining() == 0 && self.alt.remaining() == 0 {
            self.finish_move();
        }
    }

    fn advance_axis(
        axis:    &mut AxisState,
        divisor: i64,
        which:   StepperAxis,
        driver:  &mut dyn StepDriver,
    ) {
        let rem = axis.remaining();
        if rem == 0 {
            return;
        }
        axis.acc += rem as f64 / divisor as f64;
        if axis.acc >= 1.0 {
            axis.acc -= 1.0;
            axis.cur += 1;
            driver.pulse(which, Direction::Forward);
        } else if axis.acc <= -1.0 {
            axis.acc += 1.0;
            axis.cur -= 1;
            driver.pulse(which, Direction::Backward);
        }
    }

    // Snap to the exact step targets and drop the fractional remainders
    fn finish_move(&mut self) {
        self.az.cur = self.az.target;
        self.alt.cur = self.alt.target;
        self.az.acc = 0.0;
        self.alt.acc = 0.0;
        self.moving = false;
        log::debug!("Arrived at {:?}", self.current_horizontal());
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Logical direction from the raw coupled step counts (inverse of
    /// the coupling correction)
    pub fn current_horizontal(&self) -> HorizCoord {
        let az_spr = self.az_opts.steps_per_rev() as f64;
        let alt_spr = self.alt_opts.steps_per_rev() as f64;
        let alt_steps = self.alt.cur as f64 - self.az.cur as f64 * self.coupling_ratio();
        HorizCoord {
            alt: 360.0 * alt_steps / alt_spr,
            az:  360.0 * self.az.cur as f64 / az_spr,
        }
    }

    pub fn steps_per_rev(&self, axis: StepperAxis) -> i64 {
        match axis {
            StepperAxis::Azimuth => self.az_opts.steps_per_rev(),
            StepperAxis::Altitude => self.alt_opts.steps_per_rev(),
        }
    }

    pub fn current_steps(&self) -> (i64, i64) {
        (self.alt.cur, self.az.cur)
    }

    pub fn target_steps(&self) -> (i64, i64) {
        (self.alt.target, self.az.target)
    }
}

#[cfg(test)]
use crate::stepper::SimStepDriver;

#[cfg(test)]
fn test_planner() -> AxisMotionPlanner {
    use crate::options::MountOptions;
    let opts = MountOptions::default();
    AxisMotionPlanner::new(&opts.azimuth, &opts.altitude)
}

#[cfg(test)]
fn drive(planner: &mut AxisMotionPlanner, driver: &mut SimStepDriver) -> usize {
    let mut ticks = 0_usize;
    while planner.is_moving() {
        planner.advance(driver);
        ticks += 1;
        assert!(ticks < 1_000_000, "planner did not arrive");
    }
    ticks
}

#[test]
fn test_target_validation() {
    let mut planner = test_planner();
    assert_eq!(
        planner.set_target(&HorizCoord { alt: 91.0, az: 10.0 }),
        Err(MountError::OutOfRange("Altitude", 91.0))
    );
    assert_eq!(
        planner.set_target(&HorizCoord { alt: 10.0, az: 361.0 }),
        Err(MountError::OutOfRange("Azimuth", 361.0))
    );
    assert_eq!(
        planner.set_target(&HorizCoord { alt: -0.1, az: 0.0 }),
        Err(MountError::OutOfRange("Altitude", -0.1))
    );

    // Nothing moved and no prior target was disturbed
    assert!(!planner.is_moving());
    assert_eq!(planner.target_steps(), (0, 0));
}

#[test]
fn test_coupling_correction() {
    let mut planner = test_planner();
    let mut driver = SimStepDriver::new();

    planner.set_target(&HorizCoord { alt: 0.0, az: 90.0 }).unwrap();
    assert!(planner.is_moving());
    drive(&mut planner, &mut driver);

    // The azimuth move dragged the altitude axis; the correction must
    // have cancelled it out
    let pos = planner.current_horizontal();
    assert!(f64::abs(pos.alt) < 0.05, "altitude drifted to {}", pos.alt);
    assert!(f64::abs(pos.az - 90.0) < 0.05);

    // Altitude motor really pulsed to absorb the coupling
    assert!(driver.alt_pulses() > 0);
    let (alt_steps, az_steps) = planner.current_steps();
    assert_eq!(driver.alt_pulses(), alt_steps);
    assert_eq!(driver.az_pulses(), az_steps);
}

#[test]
fn test_arrival_is_exact_and_settle_is_idempotent() {
    let mut planner = test_planner();
    let mut driver = SimStepDriver::new();

    planner.set_target(&HorizCoord { alt: 30.0, az: 120.0 }).unwrap();
    let ticks = drive(&mut planner, &mut driver);

    let (alt_cur, az_cur) = planner.current_steps();
    assert_eq!((alt_cur, az_cur), planner.target_steps());

    // Arrival takes max(|delta|) ticks plus the minor-axis remainder
    let max_delta = i64::max(alt_cur.abs(), az_cur.abs()) as usize;
    assert!(ticks <= 2 * max_delta + 2, "took {} ticks", ticks);

    // Settled planner is a no-op
    let pulses = (driver.alt_pulses(), driver.az_pulses());
    for _ in 0..100 {
        planner.advance(&mut driver);
    }
    assert!(!planner.is_moving());
    assert_eq!((driver.alt_pulses(), driver.az_pulses()), pulses);
    assert_eq!((alt_cur, az_cur), planner.current_steps());
}

#[test]
fn test_consecutive_slews_do_not_drift() {
    let mut planner = test_planner();
    let mut driver = SimStepDriver::new();

    for az in [90.0, 180.0, 270.0, 45.0] {
        planner.set_target(&HorizCoord { alt: 10.0, az }).unwrap();
        drive(&mut planner, &mut driver);
        let pos = planner.current_horizontal();
        assert!(
            f64::abs(pos.alt - 10.0) < 0.05,
            "altitude drifted to {} after slew to az={}", pos.alt, az
        );
        assert!(f64::abs(pos.az - az) < 0.05);
    }
}

#[test]
fn test_set_target_to_current_position_halts() {
    let mut planner = test_planner();
    let mut driver = SimStepDriver::new();

    planner.set_target(&HorizCoord { alt: 45.0, az: 200.0 }).unwrap();
    for _ in 0..500 {
        planner.advance(&mut driver);
    }
    assert!(planner.is_moving());

    let pos = planner.current_horizontal();
    let stop = HorizCoord { alt: pos.alt.clamp(0.0, 90.0), az: pos.az.clamp(0.0, 360.0) };
    planner.set_target(&stop).unwrap();

    // Halting can leave at most a single rounding step per axis
    let mut ticks = 0;
    while planner.is_moving() {
        planner.advance(&mut driver);
        ticks += 1;
    }
    assert!(ticks <= 2, "halt took {} ticks", ticks);
}

#[test]
fn test_both_axes_arrive_together() {
    let mut planner = test_planner();
    let mut driver = SimStepDriver::new();

    // Long azimuth move with a short altitude move: altitude pulses must
    // be spread along the whole path, not bunched at the start
    planner.set_target(&HorizCoord { alt: 5.0, az: 180.0 }).unwrap();
    let (alt_target, az_target) = planner.target_steps();

    let mut half_time_alt = 0;
    let half = az_target / 2;
    while planner.is_moving() {
        planner.advance(&mut driver);
        if driver.az_pulses() == half && half_time_alt == 0 {
            half_time_alt = driver.alt_pulses();
        }
    }

    let ratio = half_time_alt as f64 / alt_target as f64;
    assert!(
        (0.4..=0.6).contains(&ratio),
        "altitude was {}/{} done at azimuth halfway", half_time_alt, alt_target
    );
}
