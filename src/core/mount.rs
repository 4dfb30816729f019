use std::{sync::Arc, time::Duration};

use chrono::NaiveDateTime;

use crate::{
    astro::{degree_to_hour, EqCoord, HorizCoord, Observer},
    options::{MountOptions, SiteOptions},
    stepper::{calibration, StepDriver, StepperAxis},
};
use super::{
    axes::AxisMotionPlanner,
    error::{MountError, Result},
    events::{Event, EventSubscriptions},
};

/// How close both axes have to be to a reference direction for the
/// at-home / at-park checks, in degrees
const POSITION_EPSILON: f64 = 0.1;

/// The tracking supervisor: owns the observer site, the dual-axis
/// planner and the driver, and re-aims the mount at the stored
/// equatorial target while tracking is enabled.
pub struct Mount {
    observer:    Observer,
    planner:     AxisMotionPlanner,
    driver:      Box<dyn StepDriver + Send + Sync>,
    subscribers: Arc<EventSubscriptions>,

    connected:   bool,
    tracking:    bool,
    parked:      bool,
    park_pos:    HorizCoord,

    target:      Option<EqCoord>,
    next_ra:     Option<f64>,
    next_dec:    Option<f64>,

    last_reaim:  Option<NaiveDateTime>,
    reaim_ms:    i64,
}

impl Mount {
    pub fn new(
        options:    &MountOptions,
        site:       &SiteOptions,
        mut driver: Box<dyn StepDriver + Send + Sync>,
    ) -> Result<Self> {
        let observer = Observer::new(site.latitude, site.longitude)?;
        let park_pos = HorizCoord { alt: options.park_alt, az: options.park_az };
        check_alt_az(park_pos.alt, park_pos.az)?;

        driver.set_enabled(true);

        Ok(Self {
            observer,
            planner:     AxisMotionPlanner::new(&options.azimuth, &options.altitude),
            driver,
            subscribers: Arc::new(EventSubscriptions::new()),
            connected:   false,
            tracking:    true,
            parked:      false,
            park_pos,
            target:      None,
            next_ra:     None,
            next_dec:    None,
            last_reaim:  None,
            reaim_ms:    options.reaim_interval_ms,
        })
    }

    pub fn subscriptions(&self) -> &Arc<EventSubscriptions> {
        &self.subscribers
    }

    /// One control cycle. Never blocks: the planner advances by at most
    /// one increment and the re-aim pause is a timestamp check.
    pub fn tick(&mut self, utc: &NaiveDateTime) {
        let was_moving = self.planner.is_moving();
        self.planner.advance(self.driver.as_mut());
        if was_moving && !self.planner.is_moving() {
            let pos = self.planner.current_horizontal();
            log::info!("Slew finished at {:?}", pos);
            self.subscribers.notify(Event::Arrived(pos));
        }

        if self.planner.is_moving() || !self.tracking || self.parked {
            return;
        }
        let Some(target) = self.target else { return; };
        if !self.reaim_due(utc) {
            return;
        }
        self.last_reaim = Some(*utc);

        let hor = self.observer.to_horizontal(utc, &target);
        if let Err(err) = self.planner.set_target(&hor) {
            // Target has left the reachable range (set below the horizon)
            log::warn!("Tracking re-aim skipped: {}", err);
        }
    }

    fn reaim_due(&self, utc: &NaiveDateTime) -> bool {
        match &self.last_reaim {
            None => true,
            Some(last) => (*utc - *last).num_milliseconds() >= self.reaim_ms,
        }
    }

    /// Aim at an equatorial target and keep tracking it
    pub fn slew_to_eq_coord(&mut self, utc: &NaiveDateTime, ra: f64, dec: f64) -> Result<()> {
        if self.parked {
            return Err(MountError::InvalidWhileParked("Slew"));
        }
        check_eq_coord(ra, dec)?;

        let target = EqCoord { ra, dec };
        let hor = self.observer.to_horizontal(utc, &target);
        self.planner.set_target(&hor)?;

        self.target = Some(target);
        self.next_ra = Some(ra);
        self.next_dec = Some(dec);
        self.last_reaim = Some(*utc);

        log::info!("Slew to {:?} -> {:?}", target, hor);
        self.subscribers.notify(Event::TargetChanged(target));
        self.subscribers.notify(Event::SlewStarted(hor));
        Ok(())
    }

    /// Direct horizontal move. Drops the stored equatorial target, so
    /// tracking will not re-aim away from the commanded direction.
    pub fn slew_to_alt_az(&mut self, alt: f64, az: f64) -> Result<()> {
        let crd = HorizCoord { alt, az };
        self.planner.set_target(&crd)?;
        self.target = None;

        log::info!("Slew to {:?}", crd);
        self.subscribers.notify(Event::SlewStarted(crd));
        Ok(())
    }

    pub fn set_target_ra(&mut self, ra: f64) -> Result<()> {
        if !(0.0..24.0).contains(&ra) {
            return Err(MountError::OutOfRange("Right ascension", ra));
        }
        self.next_ra = Some(ra);
        Ok(())
    }

    pub fn set_target_dec(&mut self, dec: f64) -> Result<()> {
        if !(-90.0..=90.0).contains(&dec) {
            return Err(MountError::OutOfRange("Declination", dec));
        }
        self.next_dec = Some(dec);
        Ok(())
    }

    pub fn target_ra(&self) -> Result<f64> {
        self.next_ra.ok_or(MountError::Unset("Right ascension"))
    }

    pub fn target_dec(&self) -> Result<f64> {
        self.next_dec.ok_or(MountError::Unset("Declination"))
    }

    /// Slew to the previously staged target RA/Dec pair
    pub fn slew_to_target(&mut self, utc: &NaiveDateTime) -> Result<()> {
        if self.parked {
            return Err(MountError::InvalidWhileParked("Slew"));
        }
        let ra = self.target_ra()?;
        let dec = self.target_dec()?;
        self.slew_to_eq_coord(utc, ra, dec)
    }

    /// Move to the park position and lock out slew commands
    pub fn park(&mut self) -> Result<()> {
        let park_pos = self.park_pos;
        self.planner.set_target(&park_pos)?;
        self.target = None;
        self.parked = true;

        log::info!("Parking at {:?}", park_pos);
        self.subscribers.notify(Event::ParkedChanged(true));
        Ok(())
    }

    pub fn unpark(&mut self) {
        self.parked = false;
        log::info!("Unparked");
        self.subscribers.notify(Event::ParkedChanged(false));
    }

    pub fn set_park_position(&mut self, alt: f64, az: f64) -> Result<()> {
        check_alt_az(alt, az)?;
        self.park_pos = HorizCoord { alt, az };
        Ok(())
    }

    pub fn park_position(&self) -> HorizCoord {
        self.park_pos
    }

    pub fn is_parked(&self) -> bool {
        self.parked
    }

    pub fn is_at_park(&self) -> bool {
        self.parked && self.is_near(&self.park_pos)
    }

    pub fn is_at_home(&self) -> bool {
        self.is_near(&HorizCoord { alt: 0.0, az: 0.0 })
    }

    fn is_near(&self, crd: &HorizCoord) -> bool {
        let pos = self.planner.current_horizontal();
        f64::abs(pos.alt - crd.alt) < POSITION_EPSILON &&
        f64::abs(pos.az - crd.az) < POSITION_EPSILON
    }

    /// Immediate stop: the current position becomes the target. Also
    /// drops the stored equatorial target so tracking does not resume
    /// the aborted slew.
    pub fn halt(&mut self) {
        let pos = self.planner.current_horizontal();
        let stop = HorizCoord {
            alt: pos.alt.clamp(0.0, 90.0),
            az:  pos.az.clamp(0.0, 360.0),
        };
        // Cannot fail: the target is clamped into range
        _ = self.planner.set_target(&stop);
        self.target = None;
        log::info!("Halted at {:?}", stop);
    }

    pub fn set_tracking_enabled(&mut self, enabled: bool) {
        self.tracking = enabled;
        log::info!("Tracking enabled = {}", enabled);
        self.subscribers.notify(Event::TrackingChanged(enabled));
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        log::info!("Connected = {}", connected);
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_moving(&self) -> bool {
        self.planner.is_moving()
    }

    pub fn target(&self) -> Option<EqCoord> {
        self.target
    }

    pub fn current_alt_az(&self) -> HorizCoord {
        self.planner.current_horizontal()
    }

    pub fn current_eq_coord(&self, utc: &NaiveDateTime) -> EqCoord {
        self.observer.to_equatorial(utc, &self.planner.current_horizontal())
    }

    /// Local apparent sidereal time in hours
    pub fn sidereal_time(&self, utc: &NaiveDateTime) -> f64 {
        degree_to_hour(self.observer.local_sidereal_time(utc))
    }

    pub fn site_latitude(&self) -> f64 {
        self.observer.latitude()
    }

    pub fn site_longitude(&self) -> f64 {
        self.observer.longitude()
    }

    pub fn set_site_latitude(&mut self, latitude: f64) -> Result<()> {
        self.observer.set_latitude(latitude)
    }

    pub fn set_site_longitude(&mut self, longitude: f64) -> Result<()> {
        self.observer.set_longitude(longitude)
    }

    /// Offline range-of-motion diagnostic: full revolution out and back.
    /// Blocks for the whole sweep and ends where it started, so the step
    /// counters stay valid.
    pub fn sweep_axis(&mut self, axis: StepperAxis, settle: Duration) {
        let steps_per_rev = self.planner.steps_per_rev(axis);
        calibration::sweep_axis(self.driver.as_mut(), axis, steps_per_rev, settle);
    }
}

fn check_eq_coord(ra: f64, dec: f64) -> Result<()> {
    if !(0.0..24.0).contains(&ra) {
        return Err(MountError::OutOfRange("Right ascension", ra));
    }
    if !(-90.0..=90.0).contains(&dec) {
        return Err(MountError::OutOfRange("Declination", dec));
    }
    Ok(())
}

fn check_alt_az(alt: f64, az: f64) -> Result<()> {
    if !(0.0..=90.0).contains(&alt) {
        return Err(MountError::OutOfRange("Altitude", alt));
    }
    if !(0.0..=360.0).contains(&az) {
        return Err(MountError::OutOfRange("Azimuth", az));
    }
    Ok(())
}

#[cfg(test)]
use crate::{astro::normalize_degrees, stepper::SimStepDriver};

#[cfg(test)]
fn test_mount() -> Mount {
    let site = SiteOptions { latitude: 45.0, longitude: 0.0 };
    Mount::new(&MountOptions::default(), &site, Box::new(SimStepDriver::new())).unwrap()
}

#[cfg(test)]
fn test_time() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2023, 9, 15).unwrap()
        .and_hms_opt(3, 30, 0).unwrap()
}

#[cfg(test)]
fn drive_to_arrival(mount: &mut Mount, utc: &NaiveDateTime) {
    let mut ticks = 0_usize;
    while mount.is_moving() {
        mount.tick(utc);
        ticks += 1;
        assert!(ticks < 1_000_000, "mount did not arrive");
    }
}

/// RA that currently sits `ha_degrees` west of the meridian
#[cfg(test)]
fn ra_for_hour_angle(mount: &Mount, utc: &NaiveDateTime, ha_degrees: f64) -> f64 {
    let lst_h = mount.sidereal_time(utc);
    (lst_h - degree_to_hour(ha_degrees)).rem_euclid(24.0)
}

#[test]
fn test_slew_validation() {
    let mut mount = test_mount();
    let utc = test_time();

    assert_eq!(
        mount.slew_to_eq_coord(&utc, 24.1, 0.0),
        Err(MountError::OutOfRange("Right ascension", 24.1))
    );
    assert_eq!(
        mount.slew_to_eq_coord(&utc, 1.0, -91.0),
        Err(MountError::OutOfRange("Declination", -91.0))
    );
    assert_eq!(
        mount.slew_to_alt_az(91.0, 10.0),
        Err(MountError::OutOfRange("Altitude", 91.0))
    );
    assert!(!mount.is_moving());
    assert_eq!(mount.target(), None);
}

#[test]
fn test_parked_rejects_slews() {
    let mut mount = test_mount();
    let utc = test_time();

    mount.park().unwrap();
    drive_to_arrival(&mut mount, &utc);
    assert!(mount.is_parked());
    assert!(mount.is_at_park());

    let ra = ra_for_hour_angle(&mount, &utc, 15.0);
    assert_eq!(
        mount.slew_to_eq_coord(&utc, ra, 20.0),
        Err(MountError::InvalidWhileParked("Slew"))
    );
    assert!(!mount.is_moving());
    assert_eq!(mount.target(), None);

    mount.unpark();
    assert!(!mount.is_at_park());
    mount.slew_to_eq_coord(&utc, ra, 20.0).unwrap();
    assert!(mount.is_moving());
}

#[test]
fn test_slew_and_read_back() {
    let mut mount = test_mount();
    let utc = test_time();

    let ra = ra_for_hour_angle(&mount, &utc, 15.0);
    mount.slew_to_eq_coord(&utc, ra, 20.0).unwrap();
    drive_to_arrival(&mut mount, &utc);

    // Step quantization keeps the read-back within a few tenths
    let eq = mount.current_eq_coord(&utc);
    assert!(f64::abs(eq.dec - 20.0) < 0.2, "dec read back as {}", eq.dec);
    let ra_diff = normalize_degrees(15.0 * (eq.ra - ra));
    let ra_diff = f64::min(ra_diff, 360.0 - ra_diff);
    assert!(ra_diff < 0.3, "ra read back as {}", eq.ra);
}

#[test]
fn test_tracking_reaims_after_interval() {
    let mut mount = test_mount();
    let t0 = test_time();

    let ra = ra_for_hour_angle(&mount, &t0, 15.0);
    mount.slew_to_eq_coord(&t0, ra, 20.0).unwrap();
    drive_to_arrival(&mut mount, &t0);
    let az_1 = mount.current_alt_az().az;

    // Same instant: the re-aim pause has not elapsed
    mount.tick(&t0);
    assert!(!mount.is_moving());

    // One minute later the sky has rotated and a new slew must start
    let t1 = t0 + chrono::Duration::seconds(60);
    mount.tick(&t1);
    assert!(mount.is_moving());
    drive_to_arrival(&mut mount, &t1);

    let az_2 = mount.current_alt_az().az;
    assert!(az_2 > az_1, "azimuth did not advance: {} -> {}", az_1, az_2);

    // The new direction matches the transform at the new time
    let expected = Observer::new(45.0, 0.0).unwrap()
        .to_horizontal(&t1, &EqCoord { ra, dec: 20.0 });
    let pos = mount.current_alt_az();
    assert!(f64::abs(pos.alt - expected.alt) < 0.05);
    assert!(f64::abs(pos.az - expected.az) < 0.05);
}

#[test]
fn test_tracking_can_be_disabled() {
    let mut mount = test_mount();
    let t0 = test_time();

    let ra = ra_for_hour_angle(&mount, &t0, 15.0);
    mount.slew_to_eq_coord(&t0, ra, 20.0).unwrap();
    drive_to_arrival(&mut mount, &t0);

    mount.set_tracking_enabled(false);
    let t1 = t0 + chrono::Duration::seconds(60);
    mount.tick(&t1);
    assert!(!mount.is_moving());
}

#[test]
fn test_direct_slew_stops_tracking_target() {
    let mut mount = test_mount();
    let t0 = test_time();

    let ra = ra_for_hour_angle(&mount, &t0, 15.0);
    mount.slew_to_eq_coord(&t0, ra, 20.0).unwrap();
    drive_to_arrival(&mut mount, &t0);
    assert!(mount.target().is_some());

    mount.slew_to_alt_az(50.0, 100.0).unwrap();
    drive_to_arrival(&mut mount, &t0);
    assert_eq!(mount.target(), None);

    // No re-aim away from the commanded direction
    let t1 = t0 + chrono::Duration::seconds(60);
    mount.tick(&t1);
    assert!(!mount.is_moving());
    let pos = mount.current_alt_az();
    assert!(f64::abs(pos.alt - 50.0) < 0.05);
    assert!(f64::abs(pos.az - 100.0) < 0.05);
}

#[test]
fn test_staged_target() {
    let mut mount = test_mount();
    let utc = test_time();

    assert_eq!(mount.target_ra(), Err(MountError::Unset("Right ascension")));
    assert_eq!(mount.target_dec(), Err(MountError::Unset("Declination")));

    mount.set_target_ra(5.5).unwrap();
    assert_eq!(
        mount.slew_to_target(&utc),
        Err(MountError::Unset("Declination"))
    );
    assert!(!mount.is_moving());

    mount.set_target_dec(80.0).unwrap();
    mount.slew_to_target(&utc).unwrap();
    assert_eq!(mount.target(), Some(EqCoord { ra: 5.5, dec: 80.0 }));

    assert_eq!(
        mount.set_target_ra(24.0),
        Err(MountError::OutOfRange("Right ascension", 24.0))
    );
    assert_eq!(mount.target_ra(), Ok(5.5));
}

#[test]
fn test_park_position() {
    let mut mount = test_mount();
    let utc = test_time();

    assert_eq!(
        mount.set_park_position(100.0, 0.0),
        Err(MountError::OutOfRange("Altitude", 100.0))
    );

    mount.set_park_position(10.0, 30.0).unwrap();
    mount.park().unwrap();
    assert!(mount.is_parked());
    assert!(!mount.is_at_park()); // still on the way
    drive_to_arrival(&mut mount, &utc);
    assert!(mount.is_at_park());

    let pos = mount.current_alt_az();
    assert!(f64::abs(pos.alt - 10.0) < 0.05);
    assert!(f64::abs(pos.az - 30.0) < 0.05);
}

#[test]
fn test_at_home() {
    let mut mount = test_mount();
    let utc = test_time();

    assert!(mount.is_at_home());
    mount.slew_to_alt_az(20.0, 20.0).unwrap();
    drive_to_arrival(&mut mount, &utc);
    assert!(!mount.is_at_home());
}

#[test]
fn test_halt() {
    let mut mount = test_mount();
    let utc = test_time();

    mount.slew_to_alt_az(45.0, 200.0).unwrap();
    for _ in 0..500 {
        mount.tick(&utc);
    }
    assert!(mount.is_moving());

    mount.halt();
    for _ in 0..5 {
        mount.tick(&utc);
    }
    assert!(!mount.is_moving());
    assert_eq!(mount.target(), None);
}

#[test]
fn test_site_setter_validation() {
    let mut mount = test_mount();
    assert_eq!(
        mount.set_site_latitude(91.0),
        Err(MountError::OutOfRange("Latitude", 91.0))
    );
    assert_eq!(
        mount.set_site_longitude(181.0),
        Err(MountError::OutOfRange("Longitude", 181.0))
    );
    assert_eq!(mount.site_latitude(), 45.0);
    assert_eq!(mount.site_longitude(), 0.0);
}

#[test]
fn test_events_are_notified() {
    use std::sync::Mutex;

    let mut mount = test_mount();
    let utc = test_time();

    let events = Arc::new(Mutex::new(Vec::new()));
    let _subscription = mount.subscriptions().subscribe({
        let events = Arc::clone(&events);
        move |event| events.lock().unwrap().push(event)
    });

    let ra = ra_for_hour_angle(&mount, &utc, 15.0);
    mount.slew_to_eq_coord(&utc, ra, 20.0).unwrap();
    drive_to_arrival(&mut mount, &utc);

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(e, Event::TargetChanged(_))));
    assert!(events.iter().any(|e| matches!(e, Event::SlewStarted(_))));
    assert!(events.iter().any(|e| matches!(e, Event::Arrived(_))));
}
