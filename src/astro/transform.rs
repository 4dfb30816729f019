use chrono::NaiveDateTime;

use crate::core::error::{MountError, Result};
use super::math::*;

/// Observing site. All transform results depend on it, so latitude and
/// longitude are only changed through validated setters.
pub struct Observer {
    latitude:  f64, // in degrees
    longitude: f64, // in degrees
}

impl Observer {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let mut result = Self { latitude: 0.0, longitude: 0.0 };
        result.set_latitude(latitude)?;
        result.set_longitude(longitude)?;
        Ok(result)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn set_latitude(&mut self, latitude: f64) -> Result<()> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(MountError::OutOfRange("Latitude", latitude));
        }
        self.latitude = latitude;
        Ok(())
    }

    pub fn set_longitude(&mut self, longitude: f64) -> Result<()> {
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(MountError::OutOfRange("Longitude", longitude));
        }
        self.longitude = longitude;
        Ok(())
    }

    /// Local sidereal time in degrees, [0, 360)
    pub fn local_sidereal_time(&self, utc: &NaiveDateTime) -> f64 {
        let days = days_since_j2000(utc);
        let ut = 12.0 + 24.0 * (days - days.floor());
        normalize_degrees(100.46 + 0.985647 * days + self.longitude + 15.0 * ut)
    }

    /// Equatorial to horizontal for the given UTC instant.
    ///
    /// At the zenith the azimuth is geometrically undefined; it is
    /// reported as 0 there instead of letting NaN through.
    pub fn to_horizontal(&self, utc: &NaiveDateTime, crd: &EqCoord) -> HorizCoord {
        let lst = self.local_sidereal_time(utc);
        let ha = normalize_degrees(lst - hour_to_degree(crd.ra));

        let ha_r = ha.to_radians();
        let dec_r = crd.dec.to_radians();
        let lat_r = self.latitude.to_radians();

        let sin_alt =
            f64::sin(dec_r) * f64::sin(lat_r) +
            f64::cos(dec_r) * f64::cos(lat_r) * f64::cos(ha_r);
        let alt_r = f64::asin(sin_alt.clamp(-1.0, 1.0));

        let denom = f64::cos(alt_r) * f64::cos(lat_r);
        if denom.abs() < 1e-6 {
            return HorizCoord { alt: alt_r.to_degrees(), az: 0.0 };
        }

        let cos_a = (f64::sin(dec_r) - f64::sin(alt_r) * f64::sin(lat_r)) / denom;
        let a = f64::acos(cos_a.clamp(-1.0, 1.0)).to_degrees();
        let az = if f64::sin(ha_r) < 0.0 { a } else { 360.0 - a };

        HorizCoord {
            alt: alt_r.to_degrees(),
            az:  normalize_degrees(az),
        }
    }

    /// Horizontal to equatorial for the given UTC instant.
    ///
    /// Inverse of `to_horizontal` everywhere except the zenith/pole
    /// singularities. RA comes back in hours, [0, 24).
    pub fn to_equatorial(&self, utc: &NaiveDateTime, crd: &HorizCoord) -> EqCoord {
        let alt_r = crd.alt.to_radians();
        let az_r = crd.az.to_radians();
        let lat_r = self.latitude.to_radians();

        let ha = f64::atan2(
            -f64::sin(az_r) * f64::cos(alt_r),
            -f64::cos(az_r) * f64::sin(lat_r) * f64::cos(alt_r) +
                f64::sin(alt_r) * f64::cos(lat_r),
        ).to_degrees();
        let ha = normalize_degrees(ha);

        let sin_dec =
            f64::sin(lat_r) * f64::sin(alt_r) +
            f64::cos(lat_r) * f64::cos(alt_r) * f64::cos(az_r);
        let dec = f64::asin(sin_dec.clamp(-1.0, 1.0)).to_degrees();

        let lst = self.local_sidereal_time(utc);
        let ra = normalize_degrees(lst - ha);

        EqCoord { ra: degree_to_hour(ra), dec }
    }
}

#[cfg(test)]
fn test_time() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2023, 9, 15).unwrap()
        .and_hms_opt(3, 30, 0).unwrap()
}

#[test]
fn test_local_sidereal_time() {
    let observer = Observer::new(0.0, 0.0).unwrap();
    let epoch = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
        .and_hms_opt(12, 0, 0).unwrap();
    let lst = observer.local_sidereal_time(&epoch);
    assert!(f64::abs(lst - 280.46) < 1e-9);

    // Longitude shifts LST degree for degree
    let observer_e = Observer::new(0.0, 10.0).unwrap();
    let lst_e = observer_e.local_sidereal_time(&epoch);
    assert!(f64::abs(normalize_degrees(lst_e - lst) - 10.0) < 1e-9);
}

#[test]
fn test_object_on_meridian() {
    let observer = Observer::new(45.0, 0.0).unwrap();
    let utc = test_time();

    // Hour angle 0: altitude is 90 - (lat - dec), azimuth due south
    let lst = observer.local_sidereal_time(&utc);
    let crd = EqCoord { ra: degree_to_hour(lst), dec: 20.0 };
    let hor = observer.to_horizontal(&utc, &crd);
    assert!(f64::abs(hor.alt - 65.0) < 1e-9);
    assert!(f64::abs(hor.az - 180.0) < 1e-9);
}

#[test]
fn test_zenith_has_no_nan() {
    let observer = Observer::new(45.0, 0.0).unwrap();
    let utc = test_time();
    let lst = observer.local_sidereal_time(&utc);
    let crd = EqCoord { ra: degree_to_hour(lst), dec: 45.0 };
    let hor = observer.to_horizontal(&utc, &crd);
    assert!(hor.alt.is_finite());
    assert!(hor.az.is_finite());
    assert!(f64::abs(hor.alt - 90.0) < 1e-4);
    assert_eq!(hor.az, 0.0);
}

#[test]
fn test_round_trip() {
    let observer = Observer::new(43.554736, -73.249809).unwrap();
    let utc = test_time();

    let circ_diff = |a: f64, b: f64, period: f64| -> f64 {
        let diff = (a - b).rem_euclid(period);
        f64::min(diff, period - diff)
    };

    for dec in [-60.0, -30.0, 0.0, 30.0, 60.0] {
        for ra in [0.5, 4.0, 9.25, 13.0, 18.5, 23.0] {
            let crd = EqCoord { ra, dec };
            let hor = observer.to_horizontal(&utc, &crd);
            let back = observer.to_equatorial(&utc, &hor);
            assert!(
                circ_diff(back.ra, crd.ra, 24.0) < 1e-8,
                "ra={} dec={}: got ra={}", ra, dec, back.ra
            );
            assert!(
                f64::abs(back.dec - crd.dec) < 1e-8,
                "ra={} dec={}: got dec={}", ra, dec, back.dec
            );
        }
    }
}

#[test]
fn test_site_validation() {
    assert!(matches!(
        Observer::new(91.0, 0.0),
        Err(MountError::OutOfRange("Latitude", _))
    ));
    assert!(matches!(
        Observer::new(0.0, 181.0),
        Err(MountError::OutOfRange("Longitude", _))
    ));

    let mut observer = Observer::new(45.0, 10.0).unwrap();
    assert!(observer.set_latitude(-91.0).is_err());
    assert!(observer.set_longitude(-180.5).is_err());
    assert_eq!(observer.latitude(), 45.0);
    assert_eq!(observer.longitude(), 10.0);
}
