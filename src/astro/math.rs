use std::fmt::Debug;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::utils::sexagesimal::value_to_sexagesimal;

#[derive(Clone, Copy, Default, PartialEq)]
pub struct EqCoord {
    pub ra:  f64, // in hours
    pub dec: f64, // in degrees
}

impl Debug for EqCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EqCoord")
            .field("ra", &value_to_sexagesimal(self.ra, true, 8))
            .field("dec", &value_to_sexagesimal(self.dec, true, 6))
            .finish()
    }
}

#[derive(Clone, Copy, Default, PartialEq)]
pub struct HorizCoord {
    pub alt: f64, // in degrees
    pub az:  f64, // in degrees
}

impl Debug for HorizCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HorizCoord")
            .field("alt", &value_to_sexagesimal(self.alt, true, 6))
            .field("az", &value_to_sexagesimal(self.az, true, 6))
            .finish()
    }
}

pub fn hour_to_degree(hour: f64) -> f64 {
    15.0 * hour
}

pub fn degree_to_hour(degree: f64) -> f64 {
    degree / 15.0
}

/// Normalizes an angle in degrees into [0, 360)
pub fn normalize_degrees(degrees: f64) -> f64 {
    let result = degrees.rem_euclid(360.0);
    if result == 360.0 { 0.0 } else { result }
}

#[test]
fn test_normalize_degrees() {
    assert_eq!(normalize_degrees(0.0), 0.0);
    assert_eq!(normalize_degrees(360.0), 0.0);
    assert_eq!(normalize_degrees(720.5), 0.5);
    assert_eq!(normalize_degrees(-10.0), 350.0);
    assert_eq!(normalize_degrees(-370.0), 350.0);
}

pub fn calc_julian_day(date: &NaiveDate) -> i64 {
    let mon = date.month() as i64;
    let day = date.day() as i64;
    let year = date.year() as i64;
    let a = (14 - mon) / 12;
    let y = year + 4800 - a;
    let m = mon + 12 * a - 3;
    day + (153 * m + 2)/5 + 365*y + y/4 - y/100 + y/400 - 32045
}

#[test]
fn test_calc_julian_day() {
    assert_eq!(
        calc_julian_day(&NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()),
        2_451_911
    );
}

pub fn calc_julian_time(dt: &NaiveDateTime) -> f64 {
    let julian_day = calc_julian_day(&dt.date()) as f64;
    let hour = dt.hour() as f64;
    let min = dt.minute() as f64;
    let mut sec = dt.second() as f64;
    let msecs = (dt.nanosecond() / 1_000_000) as f64;
    sec += msecs / 1000.0;
    julian_day + (hour - 12.0) / 24.0 + min / 1440.0 + sec / 86400.0
}

/// Days since the J2000.0 epoch (2000-01-01 12:00 UTC), fractional
pub fn days_since_j2000(dt: &NaiveDateTime) -> f64 {
    calc_julian_time(dt) - 2_451_545.0
}

#[test]
fn test_days_since_j2000() {
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
    assert_eq!(days_since_j2000(&epoch), 0.0);

    let next_noon = NaiveDate::from_ymd_opt(2000, 1, 2).unwrap().and_hms_opt(12, 0, 0).unwrap();
    assert_eq!(days_since_j2000(&next_noon), 1.0);

    let midnight = NaiveDate::from_ymd_opt(2000, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
    assert_eq!(days_since_j2000(&midnight), 0.5);
}
