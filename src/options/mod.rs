pub mod mount;
pub mod site;

pub use mount::*;
pub use site::*;

use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct Options {
    pub mount: MountOptions,
    pub site:  SiteOptions,
}

#[test]
fn test_options_defaults_from_empty_json() {
    let options: Options = serde_json::from_str("{}").unwrap();
    assert_eq!(options.mount.azimuth.steps_per_rev(), 6400);
    assert_eq!(options.mount.altitude.steps_per_rev(), 3733);
    assert_eq!(options.mount.reaim_interval_ms, 1000);
    assert!(f64::abs(options.site.latitude - 43.554736) < 1e-9);
}

#[test]
fn test_options_round_trip() {
    let mut options = Options::default();
    options.site.latitude = -33.9;
    options.mount.park_az = 180.0;
    let text = serde_json::to_string_pretty(&options).unwrap();
    let loaded: Options = serde_json::from_str(&text).unwrap();
    assert_eq!(loaded.site.latitude, -33.9);
    assert_eq!(loaded.mount.park_az, 180.0);
}
