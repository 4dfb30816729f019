use serde::{Serialize, Deserialize};

/// Geometry of one rotary axis: stepper resolution times the reduction
/// between the drive pinion and the axis gear
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AxisOptions {
    pub motor_steps: u32,
    pub micro_steps: u32,
    pub gear_teeth:  u32,
    pub drive_teeth: u32,
}

impl AxisOptions {
    pub fn steps_per_rev(&self) -> i64 {
        (self.gear_teeth as i64 * self.motor_steps as i64 * self.micro_steps as i64)
            / self.drive_teeth as i64
    }
}

impl Default for AxisOptions {
    fn default() -> Self {
        Self {
            motor_steps: 200,
            micro_steps: 8,
            gear_teeth:  60,
            drive_teeth: 15,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MountOptions {
    pub azimuth:           AxisOptions,
    pub altitude:          AxisOptions,
    pub park_alt:          f64, // in degrees
    pub park_az:           f64, // in degrees
    pub reaim_interval_ms: i64,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            azimuth: AxisOptions::default(),
            altitude: AxisOptions {
                gear_teeth: 35,
                ..AxisOptions::default()
            },
            park_alt:          0.0,
            park_az:           0.0,
            reaim_interval_ms: crate::core::consts::REAIM_INTERVAL_MS,
        }
    }
}

#[test]
fn test_steps_per_rev() {
    // 200 * 8 motor steps through a 60:15 reduction
    assert_eq!(AxisOptions::default().steps_per_rev(), 6400);

    let altitude = MountOptions::default().altitude;
    assert_eq!(altitude.steps_per_rev(), 3733);
}
