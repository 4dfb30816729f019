use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SiteOptions {
    pub latitude:  f64, // in degrees
    pub longitude: f64, // in degrees
}

impl Default for SiteOptions {
    fn default() -> Self {
        // Rutland, Vermont
        Self {
            latitude:  43.554736,
            longitude: -73.249809,
        }
    }
}
