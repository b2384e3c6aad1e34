//! Two-layer International Standard Atmosphere

use serde::{Deserialize, Serialize};

const SEA_LEVEL_TEMPERATURE: f64 = 288.15;
const SEA_LEVEL_PRESSURE: f64 = 101_325.0;
const LAPSE_RATE: f64 = 0.0065;
const TROPOPAUSE_ALTITUDE: f64 = 11_000.0;
const TROPOPAUSE_TEMPERATURE: f64 = 216.65;
const TROPOPAUSE_PRESSURE: f64 = 22_632.0;
const PRESSURE_EXPONENT: f64 = 5.2561;
const STRATOSPHERE_DECAY: f64 = 0.000_157_7;
const GAS_CONSTANT: f64 = 287.0;
const HEAT_CAPACITY_RATIO: f64 = 1.4;

/// Free-stream air properties at a given altitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereProperties {
    /// Air density \[kg/m^3\]
    pub density: f64,
    /// Speed of sound \[m/s\]
    pub sound_speed: f64,
    /// Static pressure \[Pa\]
    pub pressure: f64,
    /// Static temperature \[K\]
    pub temperature: f64,
}

/// Standard atmosphere with a linear troposphere and an isothermal stratosphere
#[derive(Debug, Clone, Copy, Default)]
pub struct AtmosphereModel;

impl AtmosphereModel {
    /// Evaluate the atmosphere at `altitude` \[m\]
    pub fn properties(altitude: f64) -> AtmosphereProperties {
        let (temperature, pressure) = if altitude <= TROPOPAUSE_ALTITUDE {
            let temperature = SEA_LEVEL_TEMPERATURE - LAPSE_RATE * altitude;
            let pressure =
                SEA_LEVEL_PRESSURE * (temperature / SEA_LEVEL_TEMPERATURE).powf(PRESSURE_EXPONENT);
            (temperature, pressure)
        } else {
            let pressure = TROPOPAUSE_PRESSURE
                * (-STRATOSPHERE_DECAY * (altitude - TROPOPAUSE_ALTITUDE)).exp();
            (TROPOPAUSE_TEMPERATURE, pressure)
        };

        AtmosphereProperties {
            density: pressure / (GAS_CONSTANT * temperature),
            sound_speed: (HEAT_CAPACITY_RATIO * GAS_CONSTANT * temperature).sqrt(),
            pressure,
            temperature,
        }
    }
}
