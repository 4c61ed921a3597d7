//! Motor Nameplate Parameters and Characteristic Frequencies

use serde::{Deserialize, Serialize};

/// Nameplate and bearing geometry of the monitored motor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorParameters {
    /// Current sampling rate (Hz)
    pub sample_rate: f64,
    /// Supply frequency (Hz)
    pub supply_frequency: f64,
    /// Rated speed (rpm)
    pub nominal_speed: f64,
    /// Synchronous speed (rpm)
    pub synchronous_speed: f64,
    pub poles: u32,
    /// Ball pass frequency, outer race (Hz)
    pub bpfo: f64,
    /// Ball pass frequency, inner race (Hz)
    pub bpfi: f64,
    /// Ball spin frequency (Hz)
    pub bsf: f64,
    /// Fundamental train frequency (Hz)
    pub ftf: f64,
}

impl Default for MotorParameters {
    fn default() -> Self {
        Self {
            sample_rate: 25600.0,
            supply_frequency: 50.0,
            nominal_speed: 1770.0,
            synchronous_speed: 1800.0,
            poles: 4,
            bpfo: 105.4,
            bpfi: 160.1,
            bsf: 28.2,
            ftf: 11.7,
        }
    }
}

/// Frequencies derived once from [`MotorParameters`]
#[derive(Debug, Clone, PartialEq)]
pub struct MotorFrequencies {
    pub sample_rate: f64,
    pub supply: f64,
    pub slip: f64,
    pub rotor: f64,
    /// Broken-bar sidebands f(1-2s), f(1+2s), f(1-4s)
    pub sb1_lower: f64,
    pub sb1_upper: f64,
    pub sb2_lower: f64,
    pub bpfo: f64,
    pub bpfi: f64,
    pub bsf: f64,
    pub ftf: f64,
    /// Eccentricity components f-fr, f+fr, f-2fr
    pub ecc_main_1_lower: f64,
    pub ecc_main_1_upper: f64,
    pub ecc_main_2_lower: f64,
}

impl MotorFrequencies {
    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }
}

impl From<&MotorParameters> for MotorFrequencies {
    fn from(params: &MotorParameters) -> Self {
        let f = params.supply_frequency;
        let slip = (params.synchronous_speed - params.nominal_speed) / params.synchronous_speed;
        let rotor = params.nominal_speed / 60.0;

        Self {
            sample_rate: params.sample_rate,
            supply: f,
            slip,
            rotor,
            sb1_lower: f * (1.0 - 2.0 * slip),
            sb1_upper: f * (1.0 + 2.0 * slip),
            sb2_lower: f * (1.0 - 4.0 * slip),
            bpfo: params.bpfo,
            bpfi: params.bpfi,
            bsf: params.bsf,
            ftf: params.ftf,
            ecc_main_1_lower: f - rotor,
            ecc_main_1_upper: f + rotor,
            ecc_main_2_lower: f - 2.0 * rotor,
        }
    }
}
