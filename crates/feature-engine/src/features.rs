//! Feature Extraction per Window

use crate::error::FeatureError;
use crate::fft::{Spectrum, SpectrumAnalyzer};
use crate::filter::BandPassFilter;
use crate::motor::{MotorFrequencies, MotorParameters};
use crate::{bearing, common, eccentricity, rotor, stator};
use sample_buffer::Window;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Feature name to value
pub type FeatureMap = BTreeMap<String, f64>;

/// Phase labels in channel order R, S, T
pub(crate) const PHASES: [&str; 3] = ["A", "B", "C"];

/// The five diagnostic feature groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureGroup {
    Common,
    Rotor,
    Stator,
    Bearing,
    Eccentricity,
}

impl FeatureGroup {
    pub const ALL: [FeatureGroup; 5] = [
        FeatureGroup::Common,
        FeatureGroup::Rotor,
        FeatureGroup::Stator,
        FeatureGroup::Bearing,
        FeatureGroup::Eccentricity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureGroup::Common => "common",
            FeatureGroup::Rotor => "rotor",
            FeatureGroup::Stator => "stator",
            FeatureGroup::Bearing => "bearing",
            FeatureGroup::Eccentricity => "eccentricity",
        }
    }

    /// Fields the extractor produces for this group
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            FeatureGroup::Common => common::FIELDS,
            FeatureGroup::Rotor => rotor::FIELDS,
            FeatureGroup::Stator => stator::FIELDS,
            FeatureGroup::Bearing => bearing::FIELDS,
            FeatureGroup::Eccentricity => eccentricity::FIELDS,
        }
    }
}

/// Features of one window, grouped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroups {
    pub common: FeatureMap,
    pub rotor: FeatureMap,
    pub stator: FeatureMap,
    pub bearing: FeatureMap,
    pub eccentricity: FeatureMap,
}

impl FeatureGroups {
    pub fn group(&self, group: FeatureGroup) -> &FeatureMap {
        match group {
            FeatureGroup::Common => &self.common,
            FeatureGroup::Rotor => &self.rotor,
            FeatureGroup::Stator => &self.stator,
            FeatureGroup::Bearing => &self.bearing,
            FeatureGroup::Eccentricity => &self.eccentricity,
        }
    }

    pub fn group_mut(&mut self, group: FeatureGroup) -> &mut FeatureMap {
        match group {
            FeatureGroup::Common => &mut self.common,
            FeatureGroup::Rotor => &mut self.rotor,
            FeatureGroup::Stator => &mut self.stator,
            FeatureGroup::Bearing => &mut self.bearing,
            FeatureGroup::Eccentricity => &mut self.eccentricity,
        }
    }

    /// Total number of values across all groups
    pub fn len(&self) -> usize {
        FeatureGroup::ALL.iter().map(|g| self.group(*g).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extractor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub motor: MotorParameters,
    /// STFT segment length (samples)
    pub stft_segment: usize,
    /// STFT hop (samples)
    pub stft_hop: usize,
    /// Envelope band-pass edges (Hz)
    pub envelope_band: (f64, f64),
    /// Envelope filter prototype order
    pub envelope_filter_order: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            motor: MotorParameters::default(),
            stft_segment: 16384,
            stft_hop: 4096,
            envelope_band: (500.0, 5000.0),
            envelope_filter_order: 4,
        }
    }
}

impl ExtractorConfig {
    /// STFT segment and hop for a window of `len` samples. Segments longer
    /// than the window shrink to it, keeping the hop-to-segment ratio.
    pub fn stft_geometry(&self, len: usize) -> (usize, usize) {
        let configured = self.stft_segment.max(1);
        let segment = configured.min(len).max(1);
        let hop = (self.stft_hop as f64 * segment as f64 / configured as f64).floor() as usize;
        (segment, hop.clamp(1, segment))
    }
}

/// Per-window shared inputs for the group extractors
pub(crate) struct WindowContext<'a> {
    pub signals: [&'a [f64]; 3],
    /// Hann-windowed spectra of the three phases
    pub spectra: [Spectrum; 3],
    pub freqs: &'a MotorFrequencies,
    pub config: &'a ExtractorConfig,
    pub envelope_filter: Option<&'a BandPassFilter>,
}

/// Computes the five feature groups for a window of three-phase current
pub struct FeatureExtractor {
    config: ExtractorConfig,
    freqs: MotorFrequencies,
    /// None when the envelope band reaches the Nyquist frequency
    envelope_filter: Option<BandPassFilter>,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new(config: ExtractorConfig) -> Result<Self, FeatureError> {
        let freqs = MotorFrequencies::from(&config.motor);
        let (low, high) = config.envelope_band;

        let envelope_filter = if high >= freqs.nyquist() {
            warn!(
                "Envelope band {}-{} Hz reaches Nyquist {} Hz, envelope features disabled",
                low,
                high,
                freqs.nyquist()
            );
            None
        } else {
            Some(BandPassFilter::butterworth(
                config.envelope_filter_order,
                low,
                high,
                freqs.sample_rate,
            )?)
        };

        debug!(
            "Feature extractor ready: fs={} Hz, supply={} Hz, slip={:.4}",
            freqs.sample_rate, freqs.supply, freqs.slip
        );

        Ok(Self {
            config,
            freqs,
            envelope_filter,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn frequencies(&self) -> &MotorFrequencies {
        &self.freqs
    }

    /// Fields produced per group
    pub fn declared_fields(&self) -> Vec<(FeatureGroup, &'static [&'static str])> {
        FeatureGroup::ALL.iter().map(|g| (*g, g.fields())).collect()
    }

    /// Extract features from one window
    pub fn extract(&self, window: &Window<'_>) -> Result<FeatureGroups, FeatureError> {
        self.extract_channels(window.r, window.s, window.t)
    }

    /// Extract features from three phase channels
    pub fn extract_channels(
        &self,
        a: &[f64],
        b: &[f64],
        c: &[f64],
    ) -> Result<FeatureGroups, FeatureError> {
        if a.len() != b.len() || b.len() != c.len() {
            return Err(FeatureError::ChannelLengthMismatch {
                a: a.len(),
                b: b.len(),
                c: c.len(),
            });
        }
        if a.is_empty() {
            return Err(FeatureError::EmptyWindow);
        }

        let mut analyzer = SpectrumAnalyzer::new(self.freqs.sample_rate);
        let spectra = [
            analyzer.hann_spectrum(a),
            analyzer.hann_spectrum(b),
            analyzer.hann_spectrum(c),
        ];
        let ctx = WindowContext {
            signals: [a, b, c],
            spectra,
            freqs: &self.freqs,
            config: &self.config,
            envelope_filter: self.envelope_filter.as_ref(),
        };

        let groups = FeatureGroups {
            common: common::extract(&ctx),
            rotor: rotor::extract(&ctx, &mut analyzer),
            stator: stator::extract(&ctx, &mut analyzer),
            bearing: bearing::extract(&ctx, &mut analyzer),
            eccentricity: eccentricity::extract(&ctx, &mut analyzer),
        };

        for group in FeatureGroup::ALL {
            if let Some((field, _)) = groups.group(group).iter().find(|(_, v)| !v.is_finite()) {
                return Err(FeatureError::NonFinite {
                    group: group.name(),
                    field: field.clone(),
                });
            }
        }

        debug!("Extracted {} features from {} samples", groups.len(), a.len());
        Ok(groups)
    }
}
