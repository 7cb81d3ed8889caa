use super::config::DetectorConfig;
use super::error::ConfigError;
use super::layer::Layer;
use super::position::PositionCalculator;

/// Bounds on `end1 + end2 - 2 mcp` for genuine signal combinations of a layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimesumWindow {
    pub low: f64,
    pub high: f64,
}

impl TimesumWindow {
    pub fn center(&self) -> f64 {
        0.5 * (self.low + self.high)
    }

    pub fn half_width(&self) -> f64 {
        0.5 * (self.high - self.low)
    }

    /// Strict containment; values on the bounds are rejected
    pub fn contains(&self, timesum: f64) -> bool {
        self.low < timesum && timesum < self.high
    }
}

/// Calibration of one of the two layers used for the position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerCalibration {
    pub layer: Layer,
    pub timesum: TimesumWindow,
    /// mm per ns
    pub scale_factor: f64,
    /// mm, added to the scaled difference
    pub offset: f64,
}

impl LayerCalibration {
    /// Layer coordinate in mm from the two wire-end times
    pub fn value(&self, end1: f64, end2: f64) -> f64 {
        (end1 - end2) * self.scale_factor + self.offset
    }
}

/// Read-only parameters for reconstructing the hits of one detector.
///
/// The bundle is validated once when it is created. A new bundle may replace
/// the one of a detector between events, it is never changed while an event is
/// being reconstructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub first: LayerCalibration,
    pub second: LayerCalibration,
    /// Maximum time for a signal to travel the full length of a wire, in ns
    pub runtime: f64,
    /// Radius of the MCP active area in mm
    pub max_radius: f64,
    pub calculator: PositionCalculator,
}

impl Calibration {
    /// Build and validate the calibration described by a detector definition
    pub fn from_config(def: &DetectorConfig) -> Result<Self, ConfigError> {
        if !def.layer_pair.is_valid_for(def.kind) {
            return Err(ConfigError::MismatchedLayerPair {
                name: def.name.clone(),
                kind: def.kind,
                pair: def.layer_pair,
            });
        }
        if !(def.runtime > 0.0) {
            return Err(ConfigError::NonPositiveRuntime {
                name: def.name.clone(),
                value: def.runtime,
            });
        }
        if !(def.max_radius > 0.0) {
            return Err(ConfigError::NonPositiveRadius {
                name: def.name.clone(),
                value: def.max_radius,
            });
        }

        let (first_layer, second_layer) = def.layer_pair.layers();
        let first = Self::layer_calibration(def, first_layer)?;
        let second = Self::layer_calibration(def, second_layer)?;

        if first.scale_factor.signum() != second.scale_factor.signum() {
            spdlog::warn!(
                "Detector {} has scale factors of opposite sign -- {:?}: {} {:?}: {}",
                def.name,
                first_layer,
                first.scale_factor,
                second_layer,
                second.scale_factor
            );
        }

        Ok(Self {
            first,
            second,
            runtime: def.runtime,
            max_radius: def.max_radius,
            calculator: def.layer_pair.calculator(),
        })
    }

    fn layer_calibration(def: &DetectorConfig, layer: Layer) -> Result<LayerCalibration, ConfigError> {
        let layer_def = def.layers.get(&layer).ok_or(ConfigError::MissingLayer {
            name: def.name.clone(),
            layer,
        })?;

        let [low, high] = layer_def.timesum;
        if !(low < high) {
            return Err(ConfigError::BadTimesumWindow {
                name: def.name.clone(),
                layer,
                low,
                high,
            });
        }
        let scale_factor = layer_def.scale_factor;
        if !scale_factor.is_finite() || scale_factor == 0.0 {
            return Err(ConfigError::BadScaleFactor {
                name: def.name.clone(),
                layer,
                value: scale_factor,
            });
        }
        let offset = match layer {
            Layer::W => def.w_layer_offset,
            _ => 0.0,
        };

        Ok(LayerCalibration {
            layer,
            timesum: TimesumWindow { low, high },
            scale_factor,
            offset,
        })
    }
}
