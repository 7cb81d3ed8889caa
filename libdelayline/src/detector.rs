use fxhash::FxHashSet;

use super::calibration::Calibration;
use super::config::DetectorConfig;
use super::error::{ConfigError, EventError};
use super::event_file::SignalEvent;
use super::layer::{AnodeLayer, DetectorKind, Layer, LayerMap, LayerPair};
use super::reconstructor::{reconstruct, DetectorHit};
use super::signal::{Signal, SignalStream};

/// Which event channels feed the MCP and the wire ends of each layer
#[derive(Debug, Clone, PartialEq)]
struct ChannelAssignment {
    mcp: usize,
    layers: LayerMap<Option<[usize; 2]>>,
}

impl ChannelAssignment {
    /// Every assigned channel, MCP first
    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.mcp).chain(
            self.layers
                .iter()
                .filter_map(|(_, c)| c.as_ref())
                .flat_map(|c| c.iter().copied()),
        )
    }
}

/// A delay-line detector: its definition, the signals of the current event, and the hits found in them.
///
/// One instance handles one event at a time. Associating a new event replaces
/// all signals and clears the previous hits.
#[derive(Debug, Clone)]
pub struct DelaylineDetector {
    name: String,
    kind: DetectorKind,
    layer_pair: LayerPair,
    calibration: Calibration,
    channels: ChannelAssignment,
    mcp: SignalStream,
    layers: LayerMap<Option<AnodeLayer>>,
    hits: Vec<DetectorHit>,
}

impl DelaylineDetector {
    /// Create a detector from its definition.
    ///
    /// All configuration problems are reported here; reconstruction itself never fails.
    pub fn new(def: &DetectorConfig) -> Result<Self, ConfigError> {
        let calibration = Calibration::from_config(def)?;

        let mut assigned: LayerMap<Option<[usize; 2]>> = LayerMap::default();
        for (layer, layer_def) in def.layers.iter() {
            if !def.kind.has_layer(*layer) {
                return Err(ConfigError::ForeignLayer {
                    name: def.name.clone(),
                    layer: *layer,
                    kind: def.kind,
                });
            }
            assigned[*layer] = Some(layer_def.channels);
        }

        let channels = ChannelAssignment {
            mcp: def.mcp_channel,
            layers: assigned,
        };
        let mut seen = FxHashSet::default();
        if let Some(channel) = channels.iter().find(|c| !seen.insert(*c)) {
            return Err(ConfigError::DuplicateChannel {
                name: def.name.clone(),
                channel,
            });
        }

        let layers = LayerMap::from_fn(|l| channels.layers[l].map(|_| AnodeLayer::default()));
        spdlog::debug!(
            "Created {:?} detector {} using layers {:?}",
            def.kind,
            def.name,
            def.layer_pair
        );

        Ok(Self {
            name: def.name.clone(),
            kind: def.kind,
            layer_pair: def.layer_pair,
            calibration,
            channels,
            mcp: SignalStream::default(),
            layers,
            hits: Vec::new(),
        })
    }

    /// Load the signals of a new event into the detector.
    ///
    /// The previous hits are dropped and every signal starts out unclaimed.
    pub fn associate(&mut self, event: &SignalEvent) -> Result<(), EventError> {
        self.hits.clear();
        let mcp_signals = self.channel(event, self.channels.mcp)?;
        self.mcp.refill(mcp_signals);
        for layer in Layer::ALL {
            let Some(channels) = self.channels.layers[layer] else {
                continue;
            };
            let wire_one = self.channel(event, channels[0])?;
            let wire_two = self.channel(event, channels[1])?;
            if let Some(anode) = self.layers[layer].as_mut() {
                anode.wire_ends[0].refill(wire_one);
                anode.wire_ends[1].refill(wire_two);
            }
        }
        Ok(())
    }

    /// Check that every assigned channel exists in events with n_channels channels
    pub fn check_channels(&self, n_channels: usize) -> Result<(), ConfigError> {
        match self.channels.iter().find(|c| *c >= n_channels) {
            Some(channel) => Err(ConfigError::ChannelOutOfRange {
                name: self.name.clone(),
                channel,
                n_channels,
            }),
            None => Ok(()),
        }
    }

    /// Reconstruct the hits of the associated event
    pub fn reconstruct(&mut self) -> &[DetectorHit] {
        let (first, second) = self.layer_pair.layers();
        // Both layers exist: the calibration could not be built otherwise
        if let Some((Some(first), Some(second))) = self.layers.pair_mut(first, second) {
            let [f1, f2] = &mut first.wire_ends;
            let [s1, s2] = &mut second.wire_ends;
            self.hits = reconstruct(&mut self.mcp, [f1, f2, s1, s2], &self.calibration);
        } else {
            spdlog::error!(
                "Detector {} is missing a layer of pair {:?}, no hits reconstructed",
                self.name,
                self.layer_pair
            );
        }
        &self.hits
    }

    /// Replace the calibration between events.
    ///
    /// The calibration must be for the layer pair of this detector.
    pub fn set_calibration(&mut self, calibration: Calibration) -> Result<(), ConfigError> {
        let (first, second) = self.layer_pair.layers();
        if calibration.first.layer != first
            || calibration.second.layer != second
            || calibration.calculator != self.layer_pair.calculator()
        {
            return Err(ConfigError::MismatchedCalibration {
                name: self.name.clone(),
                pair: self.layer_pair,
                first: calibration.first.layer,
                second: calibration.second.layer,
            });
        }
        self.calibration = calibration;
        Ok(())
    }

    /// Number of signals on the MCP and all layers which did not end up in a hit
    pub fn orphan_count(&self) -> usize {
        let layers: usize = self
            .layers
            .iter()
            .filter_map(|(_, l)| l.as_ref())
            .map(|l| l.orphan_count())
            .sum();
        layers + self.mcp.orphans().len()
    }

    fn channel<'a>(
        &self,
        event: &'a SignalEvent,
        channel: usize,
    ) -> Result<&'a [Signal], EventError> {
        event
            .channels
            .get(channel)
            .map(|c| c.as_slice())
            .ok_or_else(|| EventError::MissingChannel {
                name: self.name.clone(),
                channel,
                n_channels: event.channels.len(),
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn hits(&self) -> &[DetectorHit] {
        &self.hits
    }

    pub fn mcp(&self) -> &SignalStream {
        &self.mcp
    }

    pub fn layer(&self, layer: Layer) -> Option<&AnodeLayer> {
        self.layers[layer].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;

    fn event(channels: Vec<Vec<f64>>) -> SignalEvent {
        SignalEvent {
            id: 0,
            channels: channels
                .into_iter()
                .map(|c| c.into_iter().map(Signal::at).collect())
                .collect(),
        }
    }

    #[test]
    fn test_quad_event() {
        let mut det = DelaylineDetector::new(&DetectorConfig::quad_template("dld")).unwrap();
        let evt = event(vec![
            vec![1000.0],
            vec![1050.0],
            vec![1050.0],
            vec![1060.0],
            vec![1040.0],
        ]);
        det.associate(&evt).unwrap();
        let hits = det.reconstruct().to_vec();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].y - 8.0).abs() < 1e-12);
        assert_eq!(det.orphan_count(), 0);
        let x = det.layer(Layer::X).unwrap();
        assert!(x.wire_ends[0].is_used(0));
        assert!(det.mcp().is_used(0));

        // A new event resets everything
        let empty = event(vec![vec![]; 5]);
        det.associate(&empty).unwrap();
        assert!(det.hits().is_empty());
        assert!(det.reconstruct().is_empty());
    }

    #[test]
    fn test_unsorted_channel_is_sorted() {
        let mut det = DelaylineDetector::new(&DetectorConfig::quad_template("dld")).unwrap();
        let evt = event(vec![
            vec![5000.0, 1000.0],
            vec![1050.0],
            vec![1050.0],
            vec![1060.0],
            vec![1040.0],
        ]);
        det.associate(&evt).unwrap();
        assert_eq!(det.reconstruct().len(), 1);
        assert_eq!(det.mcp().time(0), 1000.0);
        assert_eq!(det.orphan_count(), 1);
    }

    #[test]
    fn test_missing_channel() {
        let mut det = DelaylineDetector::new(&DetectorConfig::quad_template("dld")).unwrap();
        let evt = event(vec![vec![1000.0], vec![1050.0]]);
        assert!(matches!(
            det.associate(&evt),
            Err(EventError::MissingChannel { channel: 2, .. })
        ));
    }

    #[test]
    fn test_foreign_layer() {
        let mut def = DetectorConfig::quad_template("dld");
        def.layers.insert(
            Layer::W,
            LayerConfig {
                channels: [5, 6],
                timesum: [20.0, 200.0],
                scale_factor: 0.4,
            },
        );
        assert!(matches!(
            DelaylineDetector::new(&def),
            Err(ConfigError::ForeignLayer { layer: Layer::W, .. })
        ));
    }

    #[test]
    fn test_hex_detector_keeps_unused_layer() {
        let mut def = DetectorConfig::quad_template("ion");
        def.kind = DetectorKind::Hex;
        def.layer_pair = LayerPair::UW;
        let base = def.layers[&Layer::X].clone();
        def.layers.clear();
        for (layer, channels) in [(Layer::U, [1, 2]), (Layer::V, [3, 4]), (Layer::W, [5, 6])] {
            def.layers.insert(
                layer,
                LayerConfig {
                    channels,
                    ..base.clone()
                },
            );
        }
        let mut det = DelaylineDetector::new(&def).unwrap();
        let evt = event(vec![
            vec![1000.0],
            vec![1060.0],
            vec![1040.0],
            vec![1030.0],
            vec![1070.0],
            vec![1050.0],
            vec![1050.0],
        ]);
        det.associate(&evt).unwrap();
        let hits = det.reconstruct().to_vec();
        assert_eq!(hits.len(), 1);
        // u = 8, w = 0 => y = -8 / sqrt(3)
        assert!((hits[0].x - 8.0).abs() < 1e-9);
        assert!((hits[0].y + 8.0 / 3.0_f64.sqrt()).abs() < 1e-9);
        // The V layer is read out but not used for the position
        assert_eq!(det.layer(Layer::V).unwrap().orphan_count(), 2);
        assert_eq!(det.orphan_count(), 2);
    }

    #[test]
    fn test_set_calibration() {
        let mut det = DelaylineDetector::new(&DetectorConfig::quad_template("dld")).unwrap();
        let mut def = DetectorConfig::quad_template("dld");
        def.max_radius = 5.0;
        det.set_calibration(Calibration::from_config(&def).unwrap())
            .unwrap();

        let evt = event(vec![
            vec![1000.0],
            vec![1050.0],
            vec![1050.0],
            vec![1060.0],
            vec![1040.0],
        ]);
        det.associate(&evt).unwrap();
        assert!(det.reconstruct().is_empty());
        assert_eq!(det.calibration().max_radius, 5.0);
    }

    fn hex_definition(pair: LayerPair) -> DetectorConfig {
        let mut def = DetectorConfig::quad_template("ion");
        def.kind = DetectorKind::Hex;
        def.layer_pair = pair;
        let base = def.layers[&Layer::X].clone();
        def.layers.clear();
        for (layer, channels) in [(Layer::U, [1, 2]), (Layer::V, [3, 4]), (Layer::W, [5, 6])] {
            def.layers.insert(
                layer,
                LayerConfig {
                    channels,
                    ..base.clone()
                },
            );
        }
        def
    }

    #[test]
    fn test_set_calibration_for_other_pair() {
        let mut det = DelaylineDetector::new(&hex_definition(LayerPair::VW)).unwrap();
        let uv = Calibration::from_config(&hex_definition(LayerPair::UV)).unwrap();
        assert!(matches!(
            det.set_calibration(uv),
            Err(ConfigError::MismatchedCalibration {
                pair: LayerPair::VW,
                first: Layer::U,
                second: Layer::V,
                ..
            })
        ));
        assert_eq!(det.calibration().calculator, LayerPair::VW.calculator());

        // The detector still reconstructs with its own pair: v = -4, w = 0
        let evt = event(vec![
            vec![1000.0],
            vec![],
            vec![],
            vec![1045.0],
            vec![1055.0],
            vec![1050.0],
            vec![1050.0],
        ]);
        det.associate(&evt).unwrap();
        let hits = det.reconstruct().to_vec();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].x + 4.0).abs() < 1e-9);
        assert!((hits[0].y - 4.0 / 3.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_channel() {
        let mut def = DetectorConfig::quad_template("dld");
        def.mcp_channel = 3;
        assert!(matches!(
            DelaylineDetector::new(&def),
            Err(ConfigError::DuplicateChannel { channel: 3, .. })
        ));

        let mut def = hex_definition(LayerPair::UV);
        def.layers.get_mut(&Layer::W).unwrap().channels = [4, 7];
        assert!(matches!(
            DelaylineDetector::new(&def),
            Err(ConfigError::DuplicateChannel { channel: 4, .. })
        ));
    }

    #[test]
    fn test_check_channels() {
        let det = DelaylineDetector::new(&hex_definition(LayerPair::UW)).unwrap();
        assert!(det.check_channels(7).is_ok());
        assert!(matches!(
            det.check_channels(6),
            Err(ConfigError::ChannelOutOfRange {
                channel: 6,
                n_channels: 6,
                ..
            })
        ));
    }
}
