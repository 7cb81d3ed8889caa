use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use super::position::PositionCalculator;
use super::signal::SignalStream;

pub const NUMBER_OF_LAYERS: usize = 5;

/// The anode layers of a delay-line detector.
///
/// Quad anodes have the orthogonal X and Y layers, hex anodes the U, V and W
/// layers rotated by 60 degrees against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    U,
    V,
    W,
    X,
    Y,
}

impl Layer {
    pub const ALL: [Layer; NUMBER_OF_LAYERS] = [Layer::U, Layer::V, Layer::W, Layer::X, Layer::Y];

    pub fn index(&self) -> usize {
        match self {
            Layer::U => 0,
            Layer::V => 1,
            Layer::W => 2,
            Layer::X => 3,
            Layer::Y => 4,
        }
    }
}

/// Fixed size lookup with one slot per [`Layer`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerMap<T> {
    slots: [T; NUMBER_OF_LAYERS],
}

impl<T> LayerMap<T> {
    pub fn from_fn(mut f: impl FnMut(Layer) -> T) -> Self {
        Self {
            slots: Layer::ALL.map(&mut f),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Layer, &T)> {
        Layer::ALL.into_iter().zip(self.slots.iter())
    }

    /// Mutable access to two distinct layers at once.
    ///
    /// Returns None if both layers are the same.
    pub fn pair_mut(&mut self, first: Layer, second: Layer) -> Option<(&mut T, &mut T)> {
        let (a, b) = (first.index(), second.index());
        if a == b {
            return None;
        }
        let (low, high) = (a.min(b), a.max(b));
        let (head, tail) = self.slots.split_at_mut(high);
        let (low_ref, high_ref) = (&mut head[low], &mut tail[0]);
        if a < b {
            Some((low_ref, high_ref))
        } else {
            Some((high_ref, low_ref))
        }
    }
}

impl<T> Index<Layer> for LayerMap<T> {
    type Output = T;

    fn index(&self, index: Layer) -> &Self::Output {
        &self.slots[index.index()]
    }
}

impl<T> IndexMut<Layer> for LayerMap<T> {
    fn index_mut(&mut self, index: Layer) -> &mut Self::Output {
        &mut self.slots[index.index()]
    }
}

/// One of the two readout points of a delay-line wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireEnd {
    One,
    Two,
}

impl WireEnd {
    pub fn index(&self) -> usize {
        match self {
            WireEnd::One => 0,
            WireEnd::Two => 1,
        }
    }
}

/// The signals of both wire ends of one anode layer for the current event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnodeLayer {
    pub wire_ends: [SignalStream; 2],
}

impl AnodeLayer {
    pub fn wire_end(&self, end: WireEnd) -> &SignalStream {
        &self.wire_ends[end.index()]
    }

    pub fn wire_end_mut(&mut self, end: WireEnd) -> &mut SignalStream {
        &mut self.wire_ends[end.index()]
    }

    /// Timesum of the first signal on each wire end relative to an MCP time.
    ///
    /// Returns None if either wire end is empty.
    pub fn timesum(&self, mcp: f64) -> Option<f64> {
        let one = self.wire_ends[0].first()?;
        let two = self.wire_ends[1].first()?;
        Some(one.time + two.time - 2.0 * mcp)
    }

    pub fn reset_claims(&mut self) {
        self.wire_ends.iter_mut().for_each(|w| w.reset_claims());
    }

    pub fn orphan_count(&self) -> usize {
        self.wire_ends.iter().map(|w| w.orphans().len()).sum()
    }
}

/// The anode geometry of a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Quad,
    Hex,
}

impl DetectorKind {
    pub fn layers(&self) -> &'static [Layer] {
        match self {
            DetectorKind::Quad => &[Layer::X, Layer::Y],
            DetectorKind::Hex => &[Layer::U, Layer::V, Layer::W],
        }
    }

    pub fn has_layer(&self, layer: Layer) -> bool {
        self.layers().contains(&layer)
    }
}

/// The two layers used to compute a hit position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerPair {
    XY,
    UV,
    UW,
    VW,
}

impl LayerPair {
    /// The (first, second) layer of the pair
    pub fn layers(&self) -> (Layer, Layer) {
        match self {
            LayerPair::XY => (Layer::X, Layer::Y),
            LayerPair::UV => (Layer::U, Layer::V),
            LayerPair::UW => (Layer::U, Layer::W),
            LayerPair::VW => (Layer::V, Layer::W),
        }
    }

    pub fn is_valid_for(&self, kind: DetectorKind) -> bool {
        match kind {
            DetectorKind::Quad => *self == LayerPair::XY,
            DetectorKind::Hex => *self != LayerPair::XY,
        }
    }

    pub fn calculator(&self) -> PositionCalculator {
        match self {
            LayerPair::XY => PositionCalculator::XY,
            LayerPair::UV => PositionCalculator::UV,
            LayerPair::UW => PositionCalculator::UW,
            LayerPair::VW => PositionCalculator::VW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_indices_are_unique() {
        let map = LayerMap::from_fn(|l| l.index());
        for (layer, idx) in map.iter() {
            assert_eq!(layer.index(), *idx);
        }
    }

    #[test]
    fn test_pair_mut() {
        let mut map: LayerMap<i32> = LayerMap::default();
        {
            let (w, u) = map.pair_mut(Layer::W, Layer::U).unwrap();
            *w = 3;
            *u = 1;
        }
        assert_eq!(map[Layer::U], 1);
        assert_eq!(map[Layer::W], 3);
        assert!(map.pair_mut(Layer::X, Layer::X).is_none());
    }

    #[test]
    fn test_layer_pair_validity() {
        assert!(LayerPair::XY.is_valid_for(DetectorKind::Quad));
        assert!(!LayerPair::UV.is_valid_for(DetectorKind::Quad));
        assert!(!LayerPair::XY.is_valid_for(DetectorKind::Hex));
        for pair in [LayerPair::UV, LayerPair::UW, LayerPair::VW] {
            assert!(pair.is_valid_for(DetectorKind::Hex));
            let (first, second) = pair.layers();
            assert!(DetectorKind::Hex.has_layer(first));
            assert!(DetectorKind::Hex.has_layer(second));
        }
    }

    #[test]
    fn test_anode_timesum() {
        let mut layer = AnodeLayer::default();
        assert!(layer.timesum(1000.0).is_none());
        layer.wire_ends[0] = SignalStream::from_times(&[1060.0]);
        layer.wire_ends[1] = SignalStream::from_times(&[1040.0]);
        assert_eq!(layer.timesum(1000.0), Some(100.0));
    }

    #[test]
    fn test_layer_pair_yaml() {
        let pair: LayerPair = serde_yaml::from_str("uw").unwrap();
        assert_eq!(pair, LayerPair::UW);
        let kind: DetectorKind = serde_yaml::from_str("hex").unwrap();
        assert_eq!(kind, DetectorKind::Hex);
    }
}
