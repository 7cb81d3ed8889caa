/// Converts the scaled wire-end differences of two layers into a position.
///
/// The hex layers are rotated by 60 degrees against each other, so any two of
/// them span the detector plane. The quad layers are already orthogonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionCalculator {
    XY,
    UV,
    UW,
    VW,
}

impl PositionCalculator {
    /// Compute (x, y) in mm from the layer values (a, b) in mm
    pub fn compute(&self, a: f64, b: f64) -> (f64, f64) {
        let sqrt3 = 3.0_f64.sqrt();
        match self {
            PositionCalculator::XY => (a, b),
            PositionCalculator::UV => (a, (a - 2.0 * b) / sqrt3),
            PositionCalculator::UW => (a, (2.0 * b - a) / sqrt3),
            PositionCalculator::VW => (a + b, (b - a) / sqrt3),
        }
    }
}
