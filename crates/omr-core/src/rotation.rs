use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Cyclic relabelling of a quadrilateral's corners.
///
/// A located quad is always ordered TL, TR, BR, BL *in the photograph*. When
/// the sheet itself is turned, the canonical top-left corner sits at a
/// different image corner; the rotation says which one. Reflections are not
/// modelled since a printed sheet cannot be photographed mirrored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CornerRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl CornerRotation {
    /// All four candidates, identity first.
    pub const ALL: [CornerRotation; 4] = [
        CornerRotation::Deg0,
        CornerRotation::Deg90,
        CornerRotation::Deg180,
        CornerRotation::Deg270,
    ];

    /// Number of quarter turns.
    #[inline]
    pub fn steps(self) -> usize {
        match self {
            CornerRotation::Deg0 => 0,
            CornerRotation::Deg90 => 1,
            CornerRotation::Deg180 => 2,
            CornerRotation::Deg270 => 3,
        }
    }

    pub fn degrees(self) -> u32 {
        self.steps() as u32 * 90
    }

    pub fn from_steps(steps: usize) -> Self {
        Self::ALL[steps % 4]
    }

    pub fn inverse(self) -> Self {
        Self::from_steps(4 - self.steps())
    }

    pub fn compose(self, other: Self) -> Self {
        Self::from_steps(self.steps() + other.steps())
    }

    /// Image corners listed in canonical TL, TR, BR, BL order.
    ///
    /// Canonical corner `i` lands on image corner `(i + steps) % 4`.
    #[inline]
    pub fn apply(self, image_corners: &[Point2<f32>; 4]) -> [Point2<f32>; 4] {
        let k = self.steps();
        [
            image_corners[k % 4],
            image_corners[(k + 1) % 4],
            image_corners[(k + 2) % 4],
            image_corners[(k + 3) % 4],
        ]
    }
}
