use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned block face direction.
///
/// Uses voxel world convention: east is +X, up is +Y, south is +Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockFace {
    East,
    West,
    Up,
    Down,
    South,
    North,
}

impl BlockFace {
    /// All six faces, in a fixed iteration order.
    pub const ALL: [BlockFace; 6] = [
        BlockFace::East,
        BlockFace::West,
        BlockFace::Up,
        BlockFace::Down,
        BlockFace::South,
        BlockFace::North,
    ];

    /// Convert to a unit DVec3 normal
    pub fn as_dvec3(self) -> DVec3 {
        match self {
            BlockFace::East => DVec3::X,
            BlockFace::West => -DVec3::X,
            BlockFace::Up => DVec3::Y,
            BlockFace::Down => -DVec3::Y,
            BlockFace::South => DVec3::Z,
            BlockFace::North => -DVec3::Z,
        }
    }

    /// Convert to an integer step vector
    pub fn as_ivec3(self) -> IVec3 {
        match self {
            BlockFace::East => IVec3::X,
            BlockFace::West => -IVec3::X,
            BlockFace::Up => IVec3::Y,
            BlockFace::Down => -IVec3::Y,
            BlockFace::South => IVec3::Z,
            BlockFace::North => -IVec3::Z,
        }
    }

    /// Get the opposite face
    pub fn opposite(self) -> Self {
        match self {
            BlockFace::East => BlockFace::West,
            BlockFace::West => BlockFace::East,
            BlockFace::Up => BlockFace::Down,
            BlockFace::Down => BlockFace::Up,
            BlockFace::South => BlockFace::North,
            BlockFace::North => BlockFace::South,
        }
    }

    /// Component index of the face axis: 0=X, 1=Y, 2=Z
    #[inline]
    pub fn axis_index(self) -> usize {
        match self {
            BlockFace::East | BlockFace::West => 0,
            BlockFace::Up | BlockFace::Down => 1,
            BlockFace::South | BlockFace::North => 2,
        }
    }

    /// Sign along the face axis: 1 for East/Up/South, -1 for the rest
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            BlockFace::East | BlockFace::Up | BlockFace::South => 1,
            BlockFace::West | BlockFace::Down | BlockFace::North => -1,
        }
    }

    #[inline]
    pub fn sign_f64(self) -> f64 {
        self.sign() as f64
    }

    /// Whether the face axis is vertical (Up/Down)
    #[inline]
    pub fn is_vertical(self) -> bool {
        matches!(self, BlockFace::Up | BlockFace::Down)
    }
}
