//! Block and direction types.

use glam::{IVec3, Vec4};

/// The type tag of a single block.
///
/// Persistence stores the raw discriminant, so variants keep their values.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Empty space
    #[default]
    Empty = 0,
    Grass = 1,
    Dirt = 2,
    Stone = 3,
    Water = 4,
    Lava = 5,
    Bedrock = 6,
    Ice = 7,
    Snow = 8,
    SnowDirt = 9,
}

impl BlockType {
    /// Number of distinct block types.
    pub const COUNT: usize = 10;

    /// Recover a block type from its stored discriminant.
    #[inline]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Empty),
            1 => Some(Self::Grass),
            2 => Some(Self::Dirt),
            3 => Some(Self::Stone),
            4 => Some(Self::Water),
            5 => Some(Self::Lava),
            6 => Some(Self::Bedrock),
            7 => Some(Self::Ice),
            8 => Some(Self::Snow),
            9 => Some(Self::SnowDirt),
            _ => None,
        }
    }

    /// The stored discriminant.
    #[inline]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Light does not pass through this block.
    #[inline]
    pub const fn is_opaque(self) -> bool {
        !matches!(self, Self::Empty | Self::Water | Self::Ice)
    }

    /// Opaque for face-culling purposes. Lava is excluded so faces that
    /// border it are still emitted.
    #[inline]
    pub const fn culls_faces(self) -> bool {
        !matches!(self, Self::Empty | Self::Water | Self::Ice | Self::Lava)
    }

    /// The shader scrolls this block's UVs.
    #[inline]
    pub const fn is_animated(self) -> bool {
        matches!(self, Self::Water | Self::Lava)
    }

    /// Liquids never block movement.
    #[inline]
    pub const fn is_liquid(self) -> bool {
        matches!(self, Self::Water | Self::Lava)
    }
}

/// The six cardinal directions in 3D space.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    XPos = 0,
    XNeg = 1,
    YPos = 2,
    YNeg = 3,
    ZPos = 4,
    ZNeg = 5,
}

impl Direction {
    /// All six directions, in face-emission order.
    pub const ALL: [Self; 6] = [
        Self::XPos,
        Self::XNeg,
        Self::YPos,
        Self::YNeg,
        Self::ZPos,
        Self::ZNeg,
    ];

    /// The four directions that have chunk neighbors.
    pub const HORIZONTAL: [Self; 4] = [Self::XPos, Self::XNeg, Self::ZPos, Self::ZNeg];

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::XPos => Self::XNeg,
            Self::XNeg => Self::XPos,
            Self::YPos => Self::YNeg,
            Self::YNeg => Self::YPos,
            Self::ZPos => Self::ZNeg,
            Self::ZNeg => Self::ZPos,
        }
    }

    /// Index into the four-entry neighbor table; `None` for vertical.
    #[inline]
    pub const fn horizontal_index(self) -> Option<usize> {
        match self {
            Self::XPos => Some(0),
            Self::XNeg => Some(1),
            Self::ZPos => Some(2),
            Self::ZNeg => Some(3),
            Self::YPos | Self::YNeg => None,
        }
    }

    /// Offset of the neighboring cell.
    #[inline]
    pub const fn offset(self) -> IVec3 {
        match self {
            Self::XPos => IVec3::new(1, 0, 0),
            Self::XNeg => IVec3::new(-1, 0, 0),
            Self::YPos => IVec3::new(0, 1, 0),
            Self::YNeg => IVec3::new(0, -1, 0),
            Self::ZPos => IVec3::new(0, 0, 1),
            Self::ZNeg => IVec3::new(0, 0, -1),
        }
    }

    /// Outward unit normal of the face pointing this way.
    #[inline]
    pub fn normal(self) -> Vec4 {
        let o = self.offset();
        Vec4::new(o.x as f32, o.y as f32, o.z as f32, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_predicates() {
        assert!(BlockType::Stone.is_opaque());
        assert!(BlockType::Lava.is_opaque());
        assert!(!BlockType::Empty.is_opaque());
        assert!(!BlockType::Water.is_opaque());
        assert!(!BlockType::Ice.is_opaque());

        // Lava is opaque but does not cull its neighbors' faces.
        assert!(!BlockType::Lava.culls_faces());
        assert!(BlockType::Stone.culls_faces());
        assert!(!BlockType::Water.culls_faces());
    }

    #[test]
    fn animated_blocks_are_liquids() {
        for raw in 0..BlockType::COUNT as u8 {
            let block = BlockType::from_raw(raw).unwrap();
            assert_eq!(block.is_animated(), block.is_liquid());
        }
    }

    #[test]
    fn raw_roundtrip() {
        for raw in 0..BlockType::COUNT as u8 {
            let block = BlockType::from_raw(raw).unwrap();
            assert_eq!(block.raw(), raw);
        }
        assert_eq!(BlockType::from_raw(10), None);
        assert_eq!(BlockType::from_raw(255), None);
    }

    #[test]
    fn opposite_is_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn horizontal_indices_are_distinct() {
        let indices: Vec<usize> = Direction::HORIZONTAL
            .iter()
            .filter_map(|d| d.horizontal_index())
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(Direction::YPos.horizontal_index(), None);
        assert_eq!(Direction::YNeg.horizontal_index(), None);
    }
}
