//! Grid geometry: cardinal directions and integer vector helpers
//!
//! Positions are `IVec2` cells with y growing downward, pressure is a `Vec2`.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// One of the four cardinal grid directions.
///
/// The discriminant doubles as a dense array index, in clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    /// All directions in index order
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    #[inline]
    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// 90° clockwise
    #[inline]
    pub fn right(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// 90° counter-clockwise
    #[inline]
    pub fn left(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// The three other directions: right, opposite, left
    pub fn others(self) -> [Direction; 3] {
        [self.right(), self.opposite(), self.left()]
    }

    /// Unit grid step
    pub fn vector(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, -1),
            Direction::East => IVec2::new(1, 0),
            Direction::South => IVec2::new(0, 1),
            Direction::West => IVec2::new(-1, 0),
        }
    }

    /// Unit step as a float vector (used to damp pressure)
    pub fn unit(self) -> Vec2 {
        self.vector().as_vec2()
    }

    /// Cardinal direction of the strongest component of `v`.
    ///
    /// `|x|` is compared first and wins ties. A zero vector maps to east.
    pub fn dominant(v: Vec2) -> Self {
        if v.x.abs() >= v.y.abs() {
            if v.x >= 0.0 {
                Direction::East
            } else {
                Direction::West
            }
        } else if v.y > 0.0 {
            Direction::South
        } else {
            Direction::North
        }
    }
}

/// Grid helpers glam does not provide.
pub trait GridVec {
    /// Manhattan (taxicab) distance
    fn manhattan_to(self, other: IVec2) -> i32;
    /// Bijective packing into a single map key (high half x, low half y)
    fn pack(self) -> u64;
}

impl GridVec for IVec2 {
    #[inline]
    fn manhattan_to(self, other: IVec2) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    #[inline]
    fn pack(self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.y as u32 as u64)
    }
}

/// Inverse of [`GridVec::pack`]
#[inline]
pub fn unpack(key: u64) -> IVec2 {
    IVec2::new((key >> 32) as u32 as i32, key as u32 as i32)
}
