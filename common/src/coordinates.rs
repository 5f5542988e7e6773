//! Hex coordinate system for the EC4X starmap.
//!
//! Axial coordinates on a pointy-top hex grid. Distances use the cube
//! identity `s = -q - r`; ring walks are used by map generation to place
//! the hub, the concentric rings, and the outer-ring homeworlds.

use serde::{Deserialize, Serialize};

/// An axial hex coordinate.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

/// The six axial directions, in clockwise order starting east.
pub const HEX_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Third cube coordinate.
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Hex distance to another coordinate.
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Distance from the map origin (the hub).
    pub fn ring(&self) -> u32 {
        self.distance_to(&HexCoord::origin())
    }

    /// The six adjacent coordinates.
    pub fn neighbors(&self) -> [HexCoord; 6] {
        let mut out = [HexCoord::origin(); 6];
        for (i, (dq, dr)) in HEX_DIRECTIONS.iter().enumerate() {
            out[i] = HexCoord::new(self.q + dq, self.r + dr);
        }
        out
    }

    /// All coordinates at exactly `radius` from the origin, walked in a
    /// fixed clockwise order so map generation is reproducible.
    pub fn ring_coords(radius: u32) -> Vec<HexCoord> {
        if radius == 0 {
            return vec![HexCoord::origin()];
        }
        let radius = radius as i32;
        let mut out = Vec::with_capacity(6 * radius as usize);
        // Start at the south-west corner and walk each of the six sides.
        let mut cursor = HexCoord::new(-radius, radius);
        for (dq, dr) in HEX_DIRECTIONS {
            for _ in 0..radius {
                out.push(cursor);
                cursor = HexCoord::new(cursor.q + dq, cursor.r + dr);
            }
        }
        out
    }

    /// All coordinates within `radius` of the origin, origin first, then
    /// ring by ring.
    pub fn spiral(radius: u32) -> Vec<HexCoord> {
        let mut out = vec![HexCoord::origin()];
        for ring in 1..=radius {
            out.extend(HexCoord::ring_coords(ring));
        }
        out
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(3, -1);
        assert_eq!(a.distance_to(&b), 3);
        assert_eq!(b.distance_to(&a), 3);
    }

    #[test]
    fn test_ring_sizes() {
        assert_eq!(HexCoord::ring_coords(1).len(), 6);
        assert_eq!(HexCoord::ring_coords(3).len(), 18);
        // 1 + 6 + 12 + 18
        assert_eq!(HexCoord::spiral(3).len(), 37);
    }

    #[test]
    fn test_neighbors_are_distance_one() {
        let c = HexCoord::new(2, -1);
        for n in c.neighbors() {
            assert_eq!(c.distance_to(&n), 1);
        }
    }
}
