//! Immutable tile grid and the line-of-sight oracle shared by AI and combat.

use rand::Rng;
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::physics::Vec2;

/// Steps taken along a sight line. Both endpoints are tested, so a check
/// reads `LOS_SAMPLES + 1` cells.
pub const LOS_SAMPLES: usize = 25;

/// Material reported for cells outside the grid
pub const OUT_OF_BOUNDS_MATERIAL: u8 = 1;

pub const ARENA_SIZE: usize = 32;
pub const ARENA_SPAWN: Vec2 = Vec2::new(15.5, 15.5);

/// Rectangular grid of cell codes; 0 is open floor, anything else is a wall
/// material id. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>")]
pub struct GridMap {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl TryFrom<Vec<Vec<u8>>> for GridMap {
    type Error = EngineError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl GridMap {
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(EngineError::EmptyMap);
        }
        let height = rows.len();
        let mut cells = Vec::with_capacity(width * height);
        for (row, cols) in rows.into_iter().enumerate() {
            if cols.len() != width {
                return Err(EngineError::RaggedMap {
                    row,
                    expected: width,
                    found: cols.len(),
                });
            }
            cells.extend(cols);
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Parse a text grid: one row per line, one digit per cell, `.` for open
    /// floor. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (row, line) in text.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
            let cells = line
                .chars()
                .enumerate()
                .map(|(col, ch)| match ch {
                    '.' => Ok(0),
                    _ => ch
                        .to_digit(10)
                        .map(|d| d as u8)
                        .ok_or(EngineError::InvalidCell { row, col, ch }),
                })
                .collect::<Result<Vec<u8>>>()?;
            rows.push(cells);
        }
        Self::from_rows(rows)
    }

    /// Load a map from a JSON array of rows
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Built-in 32x32 arena: outer walls, four rooms with doors, four
    /// pillars around the spawn and a scatter of crates.
    pub fn arena() -> Self {
        const W: usize = ARENA_SIZE;
        const H: usize = ARENA_SIZE;
        let mut cells = vec![0u8; W * H];
        let mut set = |x: usize, y: usize, v: u8| cells[x + y * W] = v;

        // Outer walls
        for x in 0..W {
            set(x, 0, 1);
            set(x, H - 1, 1);
        }
        for y in 0..H {
            set(0, y, 1);
            set(W - 1, y, 1);
        }

        // Rooms: (x0, x1, y0, y1, door_x, door_y)
        let rooms = [
            (5, 10, 5, 10, 7, 10),
            (22, 28, 5, 10, 25, 10),
            (5, 10, 22, 27, 7, 22),
            (22, 28, 22, 27, 25, 22),
        ];
        for (x0, x1, y0, y1, door_x, door_y) in rooms {
            for x in x0..=x1 {
                set(x, y0, 2);
                set(x, y1, 2);
            }
            for y in y0..=y1 {
                set(x0, y, 2);
                set(x1, y, 2);
            }
            set(door_x, door_y, 0);
        }

        for (x, y) in [(13, 13), (18, 13), (13, 18), (18, 18)] {
            set(x, y, 3);
        }

        for (x, y) in [(12, 8), (20, 8), (12, 24), (20, 24), (8, 16), (24, 16)] {
            set(x, y, 4);
        }

        Self {
            width: W,
            height: H,
            cells,
        }
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Cell code at integer coordinates; outside the grid reads as a wall.
    #[inline(always)]
    pub fn tile(&self, x: i32, y: i32) -> u8 {
        if self.in_bounds(x, y) {
            self.cells[x as usize + y as usize * self.width]
        } else {
            OUT_OF_BOUNDS_MATERIAL
        }
    }

    #[inline(always)]
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.tile(x, y) > 0
    }

    /// Solidity of the cell containing a continuous position
    #[inline(always)]
    pub fn is_solid_at(&self, x: f64, y: f64) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return true;
        }
        self.is_solid(x.floor() as i32, y.floor() as i32)
    }

    /// Approximate sight test: walks the segment in [`LOS_SAMPLES`] even steps,
    /// endpoints included, and fails on the first wall or out-of-bounds sample.
    /// Thin diagonal wall corners can be skipped between samples.
    pub fn has_line_of_sight(&self, a: Vec2, b: Vec2) -> bool {
        (0..=LOS_SAMPLES).all(|i| {
            let p = a.lerp(&b, i as f64 / LOS_SAMPLES as f64);
            !self.is_solid_at(p.x, p.y)
        })
    }

    /// Center of a random open cell at least `min_distance` from `avoid`
    pub fn random_open_cell<R: Rng>(
        &self,
        rng: &mut R,
        avoid: Vec2,
        min_distance: f64,
        attempts: usize,
    ) -> Option<Vec2> {
        if self.width < 3 || self.height < 3 {
            return None;
        }
        (0..attempts).find_map(|_| {
            let x = rng.gen_range(1..self.width - 1);
            let y = rng.gen_range(1..self.height - 1);
            let pos = Vec2::new(x as f64 + 0.5, y as f64 + 0.5);
            (!self.is_solid(x as i32, y as i32) && pos.distance_to(&avoid) >= min_distance)
                .then_some(pos)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const ROOM: &str = "
        11111
        1...1
        1.2.1
        1...1
        11111
    ";

    #[test]
    fn test_parse_text_grid() {
        let map = GridMap::parse(ROOM).unwrap();
        assert_eq!(map.width(), 5);
        assert_eq!(map.height(), 5);
        assert_eq!(map.tile(2, 2), 2);
        assert_eq!(map.tile(1, 1), 0);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = GridMap::from_rows(vec![vec![1, 1, 1], vec![1, 0]]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::RaggedMap {
                row: 1,
                expected: 3,
                found: 2
            }
        ));
        assert!(matches!(GridMap::from_rows(vec![]), Err(EngineError::EmptyMap)));
        assert!(matches!(
            GridMap::parse("1x1"),
            Err(EngineError::InvalidCell { col: 1, .. })
        ));
    }

    #[test]
    fn test_from_json() {
        let map = GridMap::from_json("[[1,1,1],[1,0,1],[1,1,1]]").unwrap();
        assert!(!map.is_solid(1, 1));
        assert!(GridMap::from_json("[[1,1],[1]]").is_err());
    }

    #[test]
    fn test_out_of_bounds_is_solid() {
        let map = GridMap::parse(ROOM).unwrap();
        assert!(map.is_solid(-1, 2));
        assert!(map.is_solid(2, 99));
        assert!(map.is_solid_at(-0.5, 1.5));
        assert!(map.is_solid_at(f64::NAN, 1.5));
    }

    #[test]
    fn test_line_of_sight() {
        let map = GridMap::parse(ROOM).unwrap();
        let a = Vec2::new(1.5, 1.5);
        assert!(map.has_line_of_sight(a, a));
        assert!(map.has_line_of_sight(a, Vec2::new(3.5, 1.5)));
        // Pillar at (2,2) blocks the diagonal
        assert!(!map.has_line_of_sight(a, Vec2::new(3.5, 3.5)));
        // Leaving the grid fails closed
        assert!(!map.has_line_of_sight(a, Vec2::new(9.0, 1.5)));
        // Only the final sample lands in the pillar
        assert!(!map.has_line_of_sight(Vec2::new(1.5, 2.5), Vec2::new(2.01, 2.5)));
        assert!(map.has_line_of_sight(Vec2::new(1.5, 2.5), Vec2::new(1.99, 2.5)));
    }

    #[test]
    fn test_arena_spawn_is_open() {
        let map = GridMap::arena();
        assert_eq!(map.width(), ARENA_SIZE);
        assert!(!map.is_solid_at(ARENA_SPAWN.x, ARENA_SPAWN.y));
        assert!(map.is_solid(0, 0));
        assert!(!map.is_solid(7, 10), "room door is open");
    }

    #[test]
    fn test_random_open_cell_respects_distance() {
        let map = GridMap::arena();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let pos = map
                .random_open_cell(&mut rng, ARENA_SPAWN, 5.0, 32)
                .expect("arena has room");
            assert!(!map.is_solid_at(pos.x, pos.y));
            assert!(pos.distance_to(&ARENA_SPAWN) >= 5.0);
        }
    }
}
