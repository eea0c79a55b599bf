//! Texture table consumed by the renderer, plus the procedural set the
//! browser build ships with.

use std::collections::HashMap;

use crate::graphics::Color;

pub const WALL_TEX_SIZE: usize = 64;
pub const SPRITE_TEX_SIZE: usize = 32;

// Wall materials share ids with map cell codes
pub const WALL_BRICK: u32 = 1;
pub const WALL_STONE: u32 = 2;
pub const WALL_MARBLE: u32 = 3;
pub const WALL_CRATE: u32 = 4;
pub const WALL_METAL: u32 = 5;

pub const ENEMY_BASIC: u32 = 100;
pub const ENEMY_ELITE: u32 = 101;
pub const ITEM_HEALTH: u32 = 110;
pub const ITEM_AMMO: u32 = 111;
pub const PARTICLE_BLOOD: u32 = 120;
pub const PARTICLE_SPARK: u32 = 121;

/// Square RGBA image
#[derive(Clone, Debug)]
pub struct Texture {
    size: usize,
    pixels: Vec<u8>,
}

impl Texture {
    /// Wrap `size * size` RGBA pixels; `None` when the buffer does not match
    pub fn from_rgba(size: usize, pixels: Vec<u8>) -> Option<Self> {
        (size > 0 && pixels.len() == size * size * 4).then_some(Self { size, pixels })
    }

    fn generate<F>(size: usize, mut texel: F) -> Self
    where
        F: FnMut(usize, usize) -> Color,
    {
        let mut pixels = Vec::with_capacity(size * size * 4);
        for y in 0..size {
            for x in 0..size {
                let c = texel(x, y);
                pixels.extend_from_slice(&[c.r, c.g, c.b, c.a]);
            }
        }
        Self { size, pixels }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Texel at integer coordinates, clamped to the edge
    #[inline(always)]
    pub fn texel(&self, x: usize, y: usize) -> Color {
        let x = x.min(self.size - 1);
        let y = y.min(self.size - 1);
        let idx = (y * self.size + x) * 4;
        Color::new(
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        )
    }
}

/// Id to texture mapping. Lookups for unknown ids return `None` and the
/// renderer falls back to [`fallback_color`].
#[derive(Clone, Debug, Default)]
pub struct TextureTable {
    textures: HashMap<u32, Texture>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, texture: Texture) {
        self.textures.insert(id, texture);
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&Texture> {
        self.textures.get(&id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Math-generated wall, enemy, item and particle textures
    pub fn procedural() -> Self {
        let mut table = Self::new();
        let n = WALL_TEX_SIZE;

        table.insert(
            WALL_BRICK,
            Texture::generate(n, |x, y| {
                let row_offset = if (y / 16) % 2 == 0 { 0 } else { 8 };
                let mortar = y % 16 == 15 || (x + row_offset) % 16 == 15;
                if mortar {
                    Color::rgb(180, 175, 170)
                } else {
                    Color::rgb(150 + ((x + row_offset) % 16) as u8, 40, 40)
                }
            }),
        );
        table.insert(
            WALL_STONE,
            Texture::generate(n, |x, y| {
                let shade = 120 + ((x ^ y) & 15) as u8;
                Color::rgb(shade, shade - 10, shade - 20)
            }),
        );
        table.insert(
            WALL_MARBLE,
            Texture::generate(n, |x, y| {
                let swirl = ((x as f32 * 0.2).sin() + (y as f32 * 0.3).cos()) * 0.5 + 0.5;
                let shade = (60.0 + 170.0 * swirl) as u8;
                Color::rgb(shade, shade, shade.saturating_sub(10))
            }),
        );
        table.insert(
            WALL_CRATE,
            Texture::generate(n, |x, y| {
                let grain =
                    ((x as f32 * 0.3).sin() * 10.0) as i32 + ((y as f32 * 0.15).cos() * 8.0) as i32;
                let base = (100 + grain.clamp(-20, 30)) as u8;
                let frame = x < 3 || y < 3 || x >= n - 3 || y >= n - 3 || x == y || x + y == n - 1;
                if frame {
                    Color::rgb(base / 2 + 20, base / 2, base / 3)
                } else {
                    Color::rgb(base + 30, base + 10, base)
                }
            }),
        );
        table.insert(
            WALL_METAL,
            Texture::generate(n, |x, _y| {
                let base = if (x / 8) % 2 == 0 { 160 } else { 110 };
                Color::rgb(base, base, base + 20)
            }),
        );

        let s = SPRITE_TEX_SIZE;
        table.insert(
            ENEMY_BASIC,
            Texture::generate(s, |x, y| demon_texel(x, y, false)),
        );
        table.insert(
            ENEMY_ELITE,
            Texture::generate(s, |x, y| demon_texel(x, y, true)),
        );
        table.insert(
            ITEM_HEALTH,
            Texture::generate(s, |x, y| {
                let inside = (4..s - 4).contains(&x) && (8..s - 2).contains(&y);
                let cross = (14..18).contains(&x) && (12..s - 6).contains(&y)
                    || (8..24).contains(&x) && (18..22).contains(&y);
                match (inside, cross) {
                    (true, true) => Color::rgb(220, 20, 20),
                    (true, false) => Color::rgb(235, 235, 235),
                    _ => Color::TRANSPARENT,
                }
            }),
        );
        table.insert(
            ITEM_AMMO,
            Texture::generate(s, |x, y| {
                let inside = (6..s - 6).contains(&x) && (12..s - 2).contains(&y);
                if !inside {
                    Color::TRANSPARENT
                } else if y < 16 && x % 4 != 0 {
                    Color::rgb(200, 160, 60)
                } else {
                    Color::rgb(80, 90, 40)
                }
            }),
        );
        table.insert(PARTICLE_BLOOD, disc(8, Color::rgb(170, 0, 0)));
        table.insert(PARTICLE_SPARK, disc(8, Color::rgb(255, 220, 80)));

        table
    }
}

/// Flat colour drawn when a texture id is missing
pub fn fallback_color(id: u32) -> Color {
    match id {
        WALL_BRICK => Color::rgb(150, 40, 40),
        WALL_STONE => Color::rgb(120, 110, 100),
        WALL_MARBLE => Color::rgb(190, 190, 180),
        WALL_CRATE => Color::rgb(130, 100, 60),
        WALL_METAL => Color::rgb(110, 120, 135),
        ENEMY_BASIC => Color::rgb(200, 40, 30),
        ENEMY_ELITE => Color::rgb(150, 60, 200),
        ITEM_HEALTH => Color::rgb(230, 230, 230),
        ITEM_AMMO => Color::rgb(200, 160, 60),
        PARTICLE_BLOOD => Color::rgb(170, 0, 0),
        PARTICLE_SPARK => Color::rgb(255, 220, 80),
        _ => Color::MAGENTA,
    }
}

fn demon_texel(x: usize, y: usize, elite: bool) -> Color {
    let s = SPRITE_TEX_SIZE as f32;
    let fx = (x as f32 + 0.5) / s - 0.5;
    let fy = (y as f32 + 0.5) / s;

    // Head circle on top of an elliptical body
    let head = fx * fx + (fy - 0.17) * (fy - 0.17) < 0.018;
    let body = (fx * fx) / 0.09 + ((fy - 0.62) * (fy - 0.62)) / 0.14 < 1.0;
    if !head && !body {
        return Color::TRANSPARENT;
    }
    let eye = head && (fy - 0.15).abs() < 0.03 && (fx.abs() - 0.05).abs() < 0.025;
    if eye {
        return Color::rgb(255, 230, 0);
    }
    if elite {
        Color::rgb(150 + ((x ^ y) & 15) as u8, 40 + (y as u8 / 3), 200 - (x as u8 / 2))
    } else {
        Color::rgb(200 - (y as u8 / 2), 40 + (x as u8 / 4), 30)
    }
}

fn disc(size: usize, color: Color) -> Texture {
    let r = size as f32 / 2.0;
    Texture::generate(size, |x, y| {
        let dx = x as f32 + 0.5 - r;
        let dy = y as f32 + 0.5 - r;
        if dx * dx + dy * dy <= r * r {
            color
        } else {
            Color::TRANSPARENT
        }
    })
}
