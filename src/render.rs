//! Column raycaster.
//!
//! One DDA ray per screen column fills a [`DepthBuffer`] and draws a textured
//! wall strip; point sprites are then projected back-to-front and clipped per
//! column against that buffer. The renderer only reads simulation state.

use crate::config::RenderConfig;
use crate::game::World;
use crate::graphics::Color;
use crate::map::GridMap;
use crate::physics::{raycast_dda, Side, Vec2};
use crate::texture::{fallback_color, Texture, TextureTable};

const CEILING: Color = Color::rgb(40, 44, 60);
const FLOOR: Color = Color::rgb(48, 40, 32);

/// Camera bases whose determinant is below this cannot be inverted
const MIN_DET: f64 = 1e-9;

/// Destination rectangle in screen pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// Source region in texel units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SrcRegion {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl SrcRegion {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
}

/// Drawable surface the renderer issues its calls against
pub trait RenderTarget {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Fill with `color`, blended by its alpha
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Scale `src` of `texture` into `dst`; fully transparent texels are skipped
    fn draw_image_region(&mut self, texture: &Texture, src: SrcRegion, dst: Rect);
}

/// Viewpoint derived from the player for one frame
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub pos: Vec2,
    pub dir: Vec2,
    pub plane: Vec2,
    pub pitch: f64,
    pub z: f64,
    pub width: u32,
    pub height: u32,
}

impl Camera {
    pub fn new(world: &World, width: u32, height: u32) -> Self {
        let p = &world.player;
        Self {
            pos: p.pos,
            dir: p.dir,
            plane: p.plane,
            pitch: p.pitch,
            z: p.z,
            width,
            height,
        }
    }

    /// Screen row of the horizon after pitch
    #[inline]
    pub fn horizon(&self) -> f64 {
        self.height as f64 / 2.0 + self.pitch
    }

    /// Ray direction through the centre of `column`
    #[inline]
    pub fn ray_dir(&self, column: u32) -> Vec2 {
        let camera_x = 2.0 * (column as f64 + 0.5) / self.width as f64 - 1.0;
        self.dir.add(&self.plane.scale(camera_x))
    }

    /// World point to camera space `(lateral, depth)` through the inverse
    /// of the [plane, dir] basis. `None` for a degenerate basis.
    pub fn to_camera_space(&self, point: Vec2) -> Option<(f64, f64)> {
        let det = self.plane.x * self.dir.y - self.dir.x * self.plane.y;
        if det.abs() < MIN_DET {
            return None;
        }
        let inv_det = 1.0 / det;
        let rel = point.sub(&self.pos);
        let lateral = inv_det * (self.dir.y * rel.x - self.dir.x * rel.y);
        let depth = inv_det * (-self.plane.y * rel.x + self.plane.x * rel.y);
        Some((lateral, depth))
    }

    /// Screen column of a camera-space point
    #[inline]
    pub fn screen_x(&self, lateral: f64, depth: f64) -> f64 {
        self.width as f64 / 2.0 * (1.0 + lateral / depth)
    }

    /// Unclipped `(top, bottom)` rows of a one-unit-tall wall at `depth`,
    /// shifted by pitch and by the eye height above the floor
    pub fn wall_span(&self, depth: f64) -> (f64, f64) {
        let h = self.height as f64;
        let line = h / depth;
        let center = self.horizon() + self.z * h / depth;
        (center - line / 2.0, center + line / 2.0)
    }

    /// Unclipped `(top, bottom)` rows of a sprite of relative `scale`
    pub fn sprite_span(&self, depth: f64, scale: f64, anchor: Anchor) -> (f64, f64) {
        let (wall_top, wall_bottom) = self.wall_span(depth);
        let size = (wall_bottom - wall_top) * scale;
        match anchor {
            Anchor::Center => {
                let mid = (wall_top + wall_bottom) / 2.0;
                (mid - size / 2.0, mid + size / 2.0)
            }
            Anchor::Floor => (wall_bottom - size, wall_bottom),
        }
    }
}

/// Vertical placement of a sprite relative to a wall slice at the same depth
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Center,
    Floor,
}

/// Perpendicular wall distance per screen column, rebuilt every frame
#[derive(Clone, Debug)]
pub struct DepthBuffer {
    depths: Vec<f64>,
}

impl DepthBuffer {
    pub fn new(width: u32) -> Self {
        Self {
            depths: vec![f64::INFINITY; width as usize],
        }
    }

    #[inline]
    pub fn get(&self, column: u32) -> f64 {
        self.depths
            .get(column as usize)
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }

    #[inline]
    pub fn set(&mut self, column: u32, depth: f64) {
        if let Some(slot) = self.depths.get_mut(column as usize) {
            *slot = depth;
        }
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

/// One wall column produced by the DDA
#[derive(Clone, Copy, Debug)]
pub struct WallSlice {
    pub distance: f64,
    pub side: Side,
    pub material: u8,
    /// Horizontal texture coordinate 0.0 - 1.0, mirrored to keep faces
    /// consistently oriented
    pub tex_u: f64,
}

/// Renderable point entity
#[derive(Clone, Copy, Debug)]
pub struct Sprite {
    pub pos: Vec2,
    pub texture: u32,
    pub scale: f64,
    pub anchor: Anchor,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub wall_columns: u32,
    pub sprites_visible: u32,
    pub sprite_columns: u32,
}

pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Draw a full frame of `world` onto `target`
    pub fn render<T: RenderTarget>(
        &self,
        world: &World,
        textures: &TextureTable,
        target: &mut T,
    ) -> RenderStats {
        let (w, h) = (target.width(), target.height());
        let mut stats = RenderStats::default();
        if w == 0 || h == 0 {
            return stats;
        }

        let camera = Camera::new(world, w, h);
        let horizon = camera.horizon().clamp(0.0, h as f64) as i32;
        target.fill_rect(Rect::new(0, 0, w as i32, horizon), CEILING);
        target.fill_rect(Rect::new(0, horizon, w as i32, h as i32 - horizon), FLOOR);

        let mut depth = DepthBuffer::new(w);
        stats.wall_columns = self.draw_walls(&world.map, &camera, textures, &mut depth, target);

        let sprites = collect_sprites(world);
        let (visible, columns) = self.draw_sprites(&camera, &sprites, textures, &depth, target);
        stats.sprites_visible = visible;
        stats.sprite_columns = columns;
        stats
    }

    /// Cast the ray for one column
    pub fn cast_column(&self, map: &GridMap, camera: &Camera, column: u32) -> Option<WallSlice> {
        let ray = camera.ray_dir(column);
        let hit = raycast_dda(camera.pos, ray, self.config.max_ray_distance, |x, y| {
            map.is_solid(x, y)
        })?;
        if !hit.distance.is_finite() || hit.distance <= 0.0 {
            return None;
        }
        let mirrored = match hit.side {
            Side::X => ray.x > 0.0,
            Side::Y => ray.y < 0.0,
        };
        Some(WallSlice {
            distance: hit.distance,
            side: hit.side,
            material: map.tile(hit.map_x, hit.map_y),
            tex_u: if mirrored { 1.0 - hit.wall_x } else { hit.wall_x },
        })
    }

    /// Wall pass. Fills `depth` and returns the number of columns drawn.
    pub fn draw_walls<T: RenderTarget>(
        &self,
        map: &GridMap,
        camera: &Camera,
        textures: &TextureTable,
        depth: &mut DepthBuffer,
        target: &mut T,
    ) -> u32 {
        let h = camera.height as f64;
        let mut drawn = 0;

        for x in 0..camera.width {
            let Some(slice) = self.cast_column(map, camera, x) else {
                continue;
            };
            depth.set(x, slice.distance);

            let (top, bottom) = camera.wall_span(slice.distance);
            let clip_top = top.max(0.0);
            let clip_bottom = bottom.min(h);
            if clip_bottom <= clip_top {
                continue;
            }
            let dst = Rect::new(
                x as i32,
                clip_top.floor() as i32,
                1,
                (clip_bottom.ceil() - clip_top.floor()) as i32,
            );

            match textures.get(slice.material as u32) {
                Some(tex) => {
                    let size = tex.size() as f64;
                    let line = bottom - top;
                    let tex_x = (slice.tex_u * size).floor().min(size - 1.0);
                    let src = SrcRegion::new(
                        tex_x,
                        (clip_top.floor() - top) / line * size,
                        1.0,
                        dst.h as f64 / line * size,
                    );
                    target.draw_image_region(tex, src, dst);
                }
                None => target.fill_rect(dst, fallback_color(slice.material as u32)),
            }

            let shade = self.overlay_alpha(slice.distance, slice.side);
            if shade > 0.0 {
                target.fill_rect(dst, Color::BLACK.with_opacity(shade));
            }
            drawn += 1;
        }
        drawn
    }

    /// Combined darkening for fog and Y-side shading, 0.0 - 1.0
    pub fn overlay_alpha(&self, distance: f64, side: Side) -> f64 {
        let fog = (distance / self.config.fog_distance).clamp(0.0, 1.0) * self.config.max_fog_alpha;
        let side = match side {
            Side::X => 0.0,
            Side::Y => self.config.side_shade_alpha,
        };
        1.0 - (1.0 - fog) * (1.0 - side)
    }

    /// Sprite pass, painter's order. Returns `(sprites with any column
    /// drawn, columns drawn)`.
    pub fn draw_sprites<T: RenderTarget>(
        &self,
        camera: &Camera,
        sprites: &[Sprite],
        textures: &TextureTable,
        depth: &DepthBuffer,
        target: &mut T,
    ) -> (u32, u32) {
        let mut order: Vec<(f64, &Sprite)> = sprites
            .iter()
            .map(|s| (s.pos.distance_squared_to(&camera.pos), s))
            .collect();
        order.sort_by(|a, b| b.0.total_cmp(&a.0));

        let (w, h) = (camera.width as f64, camera.height as f64);
        let mut visible = 0;
        let mut columns = 0;

        for (_, sprite) in order {
            let Some((lateral, sprite_depth)) = camera.to_camera_space(sprite.pos) else {
                continue;
            };
            if sprite_depth <= 0.0 || !sprite_depth.is_finite() {
                continue;
            }

            let (top, bottom) = camera.sprite_span(sprite_depth, sprite.scale, sprite.anchor);
            let size = bottom - top;
            let center_x = camera.screen_x(lateral, sprite_depth);
            let left = center_x - size / 2.0;
            let clip_top = top.max(0.0);
            let clip_bottom = bottom.min(h);
            if clip_bottom <= clip_top || size <= 0.0 {
                continue;
            }

            let first = left.max(0.0).floor() as u32;
            let last = (left + size).min(w).ceil() as u32;
            let texture = textures.get(sprite.texture);
            let dst_y = clip_top.floor() as i32;
            let dst_h = (clip_bottom.ceil() - clip_top.floor()) as i32;
            let mut drew_any = false;

            for x in first..last.min(camera.width) {
                let u = (x as f64 + 0.5 - left) / size;
                if !(0.0..1.0).contains(&u) || sprite_depth >= depth.get(x) {
                    continue;
                }
                let dst = Rect::new(x as i32, dst_y, 1, dst_h);
                match texture {
                    Some(tex) => {
                        let tex_size = tex.size() as f64;
                        let src = SrcRegion::new(
                            (u * tex_size).floor(),
                            (clip_top.floor() - top) / size * tex_size,
                            1.0,
                            dst_h as f64 / size * tex_size,
                        );
                        target.draw_image_region(tex, src, dst);
                    }
                    None => target.fill_rect(dst, fallback_color(sprite.texture)),
                }
                columns += 1;
                drew_any = true;
            }
            if drew_any {
                visible += 1;
            }
        }
        (visible, columns)
    }
}

/// Enemies, items and particles as sprites
pub fn collect_sprites(world: &World) -> Vec<Sprite> {
    let enemies = world.enemies.iter().filter(|e| e.is_alive()).map(|e| Sprite {
        pos: e.pos,
        texture: e.texture,
        scale: 1.0,
        anchor: Anchor::Center,
    });
    let items = world.items.iter().map(|i| Sprite {
        pos: i.pos,
        texture: i.texture(),
        scale: 0.4,
        anchor: Anchor::Floor,
    });
    let particles = world.particles.iter().map(|p| Sprite {
        pos: p.pos,
        texture: p.texture,
        scale: 0.12 * p.life.clamp(0.2, 1.0),
        anchor: Anchor::Center,
    });
    enemies.chain(items).chain(particles).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::texture;

    /// Records calls instead of drawing
    #[derive(Default)]
    struct RecordingTarget {
        width: u32,
        height: u32,
        fills: Vec<(Rect, Color)>,
        images: Vec<(SrcRegion, Rect)>,
    }

    impl RecordingTarget {
        fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ..Self::default()
            }
        }
    }

    impl RenderTarget for RecordingTarget {
        fn width(&self) -> u32 {
            self.width
        }
        fn height(&self) -> u32 {
            self.height
        }
        fn fill_rect(&mut self, rect: Rect, color: Color) {
            self.fills.push((rect, color));
        }
        fn draw_image_region(&mut self, _texture: &Texture, src: SrcRegion, dst: Rect) {
            self.images.push((src, dst));
        }
    }

    fn camera_east(pos: Vec2, width: u32, height: u32) -> Camera {
        Camera {
            pos,
            dir: Vec2::new(1.0, 0.0),
            plane: Vec2::new(0.0, -0.66),
            pitch: 0.0,
            z: 0.0,
            width,
            height,
        }
    }

    fn room(width: usize, height: usize) -> GridMap {
        let rows = (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| {
                        let edge = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                        u8::from(edge)
                    })
                    .collect()
            })
            .collect();
        GridMap::from_rows(rows).unwrap()
    }

    fn corridor() -> GridMap {
        GridMap::parse(
            "
            1111111111
            1........1
            1........1
            1........1
            1111111111
            ",
        )
        .unwrap()
    }

    #[test]
    fn test_center_column_depth_is_perpendicular() {
        let renderer = Renderer::new(RenderConfig::default());
        let camera = camera_east(Vec2::new(1.5, 2.5), 65, 100);
        let slice = renderer.cast_column(&corridor(), &camera, 32).unwrap();
        assert!((slice.distance - 7.5).abs() < 1e-9);
        assert_eq!(slice.side, Side::X);
        assert_eq!(slice.material, 1);
    }

    #[test]
    fn test_no_fisheye_on_flat_wall() {
        let renderer = Renderer::new(RenderConfig::default());
        let camera = camera_east(Vec2::new(1.5, 10.5), 64, 100);
        let map = room(10, 21);
        // Every column hits the far wall at x = 9 with the same perpendicular distance
        for col in 0..64 {
            let slice = renderer.cast_column(&map, &camera, col).unwrap();
            assert_eq!(slice.side, Side::X);
            assert!((slice.distance - 7.5).abs() < 1e-9, "column {col}");
        }
    }

    #[test]
    fn test_wall_pass_fills_depth_and_clips_span() {
        let renderer = Renderer::new(RenderConfig::default());
        let camera = camera_east(Vec2::new(8.5, 2.5), 16, 100);
        let mut depth = DepthBuffer::new(16);
        let mut target = RecordingTarget::new(16, 100);
        let textures = TextureTable::procedural();
        let drawn = renderer.draw_walls(&corridor(), &camera, &textures, &mut depth, &mut target);
        assert_eq!(drawn, 16);
        for x in 0..16 {
            assert!(depth.get(x).is_finite() && depth.get(x) > 0.0);
        }
        // Wall at 0.5 units projects taller than the screen and is clipped
        for (src, dst) in &target.images {
            assert!(dst.y >= 0 && dst.y + dst.h <= 100);
            assert!(src.y > 0.0);
            assert!(src.h < texture::WALL_TEX_SIZE as f64);
        }
    }

    #[test]
    fn test_missing_texture_falls_back_to_flat_color() {
        let renderer = Renderer::new(RenderConfig::default());
        let camera = camera_east(Vec2::new(1.5, 2.5), 8, 60);
        let mut depth = DepthBuffer::new(8);
        let mut target = RecordingTarget::new(8, 60);
        let drawn = renderer.draw_walls(
            &corridor(),
            &camera,
            &TextureTable::new(),
            &mut depth,
            &mut target,
        );
        assert_eq!(drawn, 8);
        assert!(target.images.is_empty());
        assert!(target
            .fills
            .iter()
            .any(|(_, c)| *c == fallback_color(texture::WALL_BRICK)));
    }

    #[test]
    fn test_overlay_darkens_y_side_and_distance() {
        let renderer = Renderer::new(RenderConfig::default());
        let near_x = renderer.overlay_alpha(1.0, Side::X);
        let near_y = renderer.overlay_alpha(1.0, Side::Y);
        let far_x = renderer.overlay_alpha(100.0, Side::X);
        assert!(near_y > near_x);
        assert!(far_x > near_x);
        assert!((far_x - RenderConfig::default().max_fog_alpha).abs() < 1e-9);
        assert_eq!(renderer.overlay_alpha(0.0, Side::X), 0.0);
    }

    #[test]
    fn test_sprite_occluded_by_nearer_wall() {
        let renderer = Renderer::new(RenderConfig::default());
        let camera = camera_east(Vec2::new(1.5, 2.5), 64, 100);
        let sprite = Sprite {
            pos: Vec2::new(5.5, 2.5),
            texture: texture::ENEMY_BASIC,
            scale: 1.0,
            anchor: Anchor::Center,
        };
        let textures = TextureTable::procedural();

        // Wall at depth 2 everywhere: sprite at depth 4 is hidden
        let mut depth = DepthBuffer::new(64);
        for x in 0..64 {
            depth.set(x, 2.0);
        }
        let mut target = RecordingTarget::new(64, 100);
        let (visible, columns) =
            renderer.draw_sprites(&camera, &[sprite], &textures, &depth, &mut target);
        assert_eq!((visible, columns), (0, 0));
        assert!(target.images.is_empty());

        // Open the left half of the screen only
        for x in 0..32 {
            depth.set(x, 10.0);
        }
        let mut target = RecordingTarget::new(64, 100);
        let (visible, columns) =
            renderer.draw_sprites(&camera, &[sprite], &textures, &depth, &mut target);
        assert_eq!(visible, 1);
        assert!(columns > 0);
        assert!(target.images.iter().all(|(_, dst)| dst.x < 32));
    }

    #[test]
    fn test_sprite_behind_camera_discarded() {
        let renderer = Renderer::new(RenderConfig::default());
        let camera = camera_east(Vec2::new(5.5, 2.5), 64, 100);
        let sprite = Sprite {
            pos: Vec2::new(3.5, 2.5),
            texture: texture::ENEMY_BASIC,
            scale: 1.0,
            anchor: Anchor::Center,
        };
        let depth = DepthBuffer::new(64);
        let mut target = RecordingTarget::new(64, 100);
        let (visible, _) = renderer.draw_sprites(
            &camera,
            &[sprite],
            &TextureTable::procedural(),
            &depth,
            &mut target,
        );
        assert_eq!(visible, 0);
    }

    #[test]
    fn test_sprites_drawn_back_to_front() {
        let renderer = Renderer::new(RenderConfig::default());
        let camera = camera_east(Vec2::new(1.5, 2.5), 64, 100);
        let near = Sprite {
            pos: Vec2::new(3.5, 2.5),
            texture: 7000,
            scale: 1.0,
            anchor: Anchor::Center,
        };
        let far = Sprite {
            pos: Vec2::new(6.5, 2.5),
            texture: 7001,
            scale: 1.0,
            anchor: Anchor::Center,
        };
        let depth = DepthBuffer::new(64);
        let mut target = RecordingTarget::new(64, 100);
        renderer.draw_sprites(&camera, &[near, far], &TextureTable::new(), &depth, &mut target);
        // Both fall back to the same flat colour; the far one is narrower and drawn first
        let first_width = target.fills.iter().take_while(|(r, _)| r.h < 30).count();
        assert!(first_width > 0);
        assert!(target.fills.last().unwrap().0.h > 30);
    }

    #[test]
    fn test_degenerate_camera_projects_nothing() {
        let camera = Camera {
            plane: Vec2::zero(),
            ..camera_east(Vec2::new(1.5, 2.5), 64, 100)
        };
        assert!(camera.to_camera_space(Vec2::new(3.0, 2.5)).is_none());
    }

    #[test]
    fn test_pitch_and_height_shift_walls() {
        let base = camera_east(Vec2::new(1.5, 2.5), 64, 100);
        let (top, bottom) = base.wall_span(2.0);
        assert!((top - 25.0).abs() < 1e-9 && (bottom - 75.0).abs() < 1e-9);

        let looking_up = Camera { pitch: 10.0, ..base };
        assert!((looking_up.wall_span(2.0).0 - 35.0).abs() < 1e-9);

        let jumping = Camera { z: 0.5, ..base };
        assert!(jumping.wall_span(2.0).0 > top);
    }

    #[test]
    fn test_full_frame_on_framebuffer() {
        use crate::game::Game;
        use crate::graphics::FrameBuffer;

        let game = Game::new(
            corridor(),
            Vec2::new(1.5, 2.5),
            EngineConfig::default(),
            Default::default(),
            1,
        );
        let renderer = Renderer::new(RenderConfig::default());
        let mut fb = FrameBuffer::new(80, 60);
        let stats = renderer.render(game.world(), &TextureTable::procedural(), &mut fb);
        assert_eq!(stats.wall_columns, 80);
    }
}
