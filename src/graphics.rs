use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::render::{Rect, RenderTarget, SrcRegion};
use crate::texture::Texture;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    #[inline(always)]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    #[inline(always)]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// Same colour with alpha from a 0.0 - 1.0 opacity
    #[inline(always)]
    pub fn with_opacity(self, opacity: f64) -> Self {
        Color {
            a: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const MAGENTA: Color = Color::new(255, 0, 255, 255);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
}

/// RGBA software frame buffer, row-major, 4 bytes per pixel
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    // Cached values for fast access
    pub stride: usize,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height * 4) as usize;
        let pixels = vec![0; size];
        FrameBuffer {
            width,
            height,
            pixels,
            stride: (width * 4) as usize,
        }
    }

    #[inline]
    pub fn clear(&mut self, color: Color) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, 255]);
        }
    }

    #[inline(always)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width && y < self.height {
            let idx = (y as usize * self.stride) + (x as usize * 4);
            Some(Color::new(
                self.pixels[idx],
                self.pixels[idx + 1],
                self.pixels[idx + 2],
                self.pixels[idx + 3],
            ))
        } else {
            None
        }
    }

    /// Write a pixel with source-over blending; alpha 0 leaves it untouched
    #[inline(always)]
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height || color.a == 0 {
            return;
        }
        let idx = (y as usize * self.stride) + (x as usize * 4);
        let px = &mut self.pixels[idx..idx + 4];
        if color.a == 255 {
            px.copy_from_slice(&[color.r, color.g, color.b, 255]);
            return;
        }
        let a = color.a as u32;
        let inv = 255 - a;
        px[0] = ((color.r as u32 * a + px[0] as u32 * inv) / 255) as u8;
        px[1] = ((color.g as u32 * a + px[1] as u32 * inv) / 255) as u8;
        px[2] = ((color.b as u32 * a + px[2] as u32 * inv) / 255) as u8;
        px[3] = 255;
    }

    /// Clip a rectangle to the buffer, returning pixel bounds `[x0, x1) x [y0, y1)`
    #[inline]
    fn clip(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = (rect.x + rect.w).min(self.width as i32);
        let y1 = (rect.y + rect.h).min(self.height as i32);
        (x1 > x0 && y1 > y0).then_some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

impl RenderTarget for FrameBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend_pixel(x, y, color);
            }
        }
    }

    fn draw_image_region(&mut self, texture: &Texture, src: SrcRegion, dst: Rect) {
        let Some((x0, y0, x1, y1)) = self.clip(dst) else {
            return;
        };
        let size = texture.size() as f64;
        let u_step = src.w / dst.w as f64;
        let v_step = src.h / dst.h as f64;
        for x in x0..x1 {
            let u = src.x + (x as i32 - dst.x) as f64 * u_step;
            let tx = u.clamp(0.0, size - 1.0) as usize;
            for y in y0..y1 {
                let v = src.y + ((y as i32 - dst.y) as f64 + 0.5) * v_step;
                let ty = v.clamp(0.0, size - 1.0) as usize;
                self.blend_pixel(x, y, texture.texel(tx, ty));
            }
        }
    }
}

/// Canvas-backed presenter: the engine draws into the frame buffer, which is
/// copied onto a 2d canvas once per frame.
pub struct Graphics {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    buffer: FrameBuffer,
}

impl Graphics {
    pub fn new(canvas_id: &str, width: u32, height: u32) -> Result<Graphics, JsValue> {
        let document = web_sys::window()
            .ok_or("No window")?
            .document()
            .ok_or("No document")?;

        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or("Canvas not found")?
            .dyn_into::<HtmlCanvasElement>()?;

        canvas.set_width(width);
        canvas.set_height(height);

        let context = canvas
            .get_context("2d")?
            .ok_or("Failed to get 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()?;

        Ok(Graphics {
            canvas,
            context,
            buffer: FrameBuffer::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    pub fn present(&self) -> Result<(), JsValue> {
        let expected_size = (self.buffer.width * self.buffer.height * 4) as usize;
        if self.buffer.pixels.len() != expected_size {
            return Err(JsValue::from_str("Buffer size mismatch"));
        }
        let image_data = ImageData::new_with_u8_clamped_array_and_sh(
            wasm_bindgen::Clamped(&self.buffer.pixels),
            self.buffer.width,
            self.buffer.height,
        )?;
        self.context.put_image_data(&image_data, 0.0, 0.0)?;
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), JsValue> {
        if width == self.buffer.width && height == self.buffer.height {
            return Ok(());
        }
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.buffer = FrameBuffer::new(width, height);
        Ok(())
    }
}
