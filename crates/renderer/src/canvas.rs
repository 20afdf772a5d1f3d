//! Drawing surface for one quicklook.
//!
//! A `Canvas` is created by a single render call and consumed when the image
//! is encoded, so no drawing state outlives a job or is shared between
//! workers.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use radar_common::QuicklookLayout;
use rusttype::{Font, Scale};

use crate::gradient::{Color, Colormap};
use crate::png;

/// Height of the title strip above each panel.
pub const TITLE_HEIGHT: u32 = 24;
/// Gap between panel, colour bar and cell edge.
pub const MARGIN: u32 = 8;
pub const COLORBAR_WIDTH: u32 = 14;
pub const TICK_LENGTH: u32 = 4;
/// Room right of the colour bar for tick labels.
pub const LABEL_WIDTH: u32 = 64;
const LABEL_HEIGHT: f32 = 10.0;

const FRAME_COLOR: Rgba<u8> = Rgba([64, 64, 64, 255]);

/// One colour bar tick: position on the `[0, 1]` axis and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub t: f32,
    pub label: String,
}

/// Pixel geometry of the panel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub columns: u32,
    pub rows: u32,
    pub panel_size: u32,
}

impl GridGeometry {
    pub fn from_layout(layout: &QuicklookLayout) -> Self {
        Self {
            columns: layout.columns.max(1) as u32,
            rows: layout.rows().max(1) as u32,
            panel_size: layout.panel_size,
        }
    }

    pub fn cell_width(&self) -> u32 {
        MARGIN + self.panel_size + MARGIN + COLORBAR_WIDTH + TICK_LENGTH + LABEL_WIDTH + MARGIN
    }

    pub fn cell_height(&self) -> u32 {
        TITLE_HEIGHT + self.panel_size + MARGIN
    }

    pub fn width(&self) -> u32 {
        self.columns * self.cell_width()
    }

    pub fn height(&self) -> u32 {
        self.rows * self.cell_height()
    }

    /// Top-left pixel of panel `index` (row-major).
    pub fn panel_origin(&self, index: usize) -> (u32, u32) {
        let col = index as u32 % self.columns;
        let row = index as u32 / self.columns;
        (
            col * self.cell_width() + MARGIN,
            row * self.cell_height() + TITLE_HEIGHT,
        )
    }
}

/// Composite image under construction.
pub struct Canvas<'f> {
    image: RgbaImage,
    geometry: GridGeometry,
    font: Option<&'f Font<'static>>,
}

impl<'f> Canvas<'f> {
    pub fn new(geometry: GridGeometry, font: Option<&'f Font<'static>>) -> Self {
        let image = RgbaImage::from_pixel(
            geometry.width(),
            geometry.height(),
            Rgba(Color::WHITE.to_rgba()),
        );
        Self {
            image,
            geometry,
            font,
        }
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    /// Copy row-major panel pixels; `None` leaves the background showing.
    pub fn paint_panel(&mut self, index: usize, pixels: &[Option<Color>]) {
        let size = self.geometry.panel_size;
        let (ox, oy) = self.geometry.panel_origin(index);
        for (i, color) in pixels.iter().enumerate().take((size * size) as usize) {
            if let Some(color) = color {
                let x = ox + i as u32 % size;
                let y = oy + i as u32 / size;
                self.image.put_pixel(x, y, Rgba(color.to_rgba()));
            }
        }
    }

    /// Concentric rings centred on the radar, radii in pixels, clipped to
    /// the panel.
    pub fn draw_rings(&mut self, index: usize, radii_px: &[f32], color: Color) {
        let size = self.geometry.panel_size;
        let (ox, oy) = self.geometry.panel_origin(index);
        let centre = size as f32 / 2.0;
        let rgba = Rgba(color.to_rgba());
        for &radius in radii_px {
            if !(radius > 0.0) {
                continue;
            }
            let steps = (radius * std::f32::consts::TAU * 2.0).ceil() as u32;
            for k in 0..steps {
                let theta = k as f32 / steps as f32 * std::f32::consts::TAU;
                let x = (centre + radius * theta.cos()).floor();
                let y = (centre + radius * theta.sin()).floor();
                if x >= 0.0 && y >= 0.0 && (x as u32) < size && (y as u32) < size {
                    self.image.put_pixel(ox + x as u32, oy + y as u32, rgba);
                }
            }
        }
    }

    pub fn draw_frame(&mut self, index: usize) {
        let size = self.geometry.panel_size;
        let (ox, oy) = self.geometry.panel_origin(index);
        let rect = Rect::at(ox as i32, oy as i32).of_size(size, size);
        draw_hollow_rect_mut(&mut self.image, rect, FRAME_COLOR);
    }

    /// Vertical colour bar to the right of the panel, low values at the bottom.
    ///
    /// Tick marks are always drawn; their labels need a font.
    pub fn draw_colorbar(&mut self, index: usize, colormap: &Colormap, ticks: &[Tick]) {
        let size = self.geometry.panel_size;
        let (ox, oy) = self.geometry.panel_origin(index);
        let x0 = ox + size + MARGIN;
        for dy in 0..size {
            let t = 1.0 - (dy as f32 + 0.5) / size as f32;
            let color = Rgba(colormap.sample(t).to_rgba());
            for dx in 0..COLORBAR_WIDTH {
                self.image.put_pixel(x0 + dx, oy + dy, color);
            }
        }
        let rect = Rect::at(x0 as i32, oy as i32).of_size(COLORBAR_WIDTH, size);
        draw_hollow_rect_mut(&mut self.image, rect, FRAME_COLOR);

        let ink = Rgba(Color::BLACK.to_rgba());
        let tick_x = x0 + COLORBAR_WIDTH;
        let scale = Scale::uniform(LABEL_HEIGHT);
        for tick in ticks {
            let dy = ((1.0 - tick.t.clamp(0.0, 1.0)) * size as f32) as u32;
            let y = oy + dy.min(size - 1);
            for dx in 0..TICK_LENGTH {
                self.image.put_pixel(tick_x + dx, y, ink);
            }
            if let Some(font) = self.font {
                let text_y = y as i32 - LABEL_HEIGHT as i32 / 2;
                let text_x = (tick_x + TICK_LENGTH + 2) as i32;
                draw_text_mut(&mut self.image, ink, text_x, text_y, scale, font, &tick.label);
            }
        }
    }

    /// Title above the panel. Returns false when no font is loaded.
    pub fn draw_title(&mut self, index: usize, text: &str) -> bool {
        let Some(font) = self.font else {
            return false;
        };
        let (ox, oy) = self.geometry.panel_origin(index);
        let scale = Scale::uniform(TITLE_HEIGHT as f32 * 0.6);
        let y = oy.saturating_sub(TITLE_HEIGHT) as i32 + (TITLE_HEIGHT as i32 / 5);
        let ink = Rgba(Color::BLACK.to_rgba());
        draw_text_mut(&mut self.image, ink, ox as i32, y, scale, font, text);
        true
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let Rgba([r, g, b, a]) = *self.image.get_pixel(x, y);
        Color::new(r, g, b, a)
    }

    /// Encode to PNG, releasing the pixel buffer.
    pub fn into_png(self) -> Result<Vec<u8>, String> {
        let (width, height) = self.image.dimensions();
        let raw = self.image.into_raw();
        png::create_png_auto(&raw, width as usize, height as usize)
    }
}
