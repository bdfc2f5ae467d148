use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use crate::qr::Bitmap;

/// Draws a bitmap into the terminal using upper half blocks, two pixels per
/// cell. The bitmap is scaled with nearest neighbour sampling to the largest
/// square that fits and centered in the area.
pub struct BitmapPreview<'a> {
    bitmap: &'a Bitmap,
}

impl<'a> BitmapPreview<'a> {
    pub fn new(bitmap: &'a Bitmap) -> Self {
        BitmapPreview { bitmap }
    }

    fn sample(&self, x: u32, y: u32, side: u32) -> Color {
        let (width, height) = self.bitmap.dimensions();
        let sx = (((x as f32 + 0.5) * width as f32 / side as f32) as u32).min(width - 1);
        let sy = (((y as f32 + 0.5) * height as f32 / side as f32) as u32).min(height - 1);
        let [r, g, b, _] = self.bitmap.get_pixel(sx, sy).0;
        Color::Rgb(r, g, b)
    }
}

impl Widget for BitmapPreview<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.bitmap.width() == 0 || self.bitmap.height() == 0 {
            return;
        }

        // Side of the square in sampled pixels, kept even so every cell
        // has both halves.
        let side = u32::from(area.width).min(u32::from(area.height) * 2) & !1;
        if side == 0 {
            return;
        }

        let cols = side as u16;
        let rows = (side / 2) as u16;
        let left = area.x + (area.width - cols) / 2;
        let top = area.y + (area.height - rows) / 2;

        for row in 0..rows {
            for col in 0..cols {
                let upper = self.sample(u32::from(col), u32::from(row) * 2, side);
                let lower = self.sample(u32::from(col), u32::from(row) * 2 + 1, side);
                if let Some(cell) = buf.cell_mut((left + col, top + row)) {
                    cell.set_symbol("▀").set_fg(upper).set_bg(lower);
                }
            }
        }
    }
}
