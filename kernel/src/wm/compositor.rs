//! Scene rendering.
//!
//! Rendering is a pure function of the scene and the framebuffer size:
//! background first, then every window back-to-front as three filled
//! rectangles (border, title bar, content), a per-title accent stripe, and
//! the title text. The returned value is the FNV-1a fingerprint of the
//! rendered pixels, the only observable the tests rely on.

use noto_sans_mono_bitmap::{FontWeight, RasterHeight, get_raster, get_raster_width};

use super::{Window, WindowManager};
use crate::gfx::FrameBuffer;
use crate::hash::fnv1a;

const TITLE_FONT: RasterHeight = RasterHeight::Size16;

pub fn render(wm: &WindowManager, fb: &mut FrameBuffer) -> u32 {
    fb.fill_rect(0, 0, fb.width(), fb.height(), wm.background_color());
    for id in wm.stack().iter() {
        draw_window(wm.window(id), fb);
    }
    fb.fingerprint()
}

fn draw_window(window: &Window, fb: &mut FrameBuffer) {
    if window.frame.width == 0 || window.frame.height == 0 {
        return;
    }

    let frame = window.frame;
    fb.fill_rect(
        frame.x,
        frame.y,
        frame.width,
        frame.height,
        window.style.border_color,
    );

    let title_bar = window.title_bar_rect();
    if title_bar.width != 0 && title_bar.height != 0 {
        fb.fill_rect(
            title_bar.x,
            title_bar.y,
            title_bar.width,
            title_bar.height,
            window.style.title_bar_color,
        );
    }

    let content = window.content_rect();
    if content.width != 0 && content.height != 0 {
        fb.fill_rect(
            content.x,
            content.y,
            content.width,
            content.height,
            window.style.content_color,
        );
    }

    if title_bar.width > 8 && title_bar.height > 4 {
        let title_hash = fnv1a(window.title.as_bytes());
        let accent_width = 8 + title_hash % (title_bar.width - 8);
        let accent_color = 0x0020_2020 | (title_hash & 0x000f_0f0f);
        fb.fill_rect(
            title_bar.x + 4,
            title_bar.y + 4,
            accent_width - 4,
            1,
            accent_color,
        );
        draw_title_text(window, fb);
    }
}

/// Rasters the title into the title bar, clipped to its right edge.
fn draw_title_text(window: &Window, fb: &mut FrameBuffer) {
    let title_bar = window.title_bar_rect();
    if title_bar.height < TITLE_FONT.val() as u32 {
        return;
    }
    let char_width = get_raster_width(FontWeight::Regular, TITLE_FONT) as u32;
    let mut x = title_bar.x + 4;
    let y = title_bar.y + 1;
    let right_edge = title_bar.x + title_bar.width;

    for ch in window.title.chars() {
        if x + char_width + 4 > right_edge {
            break;
        }
        let raster = match get_raster(ch, FontWeight::Regular, TITLE_FONT) {
            Some(raster) => raster,
            None => continue,
        };
        for (row_i, row) in raster.raster().iter().enumerate() {
            for (col_i, &intensity) in row.iter().enumerate() {
                if intensity == 0 {
                    continue;
                }
                let shade = intensity as u32;
                fb.put_pixel(
                    x + col_i as u32,
                    y + row_i as u32,
                    shade << 16 | shade << 8 | shade,
                );
            }
        }
        x += char_width;
    }
}
