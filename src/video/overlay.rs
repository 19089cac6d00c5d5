//! Stats overlay
//!
//! FPS, bandwidth, and loss are blitted onto each decoded frame before it
//! reaches the display and the recorder, so the overlay is baked into the
//! recording (single-pass rendering). Text uses a small built-in 5x7
//! glyph set; overlay drawing is a leaf collaborator and needs nothing
//! fancier than a monospace blit.

use image::Rgb;

use crate::stats::StatsSnapshot;
use crate::video::RawFrame;

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const SCALE: u32 = 2;

/// Draw the three stat lines at the reference positions
pub fn draw_overlay(frame: &mut RawFrame, snapshot: &StatsSnapshot) {
    draw_text(frame, 10, 25, &format!("FPS: {:.1}", snapshot.fps), GREEN);
    draw_text(
        frame,
        10,
        50,
        &format!("BW: {:.1} KB/S", snapshot.bandwidth_kbps),
        GREEN,
    );
    draw_text(
        frame,
        10,
        75,
        &format!("LOSS: {:.1}%", snapshot.loss_percent),
        RED,
    );
}

/// Blit uppercase text; unknown characters render as spaces
pub fn draw_text(frame: &mut RawFrame, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let mut cursor = x;
    for ch in text.chars() {
        draw_glyph(frame, cursor, y, ch, color);
        cursor += (GLYPH_WIDTH + 1) * SCALE;
    }
}

fn draw_glyph(frame: &mut RawFrame, x: u32, y: u32, ch: char, color: Rgb<u8>) {
    let rows = glyph(ch);
    let (width, height) = frame.dimensions();

    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            for dy in 0..SCALE {
                for dx in 0..SCALE {
                    let px = x + col * SCALE + dx;
                    let py = y + row as u32 * SCALE + dy;
                    if px < width && py < height {
                        frame.put_pixel(px, py, color);
                    }
                }
            }
        }
    }
}

/// 5x7 glyph rows, MSB = leftmost column
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '%' => [0x19, 0x19, 0x02, 0x04, 0x08, 0x13, 0x13],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        _ => [0; 7],
    }
}
