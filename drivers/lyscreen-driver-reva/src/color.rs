/*
 *  LyScreen Revision A Protocol - Color Packing
 *
 *  RGB888 to RGB565 conversion for the raster stream
 */

/// A pixel in the panel's native 5-6-5 layout, red in the high bits
pub type ColorWord = u16;

const RED_MAX: f64 = 31.0;
const GREEN_MAX: f64 = 63.0;
const BLUE_MAX: f64 = 31.0;

/// Scale an 8-bit channel to `max` and truncate toward zero.
///
/// Must stay a floating point scale followed by truncation, the panel
/// expects these exact values.
#[inline]
fn scale(channel: u8, max: f64) -> u16 {
    (f64::from(channel) / 255.0 * max) as u16
}

/// Pack one RGB888 sample into a [`ColorWord`]
#[inline]
pub fn pack_color(r: u8, g: u8, b: u8) -> ColorWord {
    (scale(r, RED_MAX) << 11) | (scale(g, GREEN_MAX) << 5) | scale(b, BLUE_MAX)
}
