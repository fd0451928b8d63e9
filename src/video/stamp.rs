use chrono::{DateTime, Local};

use crate::config::StampConfig;
use crate::error::{Result, VideoError};
use crate::video::types::Frame;

/// Produce an all-black filler frame of the given dimensions
///
/// Non-positive dimensions are a precondition violation.
pub fn blank(width: u32, height: u32) -> Result<Frame> {
    if width == 0 || height == 0 {
        return Err(VideoError::InvalidDimensions { width, height }.into());
    }
    Ok(Frame::new_black(width, height))
}

/// Burns formatted wall-clock instants into frames
///
/// The text lands at a fixed anchor near the bottom-left edge; the anchor
/// offsets and magnification are configuration constants, not computed from
/// the text.
pub struct TimestampStamper {
    config: StampConfig,
}

impl TimestampStamper {
    pub fn new(config: &StampConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Display string for an instant, e.g. `2024-01-11 23:14:05`
    pub fn display_timestamp(&self, instant: DateTime<Local>) -> String {
        instant.format(&self.config.format).to_string()
    }

    /// Burn `text` into `frame` at the configured bottom-left anchor
    pub fn stamp(&self, frame: &mut Frame, text: &str) {
        let x = self.config.margin_x;
        let y = frame.height().saturating_sub(self.config.margin_y);
        draw_text(frame, text, x, y, self.config.scale, [255, 255, 255]);
    }

    /// Format and burn in one step
    pub fn stamp_instant(&self, frame: &mut Frame, instant: DateTime<Local>) {
        let text = self.display_timestamp(instant);
        self.stamp(frame, &text);
    }
}

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// One blank column between characters
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// 5x7 glyphs for the timestamp alphabet, one row per byte, bit 4 leftmost.
/// Characters outside the set advance the cursor without drawing.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        ':' => [0b00000, 0b00100, 0b00100, 0b00000, 0b00100, 0b00100, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(rows)
}

/// Draw `text` with its top-left corner at `(x, y)`, clipped to the frame
fn draw_text(frame: &mut Frame, text: &str, x: u32, y: u32, scale: u32, color: [u8; 3]) {
    let mut pen_x = x;

    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    // Magnify each glyph pixel to a scale x scale block
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = pen_x + col * scale + dx;
                            let py = y + row as u32 * scale + dy;
                            if px < frame.width() && py < frame.height() {
                                frame.set_pixel(px, py, color);
                            }
                        }
                    }
                }
            }
        }
        pen_x += GLYPH_ADVANCE * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamper() -> TimestampStamper {
        TimestampStamper::new(&StampConfig::default())
    }

    #[test]
    fn test_blank_rejects_zero_dimensions() {
        assert!(blank(0, 480).is_err());
        assert!(blank(640, 0).is_err());
    }

    #[test]
    fn test_blank_is_black() {
        let frame = blank(640, 480).unwrap();
        assert!(frame.as_raw().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_display_timestamp_format() {
        let instant = Local.with_ymd_and_hms(2024, 1, 11, 23, 14, 5).unwrap();
        assert_eq!(stamper().display_timestamp(instant), "2024-01-11 23:14:05");
    }

    #[test]
    fn test_stamp_writes_pixels_near_bottom_left() {
        let mut frame = blank(640, 480).unwrap();
        stamper().stamp(&mut frame, "2024-01-11 23:14:05");

        let lit: Vec<(u32, u32)> = (0..640)
            .flat_map(|x| (0..480).map(move |y| (x, y)))
            .filter(|&(x, y)| frame.get_pixel(x, y) != [0, 0, 0])
            .collect();

        assert!(!lit.is_empty(), "stamp drew nothing");

        let config = StampConfig::default();
        let top = 480 - config.margin_y;
        for &(x, y) in &lit {
            assert!(x >= config.margin_x);
            assert!(y >= top && y < top + 7 * config.scale);
        }
    }

    #[test]
    fn test_stamp_clips_at_frame_edge() {
        // Frame narrower than the text; must not panic
        let mut frame = blank(20, 40).unwrap();
        stamper().stamp(&mut frame, "2024-01-11 23:14:05");
    }

    #[test]
    fn test_unknown_characters_advance_without_drawing() {
        let mut with_unknown = blank(200, 60).unwrap();
        let mut with_space = blank(200, 60).unwrap();
        let s = stamper();
        s.stamp(&mut with_unknown, "a1");
        s.stamp(&mut with_space, " 1");
        assert_eq!(with_unknown.as_raw(), with_space.as_raw());
    }
}
