/*
 *  display/bitmap.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bitmap streaming - header frame then one RGB565 row per write
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fmt;

use log::{debug, warn};
use lyscreen_driver_reva::{pack_color, CommandFrame, Opcode};
use serde::Serialize;

use crate::display::error::DisplayError;
use crate::display::session::DisplaySession;
use crate::display::traits::{ImageSource, Transport};

/// Destination of a bitmap write, inclusive corners
///
/// Never clipped. Coordinates wider than the frame's 10-bit fields are
/// masked when the header is packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rectangle {
    /// Rectangle of `width` x `height` with its top-left corner at (x, y)
    pub fn at(x: u16, y: u16, width: u32, height: u32) -> Result<Self, DisplayError> {
        if width == 0 || height == 0 {
            return Err(DisplayError::Validation(format!("image has no pixels ({}x{})", width, height)));
        }
        let (x, y) = (u32::from(x), u32::from(y));
        Ok(Self {
            x,
            y,
            x2: x.saturating_add(width - 1),
            y2: y.saturating_add(height - 1),
        })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x + 1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y + 1
    }

    /// DisplayBitmap header frame for this rectangle
    pub fn header(&self) -> CommandFrame {
        CommandFrame::with_params(
            Opcode::DisplayBitmap,
            self.x as u16,
            self.y as u16,
            self.x2 as u16,
            self.y2 as u16,
        )
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.x, self.y, self.x2, self.y2)
    }
}

/// Stream `source` to the panel with its top-left corner at (x, y).
///
/// Sends the header frame, then rows strictly top to bottom, each row a
/// separate write of little-endian RGB565 words. The first failed write ends
/// the stream; rows already sent are not retracted.
pub async fn stream<T, S>(session: &mut DisplaySession<T>, x: u16, y: u16, source: &S) -> Result<Rectangle, DisplayError>
where
    T: Transport,
    S: ImageSource + ?Sized,
{
    let rect = Rectangle::at(x, y, source.width(), source.height())?;

    let geometry = session.display_state();
    if !geometry.contains(&rect) {
        warn!("bitmap {} extends past the {}x{} panel", rect, geometry.width, geometry.height);
    }

    debug!("bitmap header {}", rect);
    session.write(rect.header().as_bytes()).await?;

    let (width, height) = (source.width(), source.height());
    let mut row = Vec::with_capacity(width as usize * 2);
    for r in 0..height {
        row.clear();
        for c in 0..width {
            let (red, green, blue) = source.sample(c, r);
            row.extend_from_slice(&pack_color(red, green, blue).to_le_bytes());
        }
        session.write(&row).await?;
    }

    debug!("bitmap {} sent, {} rows", rect, height);
    Ok(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::image_source::DecodedImage;
    use crate::display::mock::MockTransport;
    use crate::display::session::{Orientation, SessionState};
    use image::{Rgb, RgbImage};

    async fn ready_session() -> (DisplaySession<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        let mut session = DisplaySession::new(mock.clone());
        session.init(Orientation::Portrait).await.unwrap();
        mock.reset();
        (session, mock)
    }

    #[test]
    fn test_rectangle_from_origin() {
        let rect = Rectangle::at(10, 20, 4, 4).unwrap();
        assert_eq!(rect, Rectangle { x: 10, y: 20, x2: 13, y2: 23 });
        assert_eq!((rect.width(), rect.height()), (4, 4));
        assert_eq!(rect.header().params(), [10, 20, 13, 23]);
    }

    #[test]
    fn test_empty_rectangle_rejected() {
        assert!(Rectangle::at(0, 0, 0, 5).unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_rows_in_order() {
        let (mut session, mock) = ready_session().await;

        // one colour per row
        let mut img = RgbImage::new(2, 3);
        for (_, y, px) in img.enumerate_pixels_mut() {
            *px = match y {
                0 => Rgb([255, 0, 0]),
                1 => Rgb([0, 255, 0]),
                _ => Rgb([0, 0, 255]),
            };
        }
        let image = DecodedImage::from(img);

        let rect = stream(&mut session, 0, 0, &image).await.unwrap();
        assert_eq!(rect, Rectangle { x: 0, y: 0, x2: 1, y2: 2 });

        let writes = mock.writes();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0][5], 0xC5);
        assert_eq!(writes[1], vec![0x00, 0xF8, 0x00, 0xF8]);
        assert_eq!(writes[2], vec![0xE0, 0x07, 0xE0, 0x07]);
        assert_eq!(writes[3], vec![0x1F, 0x00, 0x1F, 0x00]);
    }

    #[tokio::test]
    async fn test_row_failure_aborts_stream() {
        let (mut session, mock) = ready_session().await;
        let image = DecodedImage::from(RgbImage::from_pixel(3, 5, Rgb([9, 9, 9])));

        // header and first row go out, second row fails
        mock.state().lock().fail_after = Some(2);
        let err = stream(&mut session, 0, 0, &image).await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(mock.writes().len(), 2);
        assert_eq!(mock.state().lock().attempts, 3);
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_offscreen_rectangle_is_not_clipped() {
        let (mut session, mock) = ready_session().await;
        let image = DecodedImage::from(RgbImage::from_pixel(4, 1, Rgb([0, 0, 0])));

        let rect = stream(&mut session, 318, 0, &image).await.unwrap();
        assert_eq!(rect.x2, 321);
        assert_eq!(mock.writes()[1].len(), 8);
    }
}
