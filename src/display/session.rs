/*
 *  display/session.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display session - owns the transport, the orientation state and the
 *  ordering of every frame sent to the panel
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
use std::str::FromStr;

use log::{debug, error, info, log_enabled, trace, Level};
use lyscreen_driver_reva::{pack_u16, CommandFrame, Opcode, BASE_HEIGHT, BASE_WIDTH};
use serde::{Deserialize, Serialize};

use crate::display::bitmap::{self, Rectangle};
use crate::display::error::DisplayError;
use crate::display::image_source::{DecodedImage, MimeType};
use crate::display::traits::{ImageSource, Transport};

/// Base parameter of the SetOrientation payload
const ORIENTATION_BASE: u8 = 0x64;
const ORIENTATION_LANDSCAPE: u8 = 0x02;
const ORIENTATION_REVERSE: u8 = 0x01;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Transport open, nothing sent yet
    Uninitialized,
    /// Reset and orientation handshake completed
    Ready,
    /// A write failed; the device may be out of step until re-initialised
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::Failed => "failed",
        })
    }
}

/// Panel rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    #[default]
    Portrait,
}

impl FromStr for Orientation {
    type Err = DisplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            other => Err(DisplayError::Validation(format!(
                "orientation must be landscape or portrait, got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        })
    }
}

/// Active geometry as currently oriented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub width: u16,
    pub height: u16,
    pub orientation: Orientation,
    pub reverse: bool,
}

impl DisplayState {
    /// Geometry for `orientation`, always derived from the 320x480 base
    pub fn oriented(orientation: Orientation, reverse: bool) -> Self {
        let (width, height) = match orientation {
            Orientation::Landscape => (BASE_HEIGHT, BASE_WIDTH),
            Orientation::Portrait => (BASE_WIDTH, BASE_HEIGHT),
        };
        Self { width, height, orientation, reverse }
    }

    /// Whether `rect` lies entirely on the panel
    pub fn contains(&self, rect: &Rectangle) -> bool {
        rect.x2 < u32::from(self.width) && rect.y2 < u32::from(self.height)
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::oriented(Orientation::Portrait, false)
    }
}

/// Stateful driver bound to one open transport
///
/// Every frame and row buffer goes through [`DisplaySession::write`], awaited
/// one at a time. The session does no locking of its own; callers sharing it
/// across tasks wrap it in a [`SharedSession`](crate::display::SharedSession).
pub struct DisplaySession<T: Transport> {
    transport: T,
    state: SessionState,
    display: DisplayState,
}

impl<T: Transport> DisplaySession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: SessionState::Uninitialized,
            display: DisplayState::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn display_state(&self) -> DisplayState {
        self.display
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reset the panel and apply `orientation`.
    ///
    /// Allowed from any state; from Failed this re-synchronises the device.
    pub async fn init(&mut self, orientation: Orientation) -> Result<(), DisplayError> {
        info!("Initialising display on {} ({})", self.transport.describe(), orientation);

        self.write(CommandFrame::new(Opcode::Reset).as_bytes()).await?;
        self.send_orientation(orientation, false).await?;

        self.state = SessionState::Ready;
        Ok(())
    }

    pub async fn set_orientation(&mut self, orientation: Orientation, reverse: bool) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        self.send_orientation(orientation, reverse).await
    }

    pub async fn clear(&mut self) -> Result<(), DisplayError> {
        self.send_command(Opcode::Clear).await
    }

    pub async fn to_black(&mut self) -> Result<(), DisplayError> {
        self.send_command(Opcode::ToBlack).await
    }

    pub async fn screen_on(&mut self) -> Result<(), DisplayError> {
        self.send_command(Opcode::ScreenOn).await
    }

    pub async fn screen_off(&mut self) -> Result<(), DisplayError> {
        self.send_command(Opcode::ScreenOff).await
    }

    /// Set backlight brightness, `percent` in 0..=100.
    ///
    /// The panel takes an inverted level where 0 is full brightness.
    pub async fn set_brightness(&mut self, percent: u8) -> Result<(), DisplayError> {
        if percent > 100 {
            return Err(DisplayError::Validation(format!(
                "brightness must be 0..=100, got {}",
                percent
            )));
        }
        self.ensure_ready()?;

        let level = 255 - u16::from(percent) * 255 / 100;
        debug!("brightness {}% (level {})", percent, level);
        let frame = CommandFrame::with_params(Opcode::SetBrightness, level, 0, 0, 0);
        self.write(frame.as_bytes()).await
    }

    /// Decode `bytes` as `mime` and stream it with its top-left corner at (x, y)
    pub async fn display_bitmap(&mut self, x: u16, y: u16, mime: MimeType, bytes: &[u8]) -> Result<Rectangle, DisplayError> {
        self.ensure_ready()?;
        let image = DecodedImage::decode(bytes, mime)?;
        debug!("decoded {} {}x{}", mime, image.width(), image.height());
        bitmap::stream(self, x, y, &image).await
    }

    /// Stream an already decoded image
    pub async fn display_image<S: ImageSource + Sync + ?Sized>(&mut self, x: u16, y: u16, image: &S) -> Result<Rectangle, DisplayError> {
        self.ensure_ready()?;
        bitmap::stream(self, x, y, image).await
    }

    /// Single choke point between the session and the transport.
    ///
    /// A failure moves the session to Failed and is returned unchanged; bytes
    /// already sent stay sent.
    ///
    /// The session reads Failed while a write is in flight, so a caller whose
    /// future is dropped part way through a frame or a bitmap stream leaves
    /// it Failed until the next `init`.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        if log_enabled!(Level::Trace) {
            trace!("-> {} bytes: {}", bytes.len(), hex_dump(bytes));
        }

        let resume = std::mem::replace(&mut self.state, SessionState::Failed);
        if let Err(err) = self.transport.write(bytes).await {
            error!("write to {} failed: {}", self.transport.describe(), err);
            return Err(DisplayError::Transport(err));
        }
        self.state = resume;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), DisplayError> {
        match self.state {
            SessionState::Ready => Ok(()),
            other => Err(DisplayError::NotReady(other)),
        }
    }

    async fn send_command(&mut self, op: Opcode) -> Result<(), DisplayError> {
        self.ensure_ready()?;
        debug!("command {:?}", op);
        self.write(CommandFrame::new(op).as_bytes()).await
    }

    async fn send_orientation(&mut self, orientation: Orientation, reverse: bool) -> Result<(), DisplayError> {
        let next = DisplayState::oriented(orientation, reverse);

        // zero geometry handshake, required ahead of the orientation frame
        let handshake = CommandFrame::new(Opcode::GeometryReset).with_payload(&[0; 10]);
        self.write(&handshake).await?;

        let mut flags = ORIENTATION_BASE;
        if orientation == Orientation::Landscape {
            flags |= ORIENTATION_LANDSCAPE;
        }
        if reverse {
            flags |= ORIENTATION_REVERSE;
        }

        let mut payload = Vec::with_capacity(10);
        payload.push(flags);
        payload.extend_from_slice(&pack_u16(next.width));
        payload.extend_from_slice(&pack_u16(next.height));
        payload.extend_from_slice(&[0; 5]);
        self.write(&CommandFrame::new(Opcode::SetOrientation).with_payload(&payload)).await?;

        info!("orientation {}{} ({}x{})", orientation, if reverse { " reversed" } else { "" }, next.width, next.height);
        self.display = next;
        Ok(())
    }
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::mock::MockTransport;

    const PORTRAIT_FRAME: [u8; 16] = [0, 0, 0, 0, 0, 0x79, 0x64, 0x40, 0x01, 0xE0, 0x01, 0, 0, 0, 0, 0];

    async fn ready_session() -> (DisplaySession<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        let mut session = DisplaySession::new(mock.clone());
        session.init(Orientation::Portrait).await.unwrap();
        mock.reset();
        (session, mock)
    }

    #[tokio::test]
    async fn test_init_sequence() {
        let mock = MockTransport::new();
        let mut session = DisplaySession::new(mock.clone());
        assert_eq!(session.state(), SessionState::Uninitialized);

        session.init(Orientation::Portrait).await.unwrap();

        let writes = mock.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0], vec![0, 0, 0, 0, 0, 0xFF]);
        let mut handshake = vec![0u8; 16];
        handshake[5] = 0x7A;
        assert_eq!(writes[1], handshake);
        assert_eq!(writes[2], PORTRAIT_FRAME.to_vec());
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.display_state(), DisplayState::oriented(Orientation::Portrait, false));
    }

    #[tokio::test]
    async fn test_landscape_reverse_frame() {
        let (mut session, mock) = ready_session().await;
        session.set_orientation(Orientation::Landscape, true).await.unwrap();

        let writes = mock.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1], vec![0, 0, 0, 0, 0, 0x79, 0x67, 0xE0, 0x01, 0x40, 0x01, 0, 0, 0, 0, 0]);

        let state = session.display_state();
        assert_eq!((state.width, state.height), (480, 320));
        assert!(state.reverse);
    }

    #[tokio::test]
    async fn test_orientation_cycle_restores_dimensions() {
        let (mut session, _mock) = ready_session().await;
        session.set_orientation(Orientation::Landscape, false).await.unwrap();
        session.set_orientation(Orientation::Landscape, false).await.unwrap();
        session.set_orientation(Orientation::Portrait, false).await.unwrap();

        let state = session.display_state();
        assert_eq!((state.width, state.height), (320, 480));
    }

    #[tokio::test]
    async fn test_simple_commands() {
        let (mut session, mock) = ready_session().await;
        session.clear().await.unwrap();
        session.to_black().await.unwrap();
        session.screen_on().await.unwrap();
        session.screen_off().await.unwrap();

        let opcodes: Vec<_> = mock.writes().iter().map(|w| (w.len(), w[5])).collect();
        assert_eq!(opcodes, vec![(6, 0x66), (6, 0x67), (6, 0x6D), (6, 0x6C)]);
    }

    #[tokio::test]
    async fn test_brightness() {
        let (mut session, mock) = ready_session().await;
        session.set_brightness(100).await.unwrap();
        session.set_brightness(0).await.unwrap();
        session.set_brightness(50).await.unwrap();

        let params: Vec<_> = mock
            .writes()
            .iter()
            .map(|w| {
                let frame = CommandFrame::try_from(w.as_slice()).unwrap();
                assert_eq!(frame.opcode(), 0x6E);
                frame.params()[0]
            })
            .collect();
        assert_eq!(params, vec![0, 255, 128]);

        assert!(session.set_brightness(101).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_commands_require_ready() {
        let mock = MockTransport::new();
        let mut session = DisplaySession::new(mock.clone());

        let err = session.clear().await.unwrap_err();
        assert!(matches!(err, DisplayError::NotReady(SessionState::Uninitialized)));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_orientation_keeps_geometry() {
        let (mut session, mock) = ready_session().await;
        // handshake goes out, orientation frame fails
        mock.state().lock().fail_after = Some(1);

        let err = session.set_orientation(Orientation::Landscape, false).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.display_state().orientation, Orientation::Portrait);
        assert_eq!(mock.writes().len(), 1);

        // no further traffic until re-initialised
        assert!(matches!(session.clear().await, Err(DisplayError::NotReady(SessionState::Failed))));
        assert_eq!(mock.state().lock().attempts, 2);

        mock.state().lock().fail_after = None;
        session.init(Orientation::Landscape).await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.display_state().width, 480);
    }

    #[tokio::test]
    async fn test_init_failure() {
        let mock = MockTransport::failing_after(0);
        let mut session = DisplaySession::new(mock);
        assert!(session.init(Orientation::Portrait).await.unwrap_err().is_transport());
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_dropped_stream_leaves_session_failed() {
        let (mut session, mock) = ready_session().await;
        mock.state().lock().yield_on_write = true;
        let picture = DecodedImage::from(image::RgbImage::from_pixel(4, 50, image::Rgb([255, 0, 0])));

        // abandon the stream once the header and a few rows are out
        tokio::select! {
            _ = session.display_image(0, 0, &picture) => panic!("stream should not finish first"),
            _ = async {
                while mock.writes().len() < 5 {
                    tokio::task::yield_now().await;
                }
            } => {}
        }

        let sent = mock.writes().len();
        assert!(sent >= 5 && sent < 51);
        assert_eq!(session.state(), SessionState::Failed);

        // a frame must not land in the middle of the raster
        assert!(matches!(session.clear().await, Err(DisplayError::NotReady(SessionState::Failed))));
        assert_eq!(mock.writes().len(), sent);

        session.init(Orientation::Portrait).await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        session.clear().await.unwrap();
        assert_eq!(mock.writes().last().unwrap()[5], 0x66);
    }

    #[test]
    fn test_orientation_parse() {
        assert_eq!("Landscape".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert!("sideways".parse::<Orientation>().unwrap_err().is_validation());
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x00, 0xC5, 0x7a]), "00 C5 7A");
    }
}
