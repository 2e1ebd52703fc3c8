/*
 *  display/mod.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - session, bitmap streaming and transports
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

use std::sync::Arc;

// Core trait definitions
pub mod traits;
pub mod error;

pub mod session;
pub mod bitmap;
pub mod image_source;

// Transports
pub mod transport;
pub mod mock;

// Re-exports for convenience
pub use traits::{ImageSource, Transport};
pub use error::DisplayError;
pub use session::{DisplaySession, DisplayState, Orientation, SessionState};
pub use bitmap::Rectangle;
pub use image_source::{DecodedImage, MimeType};
pub use transport::SerialTransport;
pub use mock::MockTransport;

/// Type-erased transport, serial or mock
pub type BoxedTransport = Box<dyn Transport>;

/// A session shared between tasks, one high-level operation at a time.
///
/// Hold the lock for the whole operation (orientation change, bitmap stream);
/// frames from two operations must never interleave on the wire.
pub type SharedSession<T = BoxedTransport> = Arc<tokio::sync::Mutex<DisplaySession<T>>>;

/// Wrap a session for sharing
pub fn share<T: Transport>(session: DisplaySession<T>) -> SharedSession<T> {
    Arc::new(tokio::sync::Mutex::new(session))
}
