/*
 *  display/error.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the display session
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

use std::error::Error;
use std::fmt;
use std::io;

use crate::display::session::SessionState;

/// Unified error type for all display operations
#[derive(Debug)]
pub enum DisplayError {
    /// Caller supplied input the device cannot accept
    Validation(String),

    /// Image payload declared with a type we cannot decode
    UnsupportedMimeType(String),

    /// Image payload could not be decoded
    Decode(image::ImageError),

    /// Serial open or write failed
    Transport(io::Error),

    /// Command issued while the session is not ready
    NotReady(SessionState),
}

impl DisplayError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DisplayError::Validation(_))
    }

    /// Unsupported or corrupt image data
    pub fn is_decode(&self) -> bool {
        matches!(self, DisplayError::Decode(_) | DisplayError::UnsupportedMimeType(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DisplayError::Transport(_))
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Validation(msg) =>
                write!(f, "Invalid request: {}", msg),
            DisplayError::UnsupportedMimeType(mime) =>
                write!(f, "Unsupported image type: {} (expected image/png or image/jpeg)", mime),
            DisplayError::Decode(err) =>
                write!(f, "Image decode failed: {}", err),
            DisplayError::Transport(err) =>
                write!(f, "Serial transport error: {}", err),
            DisplayError::NotReady(state) =>
                write!(f, "Display session is not ready (state: {})", state),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Decode(err) => Some(err),
            DisplayError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DisplayError {
    fn from(err: io::Error) -> Self {
        DisplayError::Transport(err)
    }
}

impl From<image::ImageError> for DisplayError {
    fn from(err: image::ImageError) -> Self {
        DisplayError::Decode(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        let err = DisplayError::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(err.is_transport());
        assert!(err.source().is_some());

        let err = DisplayError::UnsupportedMimeType("image/gif".into());
        assert!(err.is_decode());
        assert!(!err.is_transport());

        assert!(DisplayError::Validation("x".into()).is_validation());
    }

    #[test]
    fn test_not_ready_message() {
        let err = DisplayError::NotReady(SessionState::Failed);
        assert_eq!(err.to_string(), "Display session is not ready (state: failed)");
    }
}
