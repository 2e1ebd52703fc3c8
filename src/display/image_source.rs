/*
 *  display/image_source.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Image decoding adapter, png and jpeg into an RGB sample accessor
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
use std::path::Path;
use std::str::FromStr;

use image::{ImageFormat, RgbImage};

use crate::display::error::DisplayError;
use crate::display::traits::ImageSource;

/// Image types the display pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    Png,
    Jpeg,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Png => "image/png",
            MimeType::Jpeg => "image/jpeg",
        }
    }

    /// Guess from a file extension (`png`, `jpg`, `jpeg`, any case)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(MimeType::Png),
            "jpg" | "jpeg" => Some(MimeType::Jpeg),
            _ => None,
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            MimeType::Png => ImageFormat::Png,
            MimeType::Jpeg => ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MimeType {
    type Err = DisplayError;

    /// Parses a Content-Type value, ignoring parameters such as `; charset=`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Ok(MimeType::Png),
            "image/jpeg" | "image/jpg" => Ok(MimeType::Jpeg),
            _ => Err(DisplayError::UnsupportedMimeType(s.to_string())),
        }
    }
}

/// Fully decoded RGB raster
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    /// Decode `bytes` as `mime`. Alpha is discarded, greyscale is expanded.
    pub fn decode(bytes: &[u8], mime: MimeType) -> Result<Self, DisplayError> {
        let image = image::load_from_memory_with_format(bytes, mime.format())?;
        Ok(Self { pixels: image.to_rgb8() })
    }
}

impl From<RgbImage> for DecodedImage {
    fn from(pixels: RgbImage) -> Self {
        Self { pixels }
    }
}

impl ImageSource for DecodedImage {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn sample(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let [r, g, b] = self.pixels.get_pixel(x, y).0;
        (r, g, b)
    }
}
