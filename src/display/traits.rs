/*
 *  display/traits.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for the transport and image seams
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

use std::io;

use async_trait::async_trait;

/// Byte sink connected to the display
///
/// Every call is one independent unit of work. The session awaits each write
/// before issuing the next, so an implementation never sees two writes in
/// flight and must not reorder or coalesce across calls.
#[async_trait]
pub trait Transport: Send {
    /// Write the whole buffer, resolving once the bytes have left the host
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Human readable endpoint, used in log lines
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Decoded raster exposed one RGB sample at a time
pub trait ImageSource {
    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// RGB sample at (x, y). Callers stay within `width() x height()`.
    fn sample(&self, x: u32, y: u32) -> (u8, u8, u8);
}
