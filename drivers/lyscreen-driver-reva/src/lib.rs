/*
 *  LyScreen Revision A Protocol
 *
 *  Wire-level encoding for the 3.5" serial attached bitmap display
 *  (revision A command set) used by the LyScreen driver.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 */

//! # LyScreen Revision A Protocol
//!
//! Pure encoding helpers for the revision A serial display.
//!
//! ## Features
//!
//! - 6-byte command frames carrying an opcode and four 10-bit parameters
//! - Little-endian 16-bit payload fields
//! - RGB565 pixel packing for the raster stream
//!
//! ## Hardware Support
//!
//! - 320x480 TFT panel, portrait native
//! - USB CDC serial, 9600 baud, 8N1
//!
//! Nothing here touches I/O. Frames are built, handed to a transport and
//! dropped; the bit layout is fixed by the device firmware and must not drift.

pub mod color;
pub mod command;

pub use color::{pack_color, ColorWord};
pub use command::{pack_command, pack_u16, CommandFrame, Opcode, FRAME_LEN};

/// Panel width in portrait orientation
pub const BASE_WIDTH: u16 = 320;

/// Panel height in portrait orientation
pub const BASE_HEIGHT: u16 = 480;
