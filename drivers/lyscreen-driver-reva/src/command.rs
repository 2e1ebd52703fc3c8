/*
 *  LyScreen Revision A Protocol - Command Frames
 *
 *  Opcode table and the 6-byte frame packing used by every command
 */

/// Length of every command frame on the wire
pub const FRAME_LEN: usize = 6;

/// Mask applied to each frame parameter
const PARAM_MASK: u16 = 0x03FF;

/// Revision A opcode table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Parameterless reset, only sent while initialising
    Reset = 0xFF,
    Clear = 0x66,
    ToBlack = 0x67,
    ScreenOff = 0x6C,
    ScreenOn = 0x6D,
    SetBrightness = 0x6E,
    SetOrientation = 0x79,
    /// Zero geometry handshake sent ahead of every orientation change
    GeometryReset = 0x7A,
    DisplayBitmap = 0xC5,
}

impl Opcode {
    /// Raw opcode byte
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op.code()
    }
}

/// A packed command frame
///
/// Layout, most significant bit first:
///
/// ```text
/// byte0 = p1[9:2]
/// byte1 = p1[1:0] p2[9:4]
/// byte2 = p2[3:0] p3[9:6]
/// byte3 = p3[5:0] p4[9:8]
/// byte4 = p4[7:0]
/// byte5 = opcode
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame([u8; FRAME_LEN]);

impl CommandFrame {
    /// Frame for `op` with all parameters zero
    pub fn new(op: Opcode) -> Self {
        pack_command(op.code(), 0, 0, 0, 0)
    }

    /// Frame for `op` carrying four parameters
    pub fn with_params(op: Opcode, p1: u16, p2: u16, p3: u16, p4: u16) -> Self {
        pack_command(op.code(), p1, p2, p3, p4)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn opcode(&self) -> u8 {
        self.0[5]
    }

    /// Recover the four 10-bit parameters from the packed bytes
    pub fn params(&self) -> [u16; 4] {
        let b = self.0.map(u16::from);
        [
            (b[0] << 2) | (b[1] >> 6),
            ((b[1] & 0x3F) << 4) | (b[2] >> 4),
            ((b[2] & 0x0F) << 6) | (b[3] >> 2),
            ((b[3] & 0x03) << 8) | b[4],
        ]
    }

    /// Frame followed by a trailing payload, as sent for orientation commands
    pub fn with_payload(&self, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FRAME_LEN + payload.len());
        bytes.extend_from_slice(&self.0);
        bytes.extend_from_slice(payload);
        bytes
    }
}

/// Reads back the leading frame of a buffer, e.g. one captured off the wire
impl TryFrom<&[u8]> for CommandFrame {
    type Error = usize;

    /// Fails with the buffer length when it is shorter than a frame
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let head = bytes.get(..FRAME_LEN).ok_or(bytes.len())?;
        let mut frame = [0u8; FRAME_LEN];
        frame.copy_from_slice(head);
        Ok(CommandFrame(frame))
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Pack an opcode and four parameters into a frame.
///
/// Only the low 10 bits of each parameter reach the wire; anything above is
/// dropped, never rejected.
pub fn pack_command(opcode: u8, p1: u16, p2: u16, p3: u16, p4: u16) -> CommandFrame {
    let (p1, p2, p3, p4) = (
        p1 & PARAM_MASK,
        p2 & PARAM_MASK,
        p3 & PARAM_MASK,
        p4 & PARAM_MASK,
    );

    CommandFrame([
        (p1 >> 2) as u8,
        (((p1 & 0x03) << 6) | ((p2 >> 4) & 0x3F)) as u8,
        (((p2 & 0x0F) << 4) | ((p3 >> 6) & 0x0F)) as u8,
        (((p3 & 0x3F) << 2) | ((p4 >> 8) & 0x03)) as u8,
        (p4 & 0xFF) as u8,
        opcode,
    ])
}

/// Little-endian 16-bit field for command payloads
pub fn pack_u16(n: u16) -> [u8; 2] {
    n.to_le_bytes()
}
