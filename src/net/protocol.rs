//! Wire format of the strand data protocol.
//!
//! Every datagram carries exactly one command, identified by its first byte:
//!
//! ```text
//! 'B' (0x42)                                   begin frame
//! 'S' (0x53) strand:u8 len:u16le rgb[len]      strand data
//! 'E' (0x45)                                   end frame
//! ```

use palette::Srgb;
use thiserror::Error;

use crate::fixture::StrandId;

pub const CMD_BEGIN: u8 = b'B';
pub const CMD_STRAND: u8 = b'S';
pub const CMD_END: u8 = b'E';

/// Command byte, strand id and two length bytes.
pub const STRAND_HEADER_LEN: usize = 4;

/// Bytes per pixel in strand payloads (red, green, blue).
pub const BYTES_PER_PIXEL: usize = 3;

/// A decoded datagram. Strand data borrows from the datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Begin,
    Strand { strand: StrandId, data: &'a [u8] },
    End,
}

/// Why a datagram was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("Empty datagram")]
    Empty,

    #[error("Unknown command byte 0x{0:02x}")]
    UnknownCommand(u8),

    #[error("Strand packet truncated: {len} bytes, header needs 4")]
    Truncated { len: usize },

    #[error("Strand {strand} declares {declared} payload bytes but carries {actual}")]
    LengthMismatch {
        strand: StrandId,
        declared: usize,
        actual: usize,
    },

    #[error("Strand {strand} payload of {len} bytes is not a whole number of RGB pixels")]
    NotRgbAligned { strand: StrandId, len: usize },

    #[error("'{command}' command received outside of a frame")]
    OutOfSequence { command: char },
}

impl PacketError {
    /// Malformed packets are damaged on the wire; out-of-sequence ones are
    /// well-formed but arrived without a frame context.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, PacketError::OutOfSequence { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Strand {strand} payload of {len} bytes exceeds the 16-bit length field")]
    PayloadTooLarge { strand: StrandId, len: usize },
}

/// Parses one datagram into a command without copying the payload.
pub fn parse(datagram: &[u8]) -> Result<Command<'_>, PacketError> {
    let (&cmd, _) = datagram.split_first().ok_or(PacketError::Empty)?;
    match cmd {
        CMD_BEGIN => Ok(Command::Begin),
        CMD_END => Ok(Command::End),
        CMD_STRAND => {
            if datagram.len() < STRAND_HEADER_LEN {
                return Err(PacketError::Truncated {
                    len: datagram.len(),
                });
            }
            let strand = datagram[1];
            let declared = u16::from_le_bytes([datagram[2], datagram[3]]) as usize;
            let data = &datagram[STRAND_HEADER_LEN..];
            if data.len() != declared {
                return Err(PacketError::LengthMismatch {
                    strand,
                    declared,
                    actual: data.len(),
                });
            }
            if declared % BYTES_PER_PIXEL != 0 {
                return Err(PacketError::NotRgbAligned {
                    strand,
                    len: declared,
                });
            }
            Ok(Command::Strand { strand, data })
        }
        other => Err(PacketError::UnknownCommand(other)),
    }
}

pub fn encode_begin() -> Vec<u8> {
    vec![CMD_BEGIN]
}

pub fn encode_end() -> Vec<u8> {
    vec![CMD_END]
}

/// Builds a strand data datagram from a run of pixel colors.
pub fn encode_strand(strand: StrandId, colors: &[Srgb<u8>]) -> Result<Vec<u8>, EncodeError> {
    let len = colors.len() * BYTES_PER_PIXEL;
    let declared = u16::try_from(len).map_err(|_| EncodeError::PayloadTooLarge { strand, len })?;

    let mut out = Vec::with_capacity(STRAND_HEADER_LEN + len);
    out.push(CMD_STRAND);
    out.push(strand);
    out.extend_from_slice(&declared.to_le_bytes());
    for c in colors {
        out.extend_from_slice(&[c.red, c.green, c.blue]);
    }
    Ok(out)
}
