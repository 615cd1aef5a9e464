//! Physical BIFF record plumbing for the worksheet drawing layer.
//!
//! The drawing layer of a BIFF8 worksheet substream is a run of five record
//! kinds; everything else belongs to the surrounding sheet parser (out of
//! scope here). Each physical record is a 2-byte sid, a 2-byte little-endian
//! payload length, and at most [`MAX_RECORD_DATA_SIZE`] payload bytes.

use crate::error::DrawingError;

pub mod records;

/// `MsoDrawing` record id — opens a drawing-layer byte block.
/// See [MS-XLS] 2.4.152.
pub const RECORD_DRAWING: u16 = 0x00EC;
/// `Continue` record id — carries overflow bytes of the preceding record.
pub const RECORD_CONTINUE: u16 = 0x003C;
/// `Obj` record id — per-shape object metadata. See [MS-XLS] 2.4.181.
pub const RECORD_OBJ: u16 = 0x005D;
/// `TxO` record id — per-textbox text metadata. See [MS-XLS] 2.4.329.
pub const RECORD_TXO: u16 = 0x01B6;
/// `Note` record id — cell note, serialized after the drawing block.
/// See [MS-XLS] 2.4.179.
pub const RECORD_NOTE: u16 = 0x001C;

/// Size of a physical record header (sid + length).
pub const RECORD_HEADER_BYTES: usize = 4;

/// Maximum payload of a single physical record. Oversized drawing data is
/// split across `Continue` records at this boundary. See [MS-XLS] 2.1.4.
pub const MAX_RECORD_DATA_SIZE: usize = 8224;

/// Bounds-checked writer over a caller-provided destination slice.
///
/// The drawing aggregate serializes into a buffer the caller pre-sized from
/// the planned record size, so running off the end is reported as
/// [`DrawingError::DestinationTooSmall`] rather than a panic.
#[derive(Debug)]
pub(crate) struct RecordSink<'a> {
    dst: &'a mut [u8],
    start: usize,
    pos: usize,
}

impl<'a> RecordSink<'a> {
    pub(crate) fn new(dst: &'a mut [u8], offset: usize) -> Result<Self, DrawingError> {
        if offset > dst.len() {
            return Err(DrawingError::DestinationTooSmall {
                needed: offset,
                available: dst.len(),
            });
        }
        Ok(Self {
            dst,
            start: offset,
            pos: offset,
        })
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), DrawingError> {
        let end = self.pos.checked_add(bytes.len()).unwrap_or(usize::MAX);
        let Some(dst) = self.dst.get_mut(self.pos..end) else {
            return Err(DrawingError::DestinationTooSmall {
                needed: end,
                available: self.dst.len(),
            });
        };
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub(crate) fn write_u16(&mut self, v: u16) -> Result<(), DrawingError> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Write one physical record (header + payload).
    pub(crate) fn write_record(&mut self, sid: u16, payload: &[u8]) -> Result<(), DrawingError> {
        let len = u16::try_from(payload.len()).map_err(|_| DrawingError::RecordPayloadOverflow {
            sid,
            len: payload.len(),
        })?;
        self.write_u16(sid)?;
        self.write_u16(len)?;
        self.write_bytes(payload)
    }

    /// Bytes written since construction.
    pub(crate) fn written(&self) -> usize {
        self.pos - self.start
    }
}
