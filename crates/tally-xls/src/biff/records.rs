//! Typed physical records of the drawing layer.
//!
//! The outer record-stream reader hands the aggregate an ordered sequence of
//! these records and later consumes the records the aggregate emits. Beyond
//! classification, payloads stay opaque: the aggregate re-serializes `Obj`,
//! `TxO`, and `Note` payloads verbatim, so nothing here decodes subrecord
//! contents except the two accessors the aggregate needs — the `ftCmo`
//! object id inside an `Obj` record and the shape id inside a `Note` record.

use crate::biff::{RecordSink, RECORD_CONTINUE, RECORD_DRAWING, RECORD_HEADER_BYTES, RECORD_NOTE, RECORD_OBJ, RECORD_TXO};
use crate::error::DrawingError;

// Obj subrecord ids. Only `ftCmo` is inspected, for the object id that links
// a shape's Obj record to its Note record. See [MS-XLS] 2.5.143.
const OBJ_SUBRECORD_FT_CMO: u16 = 0x0015;

// Note payload layout [MS-XLS 2.4.179]: row (2), col (2), flags (2),
// object id (2), author string.
const NOTE_OBJECT_ID_OFFSET: usize = 6;

/// Payload of a primary framing (`MsoDrawing`) record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingRecord {
    data: Vec<u8>,
}

impl DrawingRecord {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Payload of a `Continue` record trailing a framing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinueRecord {
    data: Vec<u8>,
}

impl ContinueRecord {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// An `Obj` record: non-geometric metadata for one shape, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjRecord {
    data: Vec<u8>,
}

impl ObjRecord {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn record_size(&self) -> usize {
        RECORD_HEADER_BYTES + self.data.len()
    }

    /// The object id from the `ftCmo` subrecord, when present.
    ///
    /// Cell notes link their `Note` record to a shape through this id, so a
    /// malformed subrecord list simply yields `None` rather than an error.
    pub fn object_id(&self) -> Option<u16> {
        let data = &self.data;
        let mut idx = 0usize;
        while idx + 4 <= data.len() {
            let ft = u16::from_le_bytes([data[idx], data[idx + 1]]);
            let cb = u16::from_le_bytes([data[idx + 2], data[idx + 3]]) as usize;
            idx += 4;
            let sub = data.get(idx..idx.checked_add(cb)?)?;
            if ft == OBJ_SUBRECORD_FT_CMO {
                // ftCmo: ot (2) + id (2) + ...
                let id = sub.get(2..4)?;
                return Some(u16::from_le_bytes([id[0], id[1]]));
            }
            idx += cb;
        }
        None
    }

    pub(crate) fn serialize_into(&self, sink: &mut RecordSink<'_>) -> Result<(), DrawingError> {
        sink.write_record(RECORD_OBJ, &self.data)
    }
}

/// A `TxO` record: text metadata for one textbox shape, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextObjectRecord {
    data: Vec<u8>,
}

impl TextObjectRecord {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn record_size(&self) -> usize {
        RECORD_HEADER_BYTES + self.data.len()
    }

    pub(crate) fn serialize_into(&self, sink: &mut RecordSink<'_>) -> Result<(), DrawingError> {
        sink.write_record(RECORD_TXO, &self.data)
    }
}

/// A `Note` record: one cell note, serialized after all framed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    data: Vec<u8>,
}

impl NoteRecord {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn record_size(&self) -> usize {
        RECORD_HEADER_BYTES + self.data.len()
    }

    /// The id of the drawing object this note is attached to.
    ///
    /// Best-effort: a payload too short to carry the field reads as 0.
    pub fn shape_id(&self) -> u16 {
        self.data
            .get(NOTE_OBJECT_ID_OFFSET..NOTE_OBJECT_ID_OFFSET + 2)
            .map(|v| u16::from_le_bytes([v[0], v[1]]))
            .unwrap_or(0)
    }

    pub(crate) fn serialize_into(&self, sink: &mut RecordSink<'_>) -> Result<(), DrawingError> {
        sink.write_record(RECORD_NOTE, &self.data)
    }
}

/// The metadata record bound to one shape node: an `Obj` record for plain
/// shapes, a `TxO` record for textboxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataRecord {
    Obj(ObjRecord),
    TextObject(TextObjectRecord),
}

impl MetadataRecord {
    pub fn sid(&self) -> u16 {
        match self {
            MetadataRecord::Obj(_) => RECORD_OBJ,
            MetadataRecord::TextObject(_) => RECORD_TXO,
        }
    }

    pub fn record_size(&self) -> usize {
        match self {
            MetadataRecord::Obj(r) => r.record_size(),
            MetadataRecord::TextObject(r) => r.record_size(),
        }
    }

    /// The embedded `ftCmo` object id; `None` for textbox metadata.
    pub fn object_id(&self) -> Option<u16> {
        match self {
            MetadataRecord::Obj(r) => r.object_id(),
            MetadataRecord::TextObject(_) => None,
        }
    }

    pub(crate) fn serialize_into(&self, sink: &mut RecordSink<'_>) -> Result<(), DrawingError> {
        match self {
            MetadataRecord::Obj(r) => r.serialize_into(sink),
            MetadataRecord::TextObject(r) => r.serialize_into(sink),
        }
    }
}

/// A worksheet record as handed over by the outer record-stream reader.
///
/// Only the drawing-layer kinds are distinguished; anything else is
/// `Unknown` and terminates the aggregate's scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRecord {
    Drawing(DrawingRecord),
    Continue(ContinueRecord),
    Obj(ObjRecord),
    TextObject(TextObjectRecord),
    Note(NoteRecord),
    Unknown { sid: u16, data: Vec<u8> },
}

impl SheetRecord {
    /// Classify a physical record by sid.
    pub fn classify(sid: u16, data: Vec<u8>) -> Self {
        match sid {
            RECORD_DRAWING => SheetRecord::Drawing(DrawingRecord::new(data)),
            RECORD_CONTINUE => SheetRecord::Continue(ContinueRecord::new(data)),
            RECORD_OBJ => SheetRecord::Obj(ObjRecord::new(data)),
            RECORD_TXO => SheetRecord::TextObject(TextObjectRecord::new(data)),
            RECORD_NOTE => SheetRecord::Note(NoteRecord::new(data)),
            _ => SheetRecord::Unknown { sid, data },
        }
    }

    pub fn sid(&self) -> u16 {
        match self {
            SheetRecord::Drawing(_) => RECORD_DRAWING,
            SheetRecord::Continue(_) => RECORD_CONTINUE,
            SheetRecord::Obj(_) => RECORD_OBJ,
            SheetRecord::TextObject(_) => RECORD_TXO,
            SheetRecord::Note(_) => RECORD_NOTE,
            SheetRecord::Unknown { sid, .. } => *sid,
        }
    }
}
