//! Record stream scanner.
//!
//! Consumes the drawing-layer prefix of the sheet's record list: framing and
//! continuation payloads accumulate into one byte buffer (the logical
//! office-art stream is split across them), `Obj`/`TxO` records collect into
//! an ordered metadata list, and `Note` records — which producers interleave
//! after the framed block — are set aside for the tail store. The first
//! record of any other kind ends the scan.

use crate::biff::records::{MetadataRecord, NoteRecord, SheetRecord};

/// Everything the scanner pulled out of the record list.
pub(crate) struct ScannedBlock {
    /// Concatenated framing + continuation payload bytes, in encounter order.
    pub buffer: Vec<u8>,
    /// `Obj`/`TxO` records, in encounter order.
    pub metadata: Vec<MetadataRecord>,
    /// `Note` records, in encounter order.
    pub tails: Vec<NoteRecord>,
    /// Number of entries consumed, so the caller can splice them out and
    /// substitute a single aggregate placeholder.
    pub consumed: usize,
}

/// Scan the drawing block starting at `start`. Never fails: an unrecognized
/// record simply ends the scan, and zero framing records yield an empty
/// buffer.
pub(crate) fn scan_drawing_block(records: &[SheetRecord], start: usize) -> ScannedBlock {
    let mut buffer = Vec::new();
    let mut metadata = Vec::new();
    let mut tails = Vec::new();
    let mut consumed = 0usize;

    for record in records.iter().skip(start) {
        match record {
            SheetRecord::Drawing(r) => buffer.extend_from_slice(r.data()),
            SheetRecord::Continue(r) => buffer.extend_from_slice(r.data()),
            SheetRecord::Obj(r) => metadata.push(MetadataRecord::Obj(r.clone())),
            SheetRecord::TextObject(r) => metadata.push(MetadataRecord::TextObject(r.clone())),
            SheetRecord::Note(r) => tails.push(r.clone()),
            SheetRecord::Unknown { .. } => break,
        }
        consumed += 1;
    }

    ScannedBlock {
        buffer,
        metadata,
        tails,
        consumed,
    }
}
