//! Legacy Excel 97-2003 `.xls` (BIFF8) drawing-layer support for tally.
//!
//! The hard part of the `.xls` drawing layer is its framing: a sheet's
//! office-art node tree is serialized across `MsoDrawing`/`Continue` records
//! capped at 8224 payload bytes, interleaved with per-shape `Obj`/`TxO`
//! records and trailed by `Note` records. This crate reassembles that
//! physical layout into a [`DrawingAggregate`] — an owned node forest with
//! positional shape → metadata bindings and an insertion-ordered tail store —
//! and re-frames it byte-exactly on write.
//!
//! The outer record-stream reader/writer is out of scope: callers hand this
//! crate an ordered slice of typed [`SheetRecord`]s and a start index, and
//! get back the aggregate plus the number of records to splice out. All
//! decoding is fail-closed, with hard caps on declared node lengths and
//! nesting depth so hostile files are rejected before allocation.

pub mod biff;
pub mod drawing;
pub mod error;

pub use biff::records::{
    ContinueRecord, DrawingRecord, MetadataRecord, NoteRecord, ObjRecord, SheetRecord,
    TextObjectRecord,
};
pub use drawing::{DrawingAggregate, Node, NodeBody, ShapeBinder, ShapeKey, TailRecordStore};
pub use error::DrawingError;
