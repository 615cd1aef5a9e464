//! Serializer/splitter and size calculator.
//!
//! Writing reverses the scanner+decoder: the forest is first serialized into
//! one contiguous buffer, recording a cut-point at the end of every shape
//! node's bytes. Each inter-cut segment then becomes physical records capped
//! at [`MAX_RECORD_DATA_SIZE`] payload bytes — the very first record of the
//! whole output carries the primary framing sid, every later record the
//! continuation sid — and each shape's bound metadata record is emitted
//! immediately after its segment, before the next segment starts. Remaining
//! forest bytes are flushed with the same chunking, then tail records follow
//! in insertion order.
//!
//! The size calculator replays the identical segment walk arithmetically.
//! Callers pre-size destination buffers from it, so the writer re-checks the
//! total at the end and surfaces any disagreement as a fatal
//! [`DrawingError::SizeMismatch`].

use crate::biff::{
    RecordSink, MAX_RECORD_DATA_SIZE, RECORD_CONTINUE, RECORD_DRAWING, RECORD_HEADER_BYTES,
};
use crate::drawing::binder::ShapeBinder;
use crate::drawing::node::{Node, NodeBody, NODE_HEADER_BYTES};
use crate::drawing::tail::TailRecordStore;
use crate::error::DrawingError;

/// Serialize the forest into one contiguous buffer, returning the buffer and
/// the ending offset of every shape node's bytes, in emission order.
pub(crate) fn serialize_forest(nodes: &[Node]) -> (Vec<u8>, Vec<usize>) {
    let mut buf = Vec::new();
    let mut cuts = Vec::new();
    for node in nodes {
        write_node(node, &mut buf, &mut cuts);
    }
    (buf, cuts)
}

fn write_node(node: &Node, buf: &mut Vec<u8>, cuts: &mut Vec<usize>) {
    buf.extend_from_slice(&node.options.to_le_bytes());
    buf.extend_from_slice(&node.record_id.to_le_bytes());
    let payload_len = (node.serialized_size() - NODE_HEADER_BYTES) as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    match &node.body {
        NodeBody::Leaf(data) => buf.extend_from_slice(data),
        NodeBody::Container(children) => {
            for child in children {
                write_node(child, buf, cuts);
            }
        }
    }
    if node.is_shape_bearing() {
        cuts.push(buf.len());
    }
}

/// Arithmetic replay of [`serialize_forest`]: raw forest length and shape
/// cut-points, with no byte writing.
pub(crate) fn plan_layout(nodes: &[Node]) -> (usize, Vec<usize>) {
    let mut cuts = Vec::new();
    let mut pos = 0usize;
    for node in nodes {
        pos = layout_node(node, pos, &mut cuts);
    }
    (pos, cuts)
}

fn layout_node(node: &Node, pos: usize, cuts: &mut Vec<usize>) -> usize {
    let mut end = pos + NODE_HEADER_BYTES;
    match &node.body {
        NodeBody::Leaf(data) => end += data.len(),
        NodeBody::Container(children) => {
            for child in children {
                end = layout_node(child, end, cuts);
            }
        }
    }
    if node.is_shape_bearing() {
        cuts.push(end);
    }
    end
}

/// Number of physical framing/continuation records the splitter emits for a
/// forest of `raw_len` bytes with the given cut-points.
fn framing_record_count(raw_len: usize, cuts: &[usize]) -> usize {
    let mut count = 0usize;
    let mut prev = 0usize;
    for &cut in cuts {
        count += (cut - prev).div_ceil(MAX_RECORD_DATA_SIZE);
        prev = cut;
    }
    if prev < raw_len {
        count += (raw_len - prev).div_ceil(MAX_RECORD_DATA_SIZE);
    }
    count
}

/// Exact serialized length of the aggregate: raw forest bytes, one header
/// per physical framing record, every metadata record, every tail record.
pub(crate) fn record_size(
    forest: &[Node],
    binder: &ShapeBinder,
    tails: &TailRecordStore,
) -> Result<usize, DrawingError> {
    let (raw_len, cuts) = plan_layout(forest);
    if cuts.len() != binder.len() {
        return Err(DrawingError::ShapeMetadataCountMismatch {
            shapes: cuts.len(),
            metadata: binder.len(),
        });
    }

    let framing_headers = framing_record_count(raw_len, &cuts) * RECORD_HEADER_BYTES;
    let metadata_size: usize = binder.iter().map(|(_, m)| m.record_size()).sum();
    let tail_size: usize = tails.iter().map(|n| n.record_size()).sum();
    Ok(raw_len + framing_headers + metadata_size + tail_size)
}

/// Re-frame the aggregate into `dst` starting at `offset`; returns bytes
/// written, which always equals [`record_size`].
pub(crate) fn serialize_aggregate(
    forest: &[Node],
    binder: &ShapeBinder,
    tails: &TailRecordStore,
    dst: &mut [u8],
    offset: usize,
) -> Result<usize, DrawingError> {
    // Also validates the shape/binding count up front.
    let planned = record_size(forest, binder, tails)?;

    let (buffer, cuts) = serialize_forest(forest);
    let mut sink = RecordSink::new(dst, offset)?;
    let mut first = true;
    let mut prev = 0usize;
    for (i, &cut) in cuts.iter().enumerate() {
        write_segment(&mut sink, &buffer[prev..cut], &mut first)?;
        prev = cut;
        // The count check above guarantees a binding at every cut-point.
        let metadata =
            binder
                .metadata_at(i)
                .ok_or(DrawingError::ShapeMetadataCountMismatch {
                    shapes: cuts.len(),
                    metadata: binder.len(),
                })?;
        metadata.serialize_into(&mut sink)?;
    }
    if prev < buffer.len() {
        write_segment(&mut sink, &buffer[prev..], &mut first)?;
    }
    for note in tails.iter() {
        note.serialize_into(&mut sink)?;
    }

    let written = sink.written();
    if written != planned {
        return Err(DrawingError::SizeMismatch { planned, written });
    }
    Ok(written)
}

/// Emit one segment as records capped at the physical payload maximum. Only
/// the first record of the whole output uses the primary framing sid.
fn write_segment(
    sink: &mut RecordSink<'_>,
    segment: &[u8],
    first: &mut bool,
) -> Result<(), DrawingError> {
    for chunk in segment.chunks(MAX_RECORD_DATA_SIZE) {
        let sid = if *first { RECORD_DRAWING } else { RECORD_CONTINUE };
        *first = false;
        sink.write_record(sid, chunk)?;
    }
    Ok(())
}
