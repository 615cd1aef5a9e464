//! Tree decoder: office-art byte buffer → node forest.
//!
//! Fail-closed: any corrupt length field aborts the whole decode and no
//! partial forest is returned.

use crate::drawing::node::{is_container_id, Node, NODE_HEADER_BYTES};
use crate::error::DrawingError;

// Hard caps against hostile length fields.
//
// A declared payload length is rejected before any allocation when it
// exceeds the remaining buffer or this ceiling, and container recursion is
// depth-bounded so a crafted buffer cannot exhaust the stack.
#[cfg(not(test))]
const MAX_NODE_PAYLOAD_BYTES: usize = 100_000_000;
// Keep unit tests fast and memory-efficient by using a much smaller cap.
#[cfg(test)]
const MAX_NODE_PAYLOAD_BYTES: usize = 64 * 1024;

const MAX_NODE_DEPTH: usize = 64;

/// Decode the whole buffer into a forest of top-level nodes (normally a
/// single drawing container).
pub(crate) fn decode_forest(buf: &[u8]) -> Result<Vec<Node>, DrawingError> {
    let mut nodes = Vec::new();
    let mut pos = 0usize;
    while pos < buf.len() {
        let (node, size) = decode_node(buf, pos, 0)?;
        nodes.push(node);
        pos += size;
    }
    Ok(nodes)
}

/// Decode one node at `offset`, returning it with its full serialized size.
fn decode_node(buf: &[u8], offset: usize, depth: usize) -> Result<(Node, usize), DrawingError> {
    let header = buf
        .get(offset..offset + NODE_HEADER_BYTES)
        .ok_or(DrawingError::TruncatedNodeHeader {
            offset,
            remaining: buf.len().saturating_sub(offset),
        })?;
    let options = u16::from_le_bytes([header[0], header[1]]);
    let record_id = u16::from_le_bytes([header[2], header[3]]);
    let declared = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

    if declared > MAX_NODE_PAYLOAD_BYTES {
        return Err(DrawingError::NodePayloadTooLarge {
            record_id,
            offset,
            declared,
            cap: MAX_NODE_PAYLOAD_BYTES,
        });
    }
    let payload_start = offset + NODE_HEADER_BYTES;
    let remaining = buf.len() - payload_start;
    if declared > remaining {
        return Err(DrawingError::NodePayloadOutOfBounds {
            record_id,
            offset,
            declared,
            remaining,
        });
    }

    if is_container_id(record_id) {
        if depth >= MAX_NODE_DEPTH {
            return Err(DrawingError::NodeNestingTooDeep {
                record_id,
                offset,
                max_depth: MAX_NODE_DEPTH,
            });
        }
        let end = payload_start + declared;
        let mut children = Vec::new();
        let mut pos = payload_start;
        while pos < end {
            let (child, size) = decode_node(buf, pos, depth + 1)?;
            pos += size;
            if pos > end {
                // The child's declared length runs past its container's.
                return Err(DrawingError::ContainerLengthMismatch {
                    record_id,
                    offset,
                    declared,
                });
            }
            children.push(child);
        }
        Ok((
            Node::container(record_id, options, children),
            NODE_HEADER_BYTES + declared,
        ))
    } else {
        let data = buf[payload_start..payload_start + declared].to_vec();
        Ok((
            Node::leaf(record_id, options, data),
            NODE_HEADER_BYTES + declared,
        ))
    }
}
