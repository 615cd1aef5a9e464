use thiserror::Error;

use crate::drawing::ShapeKey;

/// Errors surfaced by the drawing-layer aggregation codec.
///
/// Decoding is fail-closed: any of the decode variants means no aggregate was
/// built. The serialize-side variants indicate either a caller problem
/// (destination too small, binder out of sync with the forest) or an internal
/// consistency fault (`SizeMismatch`), which is always surfaced and never
/// silently corrected because callers pre-size buffers from
/// [`crate::drawing::DrawingAggregate::record_size`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawingError {
    #[error("truncated office-art node header at offset {offset} ({remaining} bytes remaining, need 8)")]
    TruncatedNodeHeader { offset: usize, remaining: usize },

    #[error("office-art node 0x{record_id:04X} at offset {offset} declares {declared} payload bytes (cap {cap})")]
    NodePayloadTooLarge {
        record_id: u16,
        offset: usize,
        declared: usize,
        cap: usize,
    },

    #[error("office-art node 0x{record_id:04X} at offset {offset} declares {declared} payload bytes but only {remaining} remain")]
    NodePayloadOutOfBounds {
        record_id: u16,
        offset: usize,
        declared: usize,
        remaining: usize,
    },

    #[error("office-art container 0x{record_id:04X} at offset {offset} nested deeper than {max_depth} levels")]
    NodeNestingTooDeep {
        record_id: u16,
        offset: usize,
        max_depth: usize,
    },

    #[error("office-art container 0x{record_id:04X} at offset {offset}: children overrun the declared {declared} payload bytes")]
    ContainerLengthMismatch {
        record_id: u16,
        offset: usize,
        declared: usize,
    },

    #[error("drawing block has {shapes} shape node(s) but {metadata} object record(s)")]
    ShapeMetadataCountMismatch { shapes: usize, metadata: usize },

    #[error("appended subtree must contain exactly one client-data or textbox node, found {found}")]
    SubtreeShapeCount { found: usize },

    #[error("drawing aggregate has no shape-group container to hold shapes")]
    MissingShapeGroupContainer,

    #[error("no shape is bound under {key:?}")]
    ShapeNotFound { key: ShapeKey },

    #[error("record 0x{sid:04X} payload of {len} bytes does not fit a 16-bit record length")]
    RecordPayloadOverflow { sid: u16, len: usize },

    #[error("destination buffer too small: need {needed} bytes, have {available}")]
    DestinationTooSmall { needed: usize, available: usize },

    #[error("drawing aggregate serialized {written} bytes but planned size is {planned}")]
    SizeMismatch { planned: usize, written: usize },
}
