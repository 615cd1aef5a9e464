//! The worksheet drawing-layer aggregation codec.
//!
//! BIFF8 sheets persist their office-art tree in a physical layout that is
//! awkward on purpose: node bytes are framed by an `MsoDrawing` record plus
//! `Continue` records capped at 8224 payload bytes, the stream restarts a
//! record after every shape so its `Obj`/`TxO` metadata can be spliced in,
//! and `Note` records trail the whole block. This module reassembles that
//! layout into a [`DrawingAggregate`] and re-frames it byte-exactly:
//!
//! - [`scanner`] pulls the drawing prefix out of the sheet's record list,
//! - [`decode`] rebuilds the node forest from the accumulated bytes,
//! - [`binder`] pairs shape nodes with their metadata records by position,
//! - [`serialize`] re-splits the forest and re-interleaves metadata, with an
//!   independent size calculation the writer must agree with,
//! - [`tail`] keeps note records in insertion order for the block's tail.

mod aggregate;
mod binder;
mod decode;
mod node;
mod scanner;
mod serialize;
mod tail;


pub use aggregate::DrawingAggregate;
pub use binder::{ShapeBinder, ShapeKey};
pub use node::{
    is_container_id, Node, NodeBody, CLIENT_DATA, CLIENT_TEXTBOX, DRAWING_CONTAINER,
    DRAWING_DESCRIPTOR, GROUP_DESCRIPTOR, NODE_HEADER_BYTES, SHAPE_CONTAINER, SHAPE_DESCRIPTOR,
    SHAPE_FLAG_GROUP, SHAPE_FLAG_PATRIARCH, SHAPE_GROUP_CONTAINER,
};
pub use tail::TailRecordStore;
