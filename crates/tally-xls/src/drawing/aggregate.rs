//! The drawing aggregate: one sheet's drawing layer, reassembled.
//!
//! Producers serialize a sheet's office-art tree *across* the framing
//! records: logically contiguous node bytes are interleaved with the per-shape
//! `Obj`/`TxO` records and split at the physical payload cap, with `Note`
//! records trailing the block. The aggregate collapses that prefix of the
//! record list into one owned value — node forest, shape bindings, tail
//! notes — that the sheet model can mutate and later re-frame byte-exactly.

use log::debug;

use crate::biff::records::{MetadataRecord, NoteRecord, ObjRecord, SheetRecord};
use crate::drawing::binder::{ShapeBinder, ShapeKey};
use crate::drawing::decode::decode_forest;
use crate::drawing::node::{
    count_shapes, Node, NodeBody, DRAWING_CONTAINER, DRAWING_DESCRIPTOR, GROUP_DESCRIPTOR,
    SHAPE_CONTAINER, SHAPE_DESCRIPTOR, SHAPE_FLAG_GROUP, SHAPE_FLAG_PATRIARCH,
    SHAPE_GROUP_CONTAINER,
};
use crate::drawing::scanner::scan_drawing_block;
use crate::drawing::serialize::{record_size, serialize_aggregate};
use crate::drawing::tail::TailRecordStore;
use crate::error::DrawingError;

/// Owns a sheet's drawing-layer state: the node forest (normally one drawing
/// container), the ordered shape → metadata bindings, and the tail notes.
///
/// Not internally synchronized; wrap in external locking for shared use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingAggregate {
    forest: Vec<Node>,
    binder: ShapeBinder,
    tails: TailRecordStore,
}

impl DrawingAggregate {
    /// A fresh aggregate carrying the mandatory skeleton: a drawing
    /// container holding the drawing descriptor and a shape-group container
    /// whose first shape container marks the sheet's root (patriarch) group.
    /// The drawing id and patriarch shape id are placeholders; the owning
    /// sheet assigns real ids via [`Self::set_drawing_group_id`] and
    /// [`Self::set_patriarch_shape_id`].
    pub fn new() -> Self {
        let mut descriptor = Vec::with_capacity(8);
        descriptor.extend_from_slice(&0u32.to_le_bytes()); // shape count
        descriptor.extend_from_slice(&1024u32.to_le_bytes()); // last shape id

        let mut bounds = Vec::with_capacity(16);
        for v in [0i32, 0, 1023, 255] {
            bounds.extend_from_slice(&v.to_le_bytes());
        }

        let mut patriarch = Vec::with_capacity(8);
        patriarch.extend_from_slice(&(-1i32).to_le_bytes()); // shape id, assigned later
        patriarch.extend_from_slice(&(SHAPE_FLAG_GROUP | SHAPE_FLAG_PATRIARCH).to_le_bytes());

        let shape_container = Node::container(
            SHAPE_CONTAINER,
            0x000F,
            vec![
                Node::leaf(GROUP_DESCRIPTOR, 0x0001, bounds),
                Node::leaf(SHAPE_DESCRIPTOR, 0x0002, patriarch),
            ],
        );
        let group_container = Node::container(SHAPE_GROUP_CONTAINER, 0x000F, vec![shape_container]);
        let drawing_container = Node::container(
            DRAWING_CONTAINER,
            0x000F,
            vec![
                Node::leaf(DRAWING_DESCRIPTOR, 1u16 << 4, descriptor),
                group_container,
            ],
        );

        Self {
            forest: vec![drawing_container],
            binder: ShapeBinder::default(),
            tails: TailRecordStore::default(),
        }
    }

    /// An aggregate with no forest at all (used when the caller will adopt a
    /// decoded tree wholesale).
    pub fn empty() -> Self {
        Self {
            forest: Vec::new(),
            binder: ShapeBinder::default(),
            tails: TailRecordStore::default(),
        }
    }

    /// Collapse the drawing block starting at `records[start]` into an
    /// aggregate. Returns the aggregate and the number of records consumed,
    /// so the caller can splice them out and substitute the aggregate.
    ///
    /// Fails closed on corrupt node length fields and when the number of
    /// discovered shape nodes differs from the number of scanned `Obj`/`TxO`
    /// records — neither side is silently truncated.
    pub fn from_records(
        records: &[SheetRecord],
        start: usize,
    ) -> Result<(Self, usize), DrawingError> {
        let block = scan_drawing_block(records, start);
        let forest = decode_forest(&block.buffer)?;

        let shapes = count_shapes(&forest);
        if shapes != block.metadata.len() {
            return Err(DrawingError::ShapeMetadataCountMismatch {
                shapes,
                metadata: block.metadata.len(),
            });
        }

        let mut binder = ShapeBinder::default();
        for metadata in block.metadata {
            binder.bind(metadata);
        }
        let mut tails = TailRecordStore::default();
        for note in block.tails {
            tails.insert(note);
        }

        debug!(
            "aggregated {} drawing bytes into {} node(s) ({} shapes, {} tail records), consumed {} records",
            block.buffer.len(),
            forest.len(),
            shapes,
            tails.len(),
            block.consumed
        );

        Ok((
            Self {
                forest,
                binder,
                tails,
            },
            block.consumed,
        ))
    }

    /// Exact serialized length. Stable across calls while the aggregate is
    /// unmutated, and always equal to what [`Self::serialize_into`] writes.
    pub fn record_size(&self) -> Result<usize, DrawingError> {
        record_size(&self.forest, &self.binder, &self.tails)
    }

    /// Re-frame the aggregate into `dst` starting at `offset`; returns bytes
    /// written.
    pub fn serialize_into(&self, dst: &mut [u8], offset: usize) -> Result<usize, DrawingError> {
        serialize_aggregate(&self.forest, &self.binder, &self.tails, dst, offset)
    }

    /// Serialize into a freshly allocated buffer pre-sized from
    /// [`Self::record_size`].
    pub fn to_record_bytes(&self) -> Result<Vec<u8>, DrawingError> {
        let size = self.record_size()?;
        let mut out = vec![0u8; size];
        let written = self.serialize_into(&mut out, 0)?;
        debug_assert_eq!(written, size);
        Ok(out)
    }

    pub fn forest(&self) -> &[Node] {
        &self.forest
    }

    /// Direct forest access for the higher-level shape owner. Any shape
    /// nodes added or removed this way must be matched by binder edits, or
    /// the next serialization fails with a count mismatch.
    pub fn forest_mut(&mut self) -> &mut Vec<Node> {
        &mut self.forest
    }

    /// Keys of all bound shapes, in forest (pre-order) order.
    pub fn shape_keys(&self) -> impl Iterator<Item = ShapeKey> + '_ {
        self.binder.keys()
    }

    /// Metadata bound to a shape, or `None` when nothing is bound.
    pub fn metadata_for(&self, key: ShapeKey) -> Option<&MetadataRecord> {
        self.binder.metadata_for(key)
    }

    /// Append a shape subtree (containing exactly one client-data or textbox
    /// node) to the shape-group container and bind its metadata. The new
    /// binding goes to the end, matching the subtree's pre-order position.
    pub fn append_shape(
        &mut self,
        shape: Node,
        metadata: MetadataRecord,
    ) -> Result<ShapeKey, DrawingError> {
        let found = count_shapes(std::slice::from_ref(&shape));
        if found != 1 {
            return Err(DrawingError::SubtreeShapeCount { found });
        }

        let mut shapes_before = 0usize;
        let mut path = Vec::new();
        if !group_container_path(&self.forest, &mut shapes_before, &mut path) {
            return Err(DrawingError::MissingShapeGroupContainer);
        }
        let group = node_at_path_mut(&mut self.forest, &path)
            .ok_or(DrawingError::MissingShapeGroupContainer)?;
        let children = group
            .children_mut()
            .ok_or(DrawingError::MissingShapeGroupContainer)?;
        children.push(shape);

        Ok(self.binder.bind(metadata))
    }

    /// Detach the shape-group child holding the key'd shape and drop every
    /// binding its subtree covers. Returns the detached subtree and the
    /// removed bindings (normally exactly one).
    pub fn remove_shape(
        &mut self,
        key: ShapeKey,
    ) -> Result<(Node, Vec<(ShapeKey, MetadataRecord)>), DrawingError> {
        let ordinal = self
            .binder
            .index_of(key)
            .ok_or(DrawingError::ShapeNotFound { key })?;

        let mut shapes_before = 0usize;
        let mut path = Vec::new();
        if !group_container_path(&self.forest, &mut shapes_before, &mut path) {
            return Err(DrawingError::MissingShapeGroupContainer);
        }
        let group = node_at_path_mut(&mut self.forest, &path)
            .ok_or(DrawingError::MissingShapeGroupContainer)?;
        let children = group
            .children_mut()
            .ok_or(DrawingError::MissingShapeGroupContainer)?;

        // Find the direct child whose subtree covers the binding's ordinal.
        let mut first = shapes_before;
        let mut target = None;
        for (j, child) in children.iter().enumerate() {
            let n = count_shapes(std::slice::from_ref(child));
            if n > 0 && ordinal >= first && ordinal < first + n {
                target = Some((j, n));
                break;
            }
            first += n;
        }
        let (j, n) = target.ok_or(DrawingError::ShapeNotFound { key })?;

        let node = children.remove(j);
        let removed = self.binder.unbind_range(first, n);
        Ok((node, removed))
    }

    /// Rewrite the drawing descriptor's options to carry the sheet's drawing
    /// id. No-op when the skeleton node is absent.
    pub fn set_drawing_group_id(&mut self, drawing_id: u16) {
        if let Some(dg) = self
            .drawing_container_mut()
            .and_then(|c| c.child_by_record_id_mut(DRAWING_DESCRIPTOR))
        {
            dg.options = drawing_id << 4;
        }
    }

    /// Rewrite the patriarch shape-descriptor's shape id. No-op when the
    /// skeleton path is absent.
    pub fn set_patriarch_shape_id(&mut self, shape_id: i32) {
        let Some(container) = self.drawing_container_mut() else {
            return;
        };
        let Some(group) = container.child_by_record_id_mut(SHAPE_GROUP_CONTAINER) else {
            return;
        };
        let Some(first_shape) = group.children_mut().and_then(|c| c.first_mut()) else {
            return;
        };
        let Some(sp) = first_shape.child_by_record_id_mut(SHAPE_DESCRIPTOR) else {
            return;
        };
        if let NodeBody::Leaf(data) = &mut sp.body {
            if let Some(slot) = data.get_mut(0..4) {
                slot.copy_from_slice(&shape_id.to_le_bytes());
            }
        }
    }

    pub fn add_tail_record(&mut self, note: NoteRecord) {
        self.tails.insert(note);
    }

    pub fn remove_tail_record(&mut self, id: u16) -> Option<NoteRecord> {
        self.tails.remove(id)
    }

    pub fn tail_record(&self, id: u16) -> Option<&NoteRecord> {
        self.tails.get(id)
    }

    /// Tail notes in insertion (serialization) order.
    pub fn tail_records(&self) -> impl Iterator<Item = &NoteRecord> + '_ {
        self.tails.iter()
    }

    /// The note referenced by an `Obj` record's embedded object id, if any.
    pub fn note_for_obj(&self, obj: &ObjRecord) -> Option<&NoteRecord> {
        self.tails.get(obj.object_id()?)
    }

    fn drawing_container_mut(&mut self) -> Option<&mut Node> {
        self.forest
            .iter_mut()
            .find(|n| n.record_id == DRAWING_CONTAINER)
    }
}

impl Default for DrawingAggregate {
    fn default() -> Self {
        Self::new()
    }
}

/// Locate the shape-group container in pre-order, counting shape nodes
/// encountered before it. Pushes the container's index path into `path`.
fn group_container_path(nodes: &[Node], shapes_before: &mut usize, path: &mut Vec<usize>) -> bool {
    for (i, node) in nodes.iter().enumerate() {
        if node.record_id == SHAPE_GROUP_CONTAINER && node.is_container() {
            path.push(i);
            return true;
        }
        if node.is_shape_bearing() {
            *shapes_before += 1;
        }
        if let NodeBody::Container(children) = &node.body {
            path.push(i);
            if group_container_path(children, shapes_before, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn node_at_path_mut<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Node> {
    let (&first, rest) = path.split_first()?;
    let node = nodes.get_mut(first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match &mut node.body {
        NodeBody::Container(children) => node_at_path_mut(children, rest),
        NodeBody::Leaf(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::biff::records::TextObjectRecord;
    use crate::biff::RECORD_HEADER_BYTES;
    use crate::drawing::node::CLIENT_DATA;
    use crate::drawing::node::CLIENT_TEXTBOX;
    use crate::drawing::serialize::serialize_forest;

    fn obj_with_ft_cmo(object_id: u16, marker: u8) -> ObjRecord {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0x0015u16.to_le_bytes()); // ftCmo
        payload.extend_from_slice(&18u16.to_le_bytes());
        payload.extend_from_slice(&0u16.to_le_bytes()); // ot
        payload.extend_from_slice(&object_id.to_le_bytes());
        payload.extend_from_slice(&[marker; 14]);
        ObjRecord::new(payload)
    }

    fn obj_meta(marker: u8) -> MetadataRecord {
        MetadataRecord::Obj(ObjRecord::new(vec![marker; 6]))
    }

    fn txo_meta(marker: u8) -> MetadataRecord {
        MetadataRecord::TextObject(TextObjectRecord::new(vec![marker; 10]))
    }

    fn note(shape_id: u16, marker: u8) -> NoteRecord {
        let mut data = vec![0u8; 8];
        data[6..8].copy_from_slice(&shape_id.to_le_bytes());
        data.push(marker);
        NoteRecord::new(data)
    }

    /// A realistic shape subtree: shape container wrapping a descriptor and
    /// a client-data leaf.
    fn client_data_shape(shape_id: i32) -> Node {
        let mut sp = Vec::with_capacity(8);
        sp.extend_from_slice(&shape_id.to_le_bytes());
        sp.extend_from_slice(&0x0A00u32.to_le_bytes()); // has-anchor | has-shape-type
        Node::container(
            SHAPE_CONTAINER,
            0x000F,
            vec![
                Node::leaf(SHAPE_DESCRIPTOR, 0x0002, sp),
                Node::leaf(CLIENT_DATA, 0, Vec::new()),
            ],
        )
    }

    fn textbox_shape(shape_id: i32) -> Node {
        let mut sp = Vec::with_capacity(8);
        sp.extend_from_slice(&shape_id.to_le_bytes());
        sp.extend_from_slice(&0x0A00u32.to_le_bytes());
        Node::container(
            SHAPE_CONTAINER,
            0x000F,
            vec![
                Node::leaf(SHAPE_DESCRIPTOR, 0x0002, sp),
                Node::leaf(CLIENT_TEXTBOX, 0, Vec::new()),
            ],
        )
    }

    /// Split serialized aggregate output back into typed sheet records, the
    /// way the outer record-stream reader would hand them back.
    fn records_from_bytes(bytes: &[u8]) -> Vec<SheetRecord> {
        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos < bytes.len() {
            let sid = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
            let len = u16::from_le_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
            pos += RECORD_HEADER_BYTES;
            out.push(SheetRecord::classify(sid, bytes[pos..pos + len].to_vec()));
            pos += len;
        }
        out
    }

    fn roundtrip(agg: &DrawingAggregate) -> DrawingAggregate {
        let bytes = agg.to_record_bytes().unwrap();
        let records = records_from_bytes(&bytes);
        let (decoded, consumed) = DrawingAggregate::from_records(&records, 0).unwrap();
        assert_eq!(consumed, records.len());
        decoded
    }

    #[test]
    fn skeleton_has_patriarch_shape_tree() {
        let agg = DrawingAggregate::new();
        assert_eq!(agg.forest().len(), 1);
        let dg = &agg.forest()[0];
        assert_eq!(dg.record_id, DRAWING_CONTAINER);
        assert_eq!(dg.options, 0x000F);
        assert_eq!(dg.children().len(), 2);

        let descriptor = &dg.children()[0];
        assert_eq!(descriptor.record_id, DRAWING_DESCRIPTOR);
        assert_eq!(descriptor.options, 0x0010);

        let group = &dg.children()[1];
        assert_eq!(group.record_id, SHAPE_GROUP_CONTAINER);
        let shape = &group.children()[0];
        assert_eq!(shape.record_id, SHAPE_CONTAINER);
        assert_eq!(shape.children()[0].record_id, GROUP_DESCRIPTOR);
        let sp = &shape.children()[1];
        assert_eq!(sp.record_id, SHAPE_DESCRIPTOR);
        let NodeBody::Leaf(data) = &sp.body else {
            panic!("shape descriptor must be a leaf");
        };
        assert_eq!(&data[0..4], &(-1i32).to_le_bytes());
        assert_eq!(
            &data[4..8],
            &(SHAPE_FLAG_GROUP | SHAPE_FLAG_PATRIARCH).to_le_bytes()
        );
        // The skeleton carries no shapes and no bindings.
        assert_eq!(count_shapes(agg.forest()), 0);
        assert_eq!(agg.shape_keys().count(), 0);
    }

    #[test]
    fn empty_aggregate_serializes_to_its_record_size() {
        let agg = DrawingAggregate::new();
        let size = agg.record_size().unwrap();
        let bytes = agg.to_record_bytes().unwrap();
        assert_eq!(bytes.len(), size);
        // Skeleton fits one framing record: raw forest + one header.
        let raw: usize = agg.forest().iter().map(Node::serialized_size).sum();
        assert_eq!(size, raw + RECORD_HEADER_BYTES);
        assert_eq!(roundtrip(&agg), agg);
    }

    #[test]
    fn record_size_is_stable_without_mutation() {
        let mut agg = DrawingAggregate::new();
        agg.append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap();
        let first = agg.record_size().unwrap();
        assert_eq!(agg.record_size().unwrap(), first);
        assert_eq!(agg.to_record_bytes().unwrap().len(), first);
        assert_eq!(agg.record_size().unwrap(), first);
    }

    #[test]
    fn roundtrips_with_one_shape() {
        let mut agg = DrawingAggregate::new();
        agg.append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap();
        let decoded = roundtrip(&agg);
        assert_eq!(decoded.forest(), agg.forest());
        assert_eq!(decoded.shape_keys().count(), 1);
        let key = decoded.shape_keys().next().unwrap();
        assert_eq!(decoded.metadata_for(key), Some(&obj_meta(1)));
    }

    #[test]
    fn roundtrips_with_mixed_shapes_and_tails() {
        let mut agg = DrawingAggregate::new();
        agg.append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap();
        agg.append_shape(textbox_shape(1026), txo_meta(2)).unwrap();
        agg.append_shape(client_data_shape(1027), obj_meta(3))
            .unwrap();
        agg.add_tail_record(note(5, 0xA));
        agg.add_tail_record(note(2, 0xB));

        let decoded = roundtrip(&agg);
        assert_eq!(decoded.forest(), agg.forest());
        let metadata: Vec<&MetadataRecord> = decoded
            .shape_keys()
            .map(|k| decoded.metadata_for(k).unwrap())
            .collect();
        assert_eq!(metadata, vec![&obj_meta(1), &txo_meta(2), &obj_meta(3)]);
        let tail_ids: Vec<u16> = decoded.tail_records().map(NoteRecord::shape_id).collect();
        assert_eq!(tail_ids, vec![5, 2]);
    }

    #[test]
    fn tail_records_serialize_in_insertion_order() {
        let mut agg = DrawingAggregate::new();
        agg.add_tail_record(note(5, 0));
        agg.add_tail_record(note(2, 0));
        agg.add_tail_record(note(9, 0));

        let bytes = agg.to_record_bytes().unwrap();
        let records = records_from_bytes(&bytes);
        let tail_ids: Vec<u16> = records
            .iter()
            .filter_map(|r| match r {
                SheetRecord::Note(n) => Some(n.shape_id()),
                _ => None,
            })
            .collect();
        assert_eq!(tail_ids, vec![5, 2, 9]);
    }

    #[test]
    fn removing_middle_shape_keeps_neighbors_paired() {
        let mut agg = DrawingAggregate::new();
        let a = agg
            .append_shape(client_data_shape(1025), obj_meta(0xA))
            .unwrap();
        let b = agg
            .append_shape(client_data_shape(1026), obj_meta(0xB))
            .unwrap();
        let c = agg
            .append_shape(client_data_shape(1027), obj_meta(0xC))
            .unwrap();

        let (node, removed) = agg.remove_shape(b).unwrap();
        assert_eq!(node, client_data_shape(1026));
        assert_eq!(removed, vec![(b, obj_meta(0xB))]);

        assert_eq!(agg.metadata_for(a), Some(&obj_meta(0xA)));
        assert_eq!(agg.metadata_for(b), None);
        assert_eq!(agg.metadata_for(c), Some(&obj_meta(0xC)));

        // The serialized pairing matches: shapes in order A, C with their
        // original metadata.
        let decoded = roundtrip(&agg);
        let metadata: Vec<&MetadataRecord> = decoded
            .shape_keys()
            .map(|k| decoded.metadata_for(k).unwrap())
            .collect();
        assert_eq!(metadata, vec![&obj_meta(0xA), &obj_meta(0xC)]);
    }

    #[test]
    fn inserted_shape_binding_appends_at_end() {
        let mut agg = DrawingAggregate::new();
        agg.append_shape(client_data_shape(1025), obj_meta(0xA))
            .unwrap();
        let b = agg
            .append_shape(client_data_shape(1026), obj_meta(0xB))
            .unwrap();
        agg.remove_shape(b).unwrap();
        let d = agg
            .append_shape(client_data_shape(1028), obj_meta(0xD))
            .unwrap();

        let keys: Vec<ShapeKey> = agg.shape_keys().collect();
        assert_eq!(keys.last(), Some(&d));
        let decoded = roundtrip(&agg);
        let metadata: Vec<&MetadataRecord> = decoded
            .shape_keys()
            .map(|k| decoded.metadata_for(k).unwrap())
            .collect();
        assert_eq!(metadata, vec![&obj_meta(0xA), &obj_meta(0xD)]);
    }

    #[test]
    fn remove_shape_rejects_unknown_key() {
        let mut agg = DrawingAggregate::new();
        let a = agg
            .append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap();
        agg.remove_shape(a).unwrap();
        assert_eq!(
            agg.remove_shape(a).unwrap_err(),
            DrawingError::ShapeNotFound { key: a }
        );
    }

    #[test]
    fn append_shape_requires_exactly_one_shape_node() {
        let mut agg = DrawingAggregate::new();
        let err = agg
            .append_shape(
                Node::container(SHAPE_CONTAINER, 0x000F, Vec::new()),
                obj_meta(1),
            )
            .unwrap_err();
        assert_eq!(err, DrawingError::SubtreeShapeCount { found: 0 });

        let err = agg
            .append_shape(
                Node::container(
                    SHAPE_CONTAINER,
                    0x000F,
                    vec![
                        Node::leaf(CLIENT_DATA, 0, Vec::new()),
                        Node::leaf(CLIENT_DATA, 0, Vec::new()),
                    ],
                ),
                obj_meta(1),
            )
            .unwrap_err();
        assert_eq!(err, DrawingError::SubtreeShapeCount { found: 2 });
    }

    #[test]
    fn append_shape_requires_shape_group_container() {
        let mut agg = DrawingAggregate::empty();
        let err = agg
            .append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap_err();
        assert_eq!(err, DrawingError::MissingShapeGroupContainer);
    }

    #[test]
    fn from_records_rejects_more_metadata_than_shapes() {
        let mut agg = DrawingAggregate::new();
        agg.append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap();
        let (buffer, _) = serialize_forest(agg.forest());

        let records = vec![
            SheetRecord::classify(crate::biff::RECORD_DRAWING, buffer),
            SheetRecord::Obj(ObjRecord::new(vec![1])),
            SheetRecord::Obj(ObjRecord::new(vec![2])),
        ];
        let err = DrawingAggregate::from_records(&records, 0).unwrap_err();
        assert_eq!(
            err,
            DrawingError::ShapeMetadataCountMismatch {
                shapes: 1,
                metadata: 2
            }
        );
    }

    #[test]
    fn from_records_rejects_more_shapes_than_metadata() {
        let mut agg = DrawingAggregate::new();
        agg.append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap();
        agg.append_shape(client_data_shape(1026), obj_meta(2))
            .unwrap();
        let (buffer, _) = serialize_forest(agg.forest());

        let records = vec![
            SheetRecord::classify(crate::biff::RECORD_DRAWING, buffer),
            SheetRecord::Obj(ObjRecord::new(vec![1])),
        ];
        let err = DrawingAggregate::from_records(&records, 0).unwrap_err();
        assert_eq!(
            err,
            DrawingError::ShapeMetadataCountMismatch {
                shapes: 2,
                metadata: 1
            }
        );
    }

    #[test]
    fn from_records_fails_closed_on_truncated_buffer() {
        let mut agg = DrawingAggregate::new();
        agg.append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap();
        let (mut buffer, _) = serialize_forest(agg.forest());
        buffer.truncate(buffer.len() - 3);

        let records = vec![
            SheetRecord::classify(crate::biff::RECORD_DRAWING, buffer),
            SheetRecord::Obj(ObjRecord::new(vec![1])),
        ];
        let err = DrawingAggregate::from_records(&records, 0).unwrap_err();
        assert!(matches!(
            err,
            DrawingError::NodePayloadOutOfBounds { .. } | DrawingError::TruncatedNodeHeader { .. }
        ));
    }

    #[test]
    fn from_records_reports_consumed_for_splicing() {
        let mut agg = DrawingAggregate::new();
        agg.append_shape(client_data_shape(1025), obj_meta(1))
            .unwrap();
        let bytes = agg.to_record_bytes().unwrap();
        let mut records = records_from_bytes(&bytes);
        let drawing_records = records.len();
        records.push(SheetRecord::Unknown {
            sid: 0x023E,
            data: vec![0u8; 18],
        });

        let (_, consumed) = DrawingAggregate::from_records(&records, 0).unwrap();
        assert_eq!(consumed, drawing_records);
    }

    #[test]
    fn note_lookup_follows_obj_object_id() {
        let mut agg = DrawingAggregate::new();
        agg.add_tail_record(note(7, 0xA));
        agg.add_tail_record(note(3, 0xB));

        let obj = obj_with_ft_cmo(3, 0);
        assert_eq!(agg.note_for_obj(&obj), Some(&note(3, 0xB)));
        let unlinked = obj_with_ft_cmo(99, 0);
        assert_eq!(agg.note_for_obj(&unlinked), None);
        let no_cmo = ObjRecord::new(vec![0u8; 2]);
        assert_eq!(agg.note_for_obj(&no_cmo), None);
    }

    #[test]
    fn tail_remove_by_id() {
        let mut agg = DrawingAggregate::new();
        agg.add_tail_record(note(5, 0));
        agg.add_tail_record(note(2, 0));
        assert_eq!(agg.remove_tail_record(5), Some(note(5, 0)));
        assert_eq!(agg.tail_record(5), None);
        assert_eq!(agg.tail_records().count(), 1);
    }

    #[test]
    fn drawing_group_id_rewrites_descriptor_options() {
        let mut agg = DrawingAggregate::new();
        agg.set_drawing_group_id(3);
        let dg = &agg.forest()[0];
        assert_eq!(dg.children()[0].options, 3u16 << 4);

        // No-op on an aggregate without the skeleton.
        let mut bare = DrawingAggregate::empty();
        bare.set_drawing_group_id(3);
        assert!(bare.forest().is_empty());
    }

    #[test]
    fn patriarch_shape_id_rewrites_descriptor_payload() {
        let mut agg = DrawingAggregate::new();
        agg.set_patriarch_shape_id(1024);
        let dg = &agg.forest()[0];
        let sp = &dg.children()[1].children()[0].children()[1];
        assert_eq!(sp.record_id, SHAPE_DESCRIPTOR);
        let NodeBody::Leaf(data) = &sp.body else {
            panic!("shape descriptor must be a leaf");
        };
        assert_eq!(&data[0..4], &1024i32.to_le_bytes());
    }

    #[test]
    fn oversized_shape_splits_and_still_roundtrips() {
        let mut agg = DrawingAggregate::new();
        let big = Node::container(
            SHAPE_CONTAINER,
            0x000F,
            vec![Node::leaf(
                CLIENT_DATA,
                0,
                vec![0x5A; crate::biff::MAX_RECORD_DATA_SIZE + 100],
            )],
        );
        agg.append_shape(big, obj_meta(9)).unwrap();

        let bytes = agg.to_record_bytes().unwrap();
        let records = records_from_bytes(&bytes);
        let continuations = records
            .iter()
            .filter(|r| matches!(r, SheetRecord::Continue(_)))
            .count();
        assert!(continuations >= 1, "oversized segment must split");
        assert!(matches!(records[0], SheetRecord::Drawing(_)));

        let decoded = roundtrip(&agg);
        assert_eq!(decoded.forest(), agg.forest());
    }
}
