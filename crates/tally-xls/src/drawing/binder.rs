//! Shape–metadata binder.
//!
//! Shape nodes and their `Obj`/`TxO` records are paired positionally: the
//! i-th shape node of the forest (depth-first pre-order) owns the i-th
//! binding. The pairing is authored once — when a block is decoded or a
//! shape is appended — and only ever edited by position; it is never
//! re-derived from record contents. Keys are stable opaque handles into the
//! ordered entry list, so callers can hold on to a shape across relocations
//! of the node itself.

use crate::biff::records::MetadataRecord;

/// Stable handle for one shape binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeKey(u32);

/// Insertion-ordered shape → metadata bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeBinder {
    entries: Vec<(ShapeKey, MetadataRecord)>,
    next_key: u32,
}

impl ShapeBinder {
    /// Append a binding for a newly authored shape. New bindings always go
    /// to the end; the caller is responsible for placing the shape node so
    /// that forest order and binding order agree.
    pub fn bind(&mut self, metadata: MetadataRecord) -> ShapeKey {
        let key = ShapeKey(self.next_key);
        self.next_key += 1;
        self.entries.push((key, metadata));
        key
    }

    /// Remove the binding for a shape being deleted.
    pub fn unbind(&mut self, key: ShapeKey) -> Option<MetadataRecord> {
        let index = self.index_of(key)?;
        Some(self.entries.remove(index).1)
    }

    /// Remove `count` consecutive bindings starting at `start` (clamped to
    /// the entry list), in order.
    pub(crate) fn unbind_range(
        &mut self,
        start: usize,
        count: usize,
    ) -> Vec<(ShapeKey, MetadataRecord)> {
        let start = start.min(self.entries.len());
        let end = start.saturating_add(count).min(self.entries.len());
        self.entries.drain(start..end).collect()
    }

    /// Metadata for a shape, or `None` when nothing is bound — probing a
    /// shape without metadata is an expected caller pattern, not an error.
    pub fn metadata_for(&self, key: ShapeKey) -> Option<&MetadataRecord> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, m)| m)
    }

    pub fn index_of(&self, key: ShapeKey) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == key)
    }

    pub fn key_at(&self, index: usize) -> Option<ShapeKey> {
        self.entries.get(index).map(|(k, _)| *k)
    }

    pub fn metadata_at(&self, index: usize) -> Option<&MetadataRecord> {
        self.entries.get(index).map(|(_, m)| m)
    }

    pub fn keys(&self) -> impl Iterator<Item = ShapeKey> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShapeKey, &MetadataRecord)> + '_ {
        self.entries.iter().map(|(k, m)| (*k, m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
