use crate::{
    core::{
        bounds::{rect_intersects, MapRect},
        geo::MapPoint,
    },
    MapError, Result,
};
use log::debug;
use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

/// Number of 32-bit words stored per node: id, offset, type, four bounds,
/// sibling and parent.
const WORDS_PER_NODE: u64 = 9;

/// Raw type tag meaning "match any type".
pub const ANY_TYPE: i32 = -1;

/// Type filter applied to query matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    Any,
    Exact(i32),
}

impl TypeFilter {
    fn matches(&self, node_type: i32) -> bool {
        match self {
            TypeFilter::Any => true,
            TypeFilter::Exact(t) => *t == node_type,
        }
    }
}

impl From<i32> for TypeFilter {
    fn from(raw: i32) -> Self {
        if raw == ANY_TYPE {
            TypeFilter::Any
        } else {
            TypeFilter::Exact(raw)
        }
    }
}

/// An immutable hierarchical spatial index stored as parallel arrays.
///
/// Slots are laid out in pre-order with slot 0 as the root. A node's first
/// child, if any, sits in the next slot; further children are reached through
/// sibling links, where 0 terminates the chain. Each node's bounds must cover
/// its descendants, which lets a query prune whole subtrees.
///
/// Built once from a big-endian blob (see [`StaticIndex::from_bytes`]) and
/// never mutated, so concurrent queries need no locking.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StaticIndex {
    ids: Vec<i32>,
    offsets: Vec<i32>,
    types: Vec<i32>,
    bounds: Vec<i32>,
    siblings: Vec<i32>,
    parents: Vec<i32>,
}

impl StaticIndex {
    /// Assembles an index from its arrays, applying the same link checks as
    /// [`StaticIndex::from_bytes`].
    pub fn from_parts(
        ids: Vec<i32>,
        offsets: Vec<i32>,
        types: Vec<i32>,
        bounds: Vec<i32>,
        siblings: Vec<i32>,
        parents: Vec<i32>,
    ) -> Result<Self> {
        let size = ids.len();
        if offsets.len() != size
            || types.len() != size
            || bounds.len() != size * 4
            || siblings.len() != size
            || parents.len() != size
        {
            return Err(MapError::CorruptFormat(format!(
                "array lengths do not agree with size {}",
                size
            )));
        }

        let index = Self {
            ids,
            offsets,
            types,
            bounds,
            siblings,
            parents,
        };
        index.validate_links()?;
        Ok(index)
    }

    /// Decodes the blob layout:
    ///
    /// ```text
    /// size:i32 ids[size] offsets[size] types[size] bounds[size*4] siblings[size] parents[size]
    /// ```
    ///
    /// All integers are big-endian i32. Fails with `Truncated` if the blob is
    /// shorter than the declared arrays and with `CorruptFormat` on a negative
    /// size or a slot link outside `[0, size)`. No partial index is returned.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WordReader::new(bytes);

        let size = reader.read_i32()?;
        if size < 0 {
            return Err(MapError::CorruptFormat(format!("negative size {}", size)));
        }

        let expected = 4 + WORDS_PER_NODE * 4 * size as u64;
        if (bytes.len() as u64) < expected {
            return Err(MapError::Truncated {
                expected: expected as usize,
                available: bytes.len(),
            });
        }

        let size = size as usize;
        let ids = reader.read_array(size)?;
        let offsets = reader.read_array(size)?;
        let types = reader.read_array(size)?;
        let bounds = reader.read_array(size * 4)?;
        let siblings = reader.read_array(size)?;
        let parents = reader.read_array(size)?;

        let index = Self::from_parts(ids, offsets, types, bounds, siblings, parents)?;
        debug!("Loaded static index with {} nodes", index.len());
        Ok(index)
    }

    /// Reads a whole blob from a stream and decodes it.
    pub fn load<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::load(std::io::BufReader::new(file))
    }

    /// Encodes the index into the blob layout read by [`StaticIndex::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.len() * WORDS_PER_NODE as usize * 4);
        out.extend_from_slice(&(self.len() as i32).to_be_bytes());
        for array in [
            &self.ids,
            &self.offsets,
            &self.types,
            &self.bounds,
            &self.siblings,
            &self.parents,
        ] {
            for value in array.iter() {
                out.extend_from_slice(&value.to_be_bytes());
            }
        }
        out
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    fn validate_links(&self) -> Result<()> {
        let size = self.len();
        for slot in 0..size {
            let sibling = self.siblings[slot];
            if sibling < 0 || sibling as usize >= size {
                return Err(MapError::CorruptFormat(format!(
                    "sibling {} of slot {} outside [0, {})",
                    sibling, slot, size
                )));
            }
            if sibling != 0 && sibling as usize <= slot {
                return Err(MapError::CorruptFormat(format!(
                    "sibling {} of slot {} does not point forward",
                    sibling, slot
                )));
            }

            let parent = self.parents[slot];
            if parent < 0 || parent as usize >= size {
                return Err(MapError::CorruptFormat(format!(
                    "parent {} of slot {} outside [0, {})",
                    parent, slot, size
                )));
            }
            if slot > 0 && parent as usize >= slot {
                return Err(MapError::CorruptFormat(format!(
                    "parent {} of slot {} does not precede it",
                    parent, slot
                )));
            }
        }
        Ok(())
    }

    /// Slots of all nodes intersecting `rect` and passing `filter`, in
    /// pre-order, at most `max_results` of them.
    pub fn query(&self, rect: &MapRect, filter: TypeFilter, max_results: usize) -> Vec<usize> {
        let mut results = Vec::new();
        self.query_into(rect, filter, &mut results, max_results);
        results
    }

    /// Appends matching slots to `results`, writing at most `max_results`.
    /// Returns the number written.
    pub fn query_into(
        &self,
        rect: &MapRect,
        filter: TypeFilter,
        results: &mut Vec<usize>,
        max_results: usize,
    ) -> usize {
        let start = results.len();
        self.traverse(rect, filter, Some(max_results), |slot| results.push(slot));
        results.len() - start
    }

    /// Number of matching slots, without a cap.
    pub fn count(&self, rect: &MapRect, filter: TypeFilter) -> usize {
        let mut matches = 0;
        self.traverse(rect, filter, None, |_| matches += 1);
        matches
    }

    /// Depth-first pre-order walk from the root. A node whose bounds miss
    /// `rect` is skipped together with its subtree; its siblings are still
    /// visited. Stops as soon as `limit` matches have been emitted.
    fn traverse<F: FnMut(usize)>(
        &self,
        rect: &MapRect,
        filter: TypeFilter,
        limit: Option<usize>,
        mut emit: F,
    ) {
        if self.is_empty() || limit == Some(0) {
            return;
        }

        let mut emitted = 0;
        let mut pending = vec![0_usize];

        while let Some(slot) = pending.pop() {
            // the root's sibling chain is not part of the tree
            if slot != 0 {
                let sibling = self.siblings[slot];
                if sibling != 0 {
                    pending.push(sibling as usize);
                }
            }

            let b = &self.bounds[slot * 4..slot * 4 + 4];
            if !rect_intersects(
                rect.min_x, rect.min_y, rect.max_x, rect.max_y, b[0], b[1], b[2], b[3],
            ) {
                continue;
            }

            if filter.matches(self.types[slot]) {
                emit(slot);
                emitted += 1;
                if Some(emitted) == limit {
                    return;
                }
            }

            if let Some(child) = self.first_child(slot) {
                pending.push(child);
            }
        }
    }

    fn first_child(&self, slot: usize) -> Option<usize> {
        let child = slot + 1;
        if child < self.len() && self.parents[child] as usize == slot {
            Some(child)
        } else {
            None
        }
    }

    /// Iterates the direct children of a slot.
    pub fn children(&self, slot: usize) -> Children<'_> {
        debug_assert!(slot < self.len(), "slot {} out of range", slot);
        Children {
            index: self,
            next: self.first_child(slot),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, slot: usize) -> i32 {
        debug_assert!(slot < self.len(), "slot {} out of range", slot);
        self.ids[slot]
    }

    /// Offset into the caller's secondary table.
    pub fn offset(&self, slot: usize) -> i32 {
        debug_assert!(slot < self.len(), "slot {} out of range", slot);
        self.offsets[slot]
    }

    pub fn node_type(&self, slot: usize) -> i32 {
        debug_assert!(slot < self.len(), "slot {} out of range", slot);
        self.types[slot]
    }

    pub fn bounds(&self, slot: usize) -> MapRect {
        debug_assert!(slot < self.len(), "slot {} out of range", slot);
        let b = &self.bounds[slot * 4..slot * 4 + 4];
        MapRect::new(b[0], b[1], b[2], b[3])
    }

    /// The min corner of a slot's bounds, which is the location of point
    /// entries.
    pub fn point(&self, slot: usize) -> MapPoint {
        debug_assert!(slot < self.len(), "slot {} out of range", slot);
        MapPoint::new(self.bounds[slot * 4], self.bounds[slot * 4 + 1])
    }

    pub fn parent(&self, slot: usize) -> Option<usize> {
        debug_assert!(slot < self.len(), "slot {} out of range", slot);
        if slot == 0 {
            None
        } else {
            Some(self.parents[slot] as usize)
        }
    }
}

/// Iterator over the children of one slot, following sibling links.
pub struct Children<'a> {
    index: &'a StaticIndex,
    next: Option<usize>,
}

impl<'a> Iterator for Children<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        let sibling = self.index.siblings[current];
        self.next = if sibling == 0 {
            None
        } else {
            Some(sibling as usize)
        };
        Some(current)
    }
}

struct WordReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> WordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn read_i32(&mut self) -> Result<i32> {
        let end = self.position + 4;
        let word = self
            .bytes
            .get(self.position..end)
            .ok_or(MapError::Truncated {
                expected: end,
                available: self.bytes.len(),
            })?;
        self.position = end;
        Ok(i32::from_be_bytes([word[0], word[1], word[2], word[3]]))
    }

    fn read_array(&mut self, length: usize) -> Result<Vec<i32>> {
        (0..length).map(|_| self.read_i32()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{BASE, MASK};

    const H: i32 = BASE / 2;

    /// Root over the world with two children in the west and east halves;
    /// the west child has one grandchild.
    fn sample() -> StaticIndex {
        StaticIndex::from_parts(
            vec![100, 200, 201, 300],
            vec![0, 10, 20, 30],
            vec![0, 1, 2, 1],
            vec![
                0, 0, MASK, MASK, //
                0, 0, H - 1, MASK, //
                0, 0, 1000, 1000, //
                H, 0, MASK, MASK,
            ],
            vec![0, 3, 0, 0],
            vec![0, 0, 1, 0],
        )
        .unwrap()
    }

    #[test]
    fn test_full_world_query_returns_every_slot_once() {
        let index = sample();
        let results = index.query(&MapRect::world(), TypeFilter::Any, usize::MAX);
        assert_eq!(results, vec![0, 1, 2, 3]);
        assert_eq!(index.count(&MapRect::world(), TypeFilter::Any), 4);
    }

    #[test]
    fn test_pruning_and_type_filter() {
        let index = sample();
        let east = MapRect::new(H + 10, 10, H + 20, 20);
        assert_eq!(index.query(&east, TypeFilter::Any, 10), vec![0, 3]);
        assert_eq!(index.query(&east, TypeFilter::Exact(1), 10), vec![3]);
        assert_eq!(index.query(&east, TypeFilter::Exact(2), 10), Vec::<usize>::new());

        let corner = MapRect::new(5, 5, 6, 6);
        assert_eq!(index.query(&corner, TypeFilter::from(ANY_TYPE), 10), vec![0, 1, 2]);
    }

    #[test]
    fn test_max_results_caps_output() {
        let index = sample();
        assert_eq!(index.query(&MapRect::world(), TypeFilter::Any, 2), vec![0, 1]);
        assert!(index.query(&MapRect::world(), TypeFilter::Any, 0).is_empty());

        let mut results = vec![99];
        let written = index.query_into(&MapRect::world(), TypeFilter::Any, &mut results, 3);
        assert_eq!(written, 3);
        assert_eq!(results, vec![99, 0, 1, 2]);
    }

    #[test]
    fn test_wrapping_query_reaches_both_halves() {
        let index = sample();
        let seam = MapRect::new(MASK - 10, 0, 10, 10);
        assert_eq!(index.query(&seam, TypeFilter::Any, 10), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_accessors_and_children() {
        let index = sample();
        assert_eq!(index.id(3), 300);
        assert_eq!(index.offset(2), 20);
        assert_eq!(index.node_type(1), 1);
        assert_eq!(index.bounds(2), MapRect::new(0, 0, 1000, 1000));
        assert_eq!(index.point(3), MapPoint::new(H, 0));
        assert_eq!(index.children(0).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(index.children(1).collect::<Vec<_>>(), vec![2]);
        assert_eq!(index.children(3).count(), 0);
        assert_eq!(index.parent(2), Some(1));
        assert_eq!(index.parent(0), None);
    }

    #[test]
    fn test_bytes_round_trip() {
        let index = sample();
        let bytes = index.to_bytes();
        assert_eq!(bytes.len(), 4 + 4 * 9 * 4);
        assert_eq!(&bytes[..4], &[0, 0, 0, 4]);
        assert_eq!(StaticIndex::from_bytes(&bytes).unwrap(), index);
        assert_eq!(StaticIndex::load(&bytes[..]).unwrap(), index);
    }

    #[test]
    fn test_truncated_blob() {
        let bytes = sample().to_bytes();
        let cut = &bytes[..bytes.len() - 1];
        assert!(matches!(
            StaticIndex::from_bytes(cut),
            Err(MapError::Truncated { .. })
        ));
        assert!(matches!(
            StaticIndex::from_bytes(&[0, 0]),
            Err(MapError::Truncated { .. })
        ));
    }

    #[test]
    fn test_corrupt_links() {
        let mut bytes = sample().to_bytes();
        // last parent word -> 7, outside [0, 4)
        let n = bytes.len();
        bytes[n - 4..].copy_from_slice(&7_i32.to_be_bytes());
        assert!(matches!(
            StaticIndex::from_bytes(&bytes),
            Err(MapError::CorruptFormat(_))
        ));

        let negative = (-1_i32).to_be_bytes();
        assert!(matches!(
            StaticIndex::from_bytes(&negative),
            Err(MapError::CorruptFormat(_))
        ));

        let backwards = StaticIndex::from_parts(
            vec![1, 2],
            vec![0, 0],
            vec![0, 0],
            vec![0; 8],
            vec![0, 1],
            vec![0, 0],
        );
        assert!(backwards.is_err());
    }

    #[test]
    fn test_empty_index() {
        let index = StaticIndex::from_bytes(&[0, 0, 0, 0]).unwrap();
        assert!(index.is_empty());
        assert!(index.query(&MapRect::world(), TypeFilter::Any, 10).is_empty());
        assert_eq!(index.count(&MapRect::world(), TypeFilter::Any), 0);
    }
}
