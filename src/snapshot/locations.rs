//! Allocation-site locations.
//!
//! The snapshot ships a flat array mapping node indexes to script positions.
//! It is folded into a hash map once; lookups for nodes without a location
//! return `None`.

use ahash::AHashMap;

use super::errors::SnapshotDataError;
use super::meta::SnapshotMeta;
use super::serialize::Location;

/// node_index (field units) → location.
#[derive(Debug, Default)]
pub struct LocationMap {
    map: AHashMap<u32, Location>,
}

impl LocationMap {
    /// Builds the map from the snapshot's flat locations array.
    pub fn build(meta: &SnapshotMeta, locations: &[u32]) -> Result<Self, SnapshotDataError> {
        let lf = meta.location_field_count;
        if lf == 0 || locations.is_empty() {
            return Ok(Self::default());
        }
        if locations.len() % lf != 0 {
            return Err(SnapshotDataError::LocationsLengthMisaligned {
                len: locations.len(),
                field_count: lf,
            });
        }
        let mut map = AHashMap::with_capacity(locations.len() / lf);
        for record in locations.chunks_exact(lf) {
            map.insert(
                record[meta.location_object_index_offset],
                Location {
                    script_id: record[meta.location_script_id_offset],
                    line: record[meta.location_line_offset],
                    column: record[meta.location_column_offset],
                },
            );
        }
        Ok(Self { map })
    }

    /// Location of the node at `node_index`, if the snapshot recorded one.
    #[inline]
    pub fn get(&self, node_index: usize) -> Option<Location> {
        self.map.get(&(node_index as u32)).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
