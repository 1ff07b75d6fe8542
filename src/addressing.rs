//! Translation between logical LED addresses and flat buffer positions.
//!
//! Two layouts coexist:
//! - the per-strand color buffer, where a fixture's pixels start at its
//!   derived data offset (this is what the frame protocol carries), and
//! - the scene-wide flat index used to key the spatial caches.
//!
//! Both are pure functions of the fixture hierarchy and must be recomputed
//! whenever a fixture is added, removed, re-addressed or resized.

use std::collections::{BTreeMap, HashMap};

use crate::fixture::{Address, Fixture, LogicalAddress, StrandId};

/// strand -> (address -> fixture), both levels in ascending order.
pub type FixtureHierarchy = BTreeMap<StrandId, BTreeMap<Address, Fixture>>;

/// Assigns each fixture its offset into the strand's color buffer.
///
/// Within a strand, fixtures are visited in ascending address order and the
/// running pixel total becomes the next fixture's offset, so the layout is
/// contiguous and starts at zero.
pub fn recompute_offsets(hierarchy: &mut FixtureHierarchy) {
    for fixtures in hierarchy.values_mut() {
        let mut offset = 0;
        for fixture in fixtures.values_mut() {
            fixture.set_offset(offset);
            offset += fixture.pixels() as usize;
        }
    }
}

/// Number of pixels on each strand.
pub fn strand_lengths(hierarchy: &FixtureHierarchy) -> BTreeMap<StrandId, usize> {
    hierarchy
        .iter()
        .map(|(&strand, fixtures)| {
            let len = fixtures.values().map(|f| f.pixels() as usize).sum();
            (strand, len)
        })
        .collect()
}

/// `(strands, longest_strand)`: the dimensions needed to hold every strand's
/// colors in one matrix.
pub fn matrix_extents(hierarchy: &FixtureHierarchy) -> (usize, usize) {
    let lengths = strand_lengths(hierarchy);
    let longest = lengths.values().copied().max().unwrap_or(0);
    (lengths.len(), longest)
}

/// Position of a pixel in its strand's color buffer.
pub fn buffer_address(hierarchy: &FixtureHierarchy, logical: LogicalAddress) -> Option<(StrandId, usize)> {
    let fixture = hierarchy.get(&logical.strand)?.get(&logical.address)?;
    (logical.pixel < fixture.pixels()).then(|| (logical.strand, fixture.offset() + logical.pixel as usize))
}

/// Flat enumeration of every pixel in the scene.
///
/// Order is strand ascending, then address ascending, then pixel ascending.
/// Indices are only meaningful for the hierarchy the map was built from.
#[derive(Debug, Clone, Default)]
pub struct PixelMap {
    logical: Vec<LogicalAddress>,
    index: HashMap<LogicalAddress, usize>,
}

impl PixelMap {
    pub fn build(hierarchy: &FixtureHierarchy) -> Self {
        let logical: Vec<LogicalAddress> = hierarchy
            .values()
            .flat_map(|fixtures| fixtures.values())
            .flat_map(|fixture| (0..fixture.pixels()).map(move |pixel| fixture.logical(pixel)))
            .collect();
        let index = logical
            .iter()
            .enumerate()
            .map(|(i, &addr)| (addr, i))
            .collect();
        Self { logical, index }
    }

    pub fn logical_to_index(&self, logical: LogicalAddress) -> Option<usize> {
        self.index.get(&logical).copied()
    }

    pub fn index_to_logical(&self, index: usize) -> Option<LogicalAddress> {
        self.logical.get(index).copied()
    }
}
