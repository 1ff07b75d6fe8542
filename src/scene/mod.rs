pub mod error;
pub mod file;
pub mod kdtree;
pub mod spatial;

use palette::Srgb;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::addressing::{self, FixtureHierarchy};
use crate::color;
use crate::fixture::{Address, Endpoint, Fixture, FixtureGeometry, LogicalAddress, StrandId};
use crate::geometry::{hit_test_rect, inflate_rect, BoundingBox, Point};
use crate::net::decoder::Frame;

pub use error::{Result, SceneError};
pub use file::{SceneFile, StrandSettings};
pub use spatial::{SpatialCache, SpatialConfig};

/// Pixel count given to fixtures created with [`Scene::add_default_fixture`].
pub const DEFAULT_FIXTURE_PIXELS: u32 = 32;

const DEFAULT_FIXTURE_LENGTH: f64 = 100.0;

/// A fixture under the cursor, ranked by `distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub strand: StrandId,
    pub address: Address,
    pub distance: f64,
}

/// All fixtures of an installation plus the spatial index derived from them.
///
/// Fixtures can only be changed through methods on this type; each of them
/// recomputes buffer offsets and drops the spatial caches before returning.
#[derive(Debug, Default)]
pub struct Scene {
    name: String,
    extents: [f64; 2],
    center: Option<Point>,
    strands: Vec<StrandSettings>,
    /// Strands whose settings were created by adding a fixture and have not
    /// been saved yet.
    new_strands: BTreeSet<StrandId>,
    fixtures: FixtureHierarchy,
    cache: SpatialCache,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_file(file: SceneFile) -> Result<Self> {
        let mut scene = Self {
            name: file.scene_name,
            extents: file.extents,
            center: file.center,
            strands: file.strands,
            ..Self::default()
        };
        for fixture in file.fixtures {
            scene.insert(fixture)?;
        }
        scene.topology_changed();
        scene.dirty = false;
        Ok(scene)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut scene = Self::from_file(SceneFile::load(path)?)?;
        scene.path = Some(path.to_path_buf());
        info!(
            "Loaded scene '{}' from {}: {} fixtures, {} pixels",
            scene.name,
            path.display(),
            scene.fixture_count(),
            scene.pixel_count()
        );
        Ok(scene)
    }

    pub fn to_file(&self) -> SceneFile {
        SceneFile {
            scene_name: self.name.clone(),
            extents: self.extents,
            center: self.center,
            strands: self.strands.clone(),
            fixtures: self.fixtures().cloned().collect(),
            ..SceneFile::default()
        }
    }

    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(SceneError::NoPath)?;
        self.to_file().save(&path)?;
        self.new_strands.clear();
        self.dirty = false;
        info!("Saved scene to {}", path.display());
        Ok(())
    }

    pub fn save_as(&mut self, path: &Path) -> Result<()> {
        self.path = Some(path.to_path_buf());
        self.save()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extents(&self) -> [f64; 2] {
        self.extents
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether fixtures changed since the last load or save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Scene center; falls back to the center of the pixel bounding box.
    pub fn center(&mut self) -> Point {
        if let Some(center) = self.center {
            return center;
        }
        self.fixture_bounding_box()
            .map(|bb| bb.center())
            .unwrap_or_else(|| Point::new(self.extents[0] / 2.0, self.extents[1] / 2.0))
    }

    // Fixture lookup

    /// Every fixture in strand, then address order.
    pub fn fixtures(&self) -> impl Iterator<Item = &Fixture> + '_ {
        self.fixtures.values().flat_map(|s| s.values())
    }

    pub fn fixture(&self, strand: StrandId, address: Address) -> Option<&Fixture> {
        self.fixtures.get(&strand)?.get(&address)
    }

    pub fn fixture_hierarchy(&self) -> &FixtureHierarchy {
        &self.fixtures
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.values().map(BTreeMap::len).sum()
    }

    pub fn pixel_count(&self) -> usize {
        self.fixtures().map(|f| f.pixels() as usize).sum()
    }

    pub fn strand_lengths(&self) -> BTreeMap<StrandId, usize> {
        addressing::strand_lengths(&self.fixtures)
    }

    pub fn matrix_extents(&self) -> (usize, usize) {
        addressing::matrix_extents(&self.fixtures)
    }

    pub fn buffer_address(&self, logical: LogicalAddress) -> Option<(StrandId, usize)> {
        addressing::buffer_address(&self.fixtures, logical)
    }

    pub fn logical_to_index(&mut self, logical: LogicalAddress) -> Option<usize> {
        self.cache.pixel_map(&self.fixtures).logical_to_index(logical)
    }

    pub fn index_to_logical(&mut self, index: usize) -> Option<LogicalAddress> {
        self.cache.pixel_map(&self.fixtures).index_to_logical(index)
    }

    // Editing

    fn insert(&mut self, fixture: Fixture) -> Result<()> {
        let (strand, address) = (fixture.strand(), fixture.address());
        let slot = self.fixtures.entry(strand).or_default();
        if slot.contains_key(&address) {
            return Err(SceneError::DuplicateAddress { strand, address });
        }
        slot.insert(address, fixture);
        if !self.strands.iter().any(|s| s.id == strand) {
            self.strands.push(StrandSettings::new(strand));
            self.strands.sort_by_key(|s| s.id);
            self.new_strands.insert(strand);
        }
        Ok(())
    }

    fn take(&mut self, strand: StrandId, address: Address) -> Result<Fixture> {
        let fixtures = self
            .fixtures
            .get_mut(&strand)
            .ok_or(SceneError::FixtureNotFound { strand, address })?;
        let fixture = fixtures
            .remove(&address)
            .ok_or(SceneError::FixtureNotFound { strand, address })?;
        if fixtures.is_empty() {
            self.fixtures.remove(&strand);
            if self.new_strands.remove(&strand) {
                self.strands.retain(|s| s.id != strand);
            }
        }
        Ok(fixture)
    }

    fn fixture_mut(&mut self, strand: StrandId, address: Address) -> Result<&mut Fixture> {
        self.fixtures
            .get_mut(&strand)
            .and_then(|s| s.get_mut(&address))
            .ok_or(SceneError::FixtureNotFound { strand, address })
    }

    fn topology_changed(&mut self) {
        addressing::recompute_offsets(&mut self.fixtures);
        self.cache.invalidate();
        self.dirty = true;
    }

    /// Adds a fixture at its own address. Fails without touching the scene
    /// if that address is taken.
    pub fn add_fixture(&mut self, fixture: Fixture) -> Result<()> {
        debug!("Adding {}", fixture);
        self.insert(fixture)?;
        self.topology_changed();
        Ok(())
    }

    /// Adds a linear fixture after the highest address on the highest strand
    /// (or at 0:0 in an empty scene), centered in the scene.
    pub fn add_default_fixture(&mut self) -> Result<(StrandId, Address)> {
        let (strand, address) = match self.fixtures.iter().next_back() {
            Some((&strand, fixtures)) => {
                let next = fixtures.keys().next_back().map_or(0, |a| a.saturating_add(1));
                (strand, next)
            }
            None => (0, 0),
        };
        let center = self.center();
        let half = Point::new(DEFAULT_FIXTURE_LENGTH / 2.0, 0.0);
        self.add_fixture(Fixture::linear(
            strand,
            address,
            DEFAULT_FIXTURE_PIXELS,
            center - half,
            center + half,
        ))?;
        Ok((strand, address))
    }

    pub fn remove_fixture(&mut self, strand: StrandId, address: Address) -> Result<Fixture> {
        let fixture = self.take(strand, address)?;
        debug!("Removed {}", fixture);
        self.topology_changed();
        Ok(fixture)
    }

    /// Moves a fixture to a new strand and address.
    pub fn readdress_fixture(
        &mut self,
        from: (StrandId, Address),
        to: (StrandId, Address),
    ) -> Result<()> {
        if self.fixture(from.0, from.1).is_none() {
            return Err(SceneError::FixtureNotFound {
                strand: from.0,
                address: from.1,
            });
        }
        if from == to {
            return Ok(());
        }
        if self.fixture(to.0, to.1).is_some() {
            return Err(SceneError::DuplicateAddress {
                strand: to.0,
                address: to.1,
            });
        }
        let mut fixture = self.take(from.0, from.1)?;
        fixture.set_address(to.0, to.1);
        self.insert(fixture)?;
        self.topology_changed();
        Ok(())
    }

    /// Replaces a fixture's geometry.
    pub fn move_fixture(&mut self, strand: StrandId, address: Address, geometry: FixtureGeometry) -> Result<()> {
        self.fixture_mut(strand, address)?.set_geometry(geometry);
        self.topology_changed();
        Ok(())
    }

    pub fn set_pixel_count(&mut self, strand: StrandId, address: Address, pixels: u32) -> Result<()> {
        self.fixture_mut(strand, address)?.set_pixels(pixels);
        self.topology_changed();
        Ok(())
    }

    pub fn clear_fixtures(&mut self) {
        self.fixtures.clear();
        let new_strands = std::mem::take(&mut self.new_strands);
        self.strands.retain(|s| !new_strands.contains(&s.id));
        self.topology_changed();
    }

    // Spatial queries

    pub fn spatial_cache(&self) -> &SpatialCache {
        &self.cache
    }

    pub fn warmup(&mut self, config: &SpatialConfig) {
        self.cache.warmup(&self.fixtures, config);
    }

    pub fn pixel_location(&mut self, index: usize) -> Option<Point> {
        self.cache.pixel_location(&self.fixtures, index)
    }

    pub fn pixel_distance(&mut self, a: usize, b: usize) -> Option<f64> {
        self.cache.pixel_distance(&self.fixtures, a, b)
    }

    pub fn pixel_distances(&self, index: usize) -> Option<&[f64]> {
        self.cache.pixel_distances(index)
    }

    pub fn all_pixel_locations(&mut self) -> &[Point] {
        self.cache.all_pixel_locations(&self.fixtures)
    }

    pub fn pixel_neighbors(&mut self, index: usize, radius: f64) -> Vec<usize> {
        self.cache.pixel_neighbors(&self.fixtures, index, radius)
    }

    pub fn nearest_pixel(&mut self, point: Point) -> Option<(usize, f64)> {
        self.cache.nearest_pixel(&self.fixtures, point)
    }

    pub fn fixture_bounding_box(&mut self) -> Option<BoundingBox> {
        self.cache.fixture_bounding_box(&self.fixtures)
    }

    pub fn colliding_fixtures(
        &mut self,
        strand: StrandId,
        address: Address,
        endpoint: Endpoint,
        radius: f64,
    ) -> Result<Vec<LogicalAddress>> {
        self.cache
            .colliding_fixtures(&self.fixtures, strand, address, endpoint, radius)
    }

    pub fn intersection_points(&mut self, threshold: f64) -> Vec<Point> {
        self.cache.intersection_points(&self.fixtures, threshold)
    }

    /// Fixtures within `epsilon` of `point`, closest first.
    pub fn hit_test(&self, point: Point, epsilon: f64) -> Vec<Hit> {
        let mut hits: Vec<Hit> = self
            .fixtures()
            .filter(|f| hit_test_rect(inflate_rect(f.bounding_rect(), epsilon * 2.0), point))
            .filter_map(|f| {
                f.hit_test(point, epsilon).map(|distance| Hit {
                    strand: f.strand(),
                    address: f.address(),
                    distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Color of every pixel in flat index order, looked up through each
    /// fixture's buffer offset. Pixels the frame has no data for are unlit.
    pub fn pixel_colors(&self, frame: &Frame) -> Vec<Srgb<u8>> {
        self.fixtures()
            .flat_map(|f| {
                (0..f.pixels() as usize)
                    .map(move |pixel| frame.pixel(f.strand(), f.offset() + pixel).unwrap_or_else(color::unlit))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(strand: StrandId, address: Address, pixels: u32, a: (f64, f64), b: (f64, f64)) -> Fixture {
        Fixture::linear(strand, address, pixels, Point::new(a.0, a.1), Point::new(b.0, b.1))
    }

    fn sample_scene() -> Scene {
        let mut scene = Scene::new("test");
        scene.add_fixture(line(0, 0, 10, (0.0, 0.0), (100.0, 0.0))).unwrap();
        scene.add_fixture(line(0, 1, 5, (100.0, 0.0), (100.0, 100.0))).unwrap();
        scene.add_fixture(line(1, 0, 8, (0.0, 100.0), (100.0, 100.0))).unwrap();
        scene
    }

    #[test]
    fn mutations_recompute_offsets() {
        let mut scene = sample_scene();
        assert_eq!(scene.fixture(0, 1).unwrap().offset(), 10);

        scene.set_pixel_count(0, 0, 20).unwrap();
        assert_eq!(scene.fixture(0, 1).unwrap().offset(), 20);

        scene.remove_fixture(0, 0).unwrap();
        assert_eq!(scene.fixture(0, 1).unwrap().offset(), 0);
        assert_eq!(scene.strand_lengths().get(&0), Some(&5));
    }

    #[test]
    fn duplicate_address_is_rejected() {
        let mut scene = Scene::new("dup");
        scene.add_fixture(line(0, 0, 4, (0.0, 0.0), (10.0, 0.0))).unwrap();
        let err = scene
            .add_fixture(line(0, 0, 9, (50.0, 0.0), (60.0, 0.0)))
            .unwrap_err();
        assert!(matches!(err, SceneError::DuplicateAddress { strand: 0, address: 0 }));
        assert_eq!(scene.fixture_count(), 1);
        assert_eq!(scene.fixture(0, 0).unwrap().pixels(), 4);
    }

    #[test]
    fn add_then_remove_restores_queries() {
        let mut scene = sample_scene();
        let config = SpatialConfig::default();
        scene.warmup(&config);

        let before_locations = scene.all_pixel_locations().to_vec();
        let before_colliding = scene.colliding_fixtures(0, 0, Endpoint::End, 50.0).unwrap();
        let before_neighbors = scene.pixel_neighbors(3, 15.0);
        let before_intersections = scene.intersection_points(50.0);
        let before_offsets: Vec<usize> = scene.fixtures().map(Fixture::offset).collect();

        scene.add_fixture(line(0, 7, 12, (95.0, 5.0), (150.0, 60.0))).unwrap();
        assert_ne!(scene.all_pixel_locations().len(), before_locations.len());
        assert_ne!(scene.colliding_fixtures(0, 0, Endpoint::End, 50.0).unwrap(), before_colliding);
        scene.remove_fixture(0, 7).unwrap();

        assert_eq!(scene.all_pixel_locations(), before_locations.as_slice());
        assert_eq!(scene.colliding_fixtures(0, 0, Endpoint::End, 50.0).unwrap(), before_colliding);
        assert_eq!(scene.pixel_neighbors(3, 15.0), before_neighbors);
        assert_eq!(scene.intersection_points(50.0), before_intersections);
        assert_eq!(scene.fixtures().map(Fixture::offset).collect::<Vec<_>>(), before_offsets);
    }

    #[test]
    fn colliding_fixture_within_start_radius() {
        let mut scene = Scene::new("collide");
        scene.add_fixture(line(0, 0, 10, (0.0, 0.0), (0.0, 300.0))).unwrap();
        scene.add_fixture(line(0, 1, 10, (6.0, 8.0), (200.0, 200.0))).unwrap();
        let hits = scene.colliding_fixtures(0, 0, Endpoint::Start, 50.0).unwrap();
        assert!(hits.contains(&LogicalAddress::new(0, 1, 0)));
    }

    #[test]
    fn cache_is_invalidated_by_move() {
        let mut scene = sample_scene();
        assert_eq!(scene.pixel_location(0), Some(Point::new(0.0, 0.0)));
        scene
            .move_fixture(
                0,
                0,
                FixtureGeometry::Linear {
                    pos1: Point::new(-50.0, -50.0),
                    pos2: Point::new(50.0, -50.0),
                },
            )
            .unwrap();
        assert_eq!(scene.pixel_location(0), Some(Point::new(-50.0, -50.0)));
        assert!(scene.is_dirty());
    }

    #[test]
    fn removing_last_fixture_drops_strand() {
        let mut scene = sample_scene();
        scene.remove_fixture(1, 0).unwrap();
        assert!(!scene.fixture_hierarchy().contains_key(&1));
        assert_eq!(scene.matrix_extents(), (1, 15));
        assert!(matches!(
            scene.remove_fixture(1, 0),
            Err(SceneError::FixtureNotFound { strand: 1, address: 0 })
        ));
    }

    #[test]
    fn readdress_keeps_geometry_and_checks_target() {
        let mut scene = sample_scene();
        assert!(matches!(
            scene.readdress_fixture((0, 0), (1, 0)),
            Err(SceneError::DuplicateAddress { strand: 1, address: 0 })
        ));
        scene.readdress_fixture((0, 0), (2, 4)).unwrap();
        assert!(scene.fixture(0, 0).is_none());
        let moved = scene.fixture(2, 4).unwrap();
        assert_eq!(moved.pos2(), Point::new(100.0, 0.0));
        assert_eq!(moved.offset(), 0);
        assert_eq!(scene.fixture(0, 1).unwrap().offset(), 0);
        assert!(scene.to_file().strands.iter().any(|s| s.id == 2));
    }

    #[test]
    fn readdress_reports_missing_source_first() {
        let mut scene = sample_scene();
        assert!(matches!(
            scene.readdress_fixture((9, 9), (0, 0)),
            Err(SceneError::FixtureNotFound { strand: 9, address: 9 })
        ));
        assert!(matches!(
            scene.readdress_fixture((9, 9), (9, 9)),
            Err(SceneError::FixtureNotFound { strand: 9, address: 9 })
        ));
        assert_eq!(scene.fixture_count(), 3);
    }

    #[test]
    fn settings_of_emptied_new_strand_are_dropped() {
        let mut scene = Scene::from_file(SceneFile {
            strands: vec![StrandSettings::new(0), StrandSettings::new(1)],
            fixtures: vec![line(0, 0, 10, (0.0, 0.0), (100.0, 0.0)), line(1, 0, 4, (0.0, 9.0), (9.0, 9.0))],
            ..SceneFile::default()
        })
        .unwrap();
        let before = scene.to_file().strands;

        scene.add_fixture(line(5, 0, 4, (0.0, 50.0), (40.0, 50.0))).unwrap();
        assert!(scene.to_file().strands.iter().any(|s| s.id == 5));
        scene.remove_fixture(5, 0).unwrap();
        assert_eq!(scene.to_file().strands, before);

        // Settings read from the file outlive their last fixture.
        scene.remove_fixture(1, 0).unwrap();
        assert_eq!(scene.to_file().strands, before);
    }

    #[test]
    fn default_fixture_goes_after_highest_address() {
        let mut scene = Scene::new("empty");
        assert_eq!(scene.add_default_fixture().unwrap(), (0, 0));
        assert_eq!(scene.add_default_fixture().unwrap(), (0, 1));

        let mut scene = sample_scene();
        assert_eq!(scene.add_default_fixture().unwrap(), (1, 1));
        assert_eq!(scene.fixture(1, 1).unwrap().pixels(), DEFAULT_FIXTURE_PIXELS);
    }

    #[test]
    fn clear_fixtures_empties_scene() {
        let mut scene = sample_scene();
        scene.warmup(&SpatialConfig::default());
        scene.clear_fixtures();
        assert_eq!(scene.fixture_count(), 0);
        assert!(scene.all_pixel_locations().is_empty());
        assert!(scene.fixture_bounding_box().is_none());
        assert!(!scene.spatial_cache().is_warm());
    }

    #[test]
    fn hit_test_ranks_by_distance() {
        let scene = sample_scene();
        // Near the corner shared by 0:0 and 0:1.
        let hits = scene.hit_test(Point::new(97.0, 2.0), 10.0);
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].strand, hits[0].address), (0, 0));
        assert_eq!((hits[1].strand, hits[1].address), (0, 1));
        assert!(hits[0].distance <= hits[1].distance);

        // On the line but outside the padded bounds.
        assert!(scene.hit_test(Point::new(500.0, 0.0), 10.0).is_empty());
        // Exactly on a fixture counts.
        let on_line = scene.hit_test(Point::new(50.0, 100.0), 10.0);
        assert_eq!(on_line[0].distance, 0.0);
        assert_eq!((on_line[0].strand, on_line[0].address), (1, 0));
    }

    #[test]
    fn pixel_colors_follow_offsets() {
        let scene = sample_scene();
        let mut strands = BTreeMap::new();
        let mut strand0 = vec![Srgb::new(0, 0, 0); 15];
        strand0[10] = Srgb::new(1, 2, 3);
        strands.insert(0, strand0);
        let frame = Frame::new(1, strands);

        let colors = scene.pixel_colors(&frame);
        assert_eq!(colors.len(), scene.pixel_count());
        // First pixel of 0:1 sits at offset 10 on strand 0.
        assert_eq!(colors[10], Srgb::new(1, 2, 3));
        // Strand 1 sent nothing this frame.
        assert!(colors[15..].iter().all(|&c| c == color::unlit()));
    }

    #[test]
    fn center_falls_back_to_bounding_box() {
        let mut scene = sample_scene();
        assert_eq!(scene.center(), Point::new(50.0, 50.0));
        let mut file = scene.to_file();
        file.center = Some(Point::new(1.0, 2.0));
        assert_eq!(Scene::from_file(file).unwrap().center(), Point::new(1.0, 2.0));
    }

    #[test]
    fn file_round_trip_keeps_fixtures() {
        let scene = sample_scene();
        let json = scene.to_file().to_json_string().unwrap();
        let loaded = Scene::from_file(SceneFile::from_json_str(&json).unwrap()).unwrap();
        assert_eq!(loaded.fixture_count(), 3);
        assert_eq!(loaded.fixture(0, 1).unwrap().offset(), 10);
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.name(), "test");
    }

    #[test]
    fn loading_duplicate_addresses_fails() {
        let json = r#"{
            "file-type": "scene",
            "fixtures": [
                {"strand": 0, "address": 3, "pixels": 2, "type": "linear", "pos1": [0, 0], "pos2": [1, 0]},
                {"strand": 0, "address": 3, "pixels": 2, "type": "linear", "pos1": [5, 0], "pos2": [6, 0]}
            ]
        }"#;
        let err = Scene::from_file(SceneFile::from_json_str(json).unwrap()).unwrap_err();
        assert!(matches!(err, SceneError::DuplicateAddress { strand: 0, address: 3 }));
    }

    #[test]
    fn save_without_path_fails() {
        let mut scene = sample_scene();
        assert!(matches!(scene.save(), Err(SceneError::NoPath)));
    }

    #[test]
    fn save_as_then_load() {
        let path = std::env::temp_dir().join(format!("firesim-save-as-{}.json", std::process::id()));
        let mut scene = sample_scene();
        assert!(scene.is_dirty());
        scene.save_as(&path).unwrap();
        assert_eq!(scene.path(), Some(path.as_path()));
        assert!(!scene.is_dirty());

        let loaded = Scene::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.fixture_count(), scene.fixture_count());
        assert_eq!(loaded.to_file().strands, scene.to_file().strands);
        assert_eq!(loaded.path(), Some(path.as_path()));
    }

    #[test]
    fn index_and_buffer_addresses_agree() {
        let mut scene = sample_scene();
        let logical = LogicalAddress::new(0, 1, 2);
        let index = scene.logical_to_index(logical).unwrap();
        assert_eq!(index, 12);
        assert_eq!(scene.index_to_logical(index), Some(logical));
        assert_eq!(scene.buffer_address(logical), Some((0, 12)));
        assert_eq!(scene.buffer_address(LogicalAddress::new(1, 0, 3)), Some((1, 3)));
        assert_eq!(scene.index_to_logical(scene.pixel_count()), None);
    }

    #[test]
    fn nearest_pixel_and_distance_rows() {
        let mut scene = sample_scene();
        let (index, d) = scene.nearest_pixel(Point::new(101.0, 99.0)).unwrap();
        assert_eq!(scene.pixel_location(index), Some(Point::new(100.0, 100.0)));
        assert!((d - 2f64.sqrt()).abs() < 1e-9);

        assert!(scene.pixel_distances(0).is_none());
        scene.warmup(&SpatialConfig::default());
        assert!(scene.spatial_cache().is_warm());
        let row = scene.pixel_distances(0).unwrap().to_vec();
        assert_eq!(row.len(), scene.pixel_count());
        assert_eq!(scene.pixel_distance(0, 9), Some(row[9]));
    }
}
