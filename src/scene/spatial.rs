//! Memoized spatial queries over a fixture hierarchy.
//!
//! Every cache here is derived from the hierarchy it was filled from. The
//! owning [`Scene`](super::Scene) calls [`SpatialCache::invalidate`] on every
//! topology change, so entries never outlive the layout they describe.

use std::collections::HashMap;
use tracing::{debug, info};

use super::error::{Result, SceneError};
use super::kdtree::KdTree;
use crate::addressing::{FixtureHierarchy, PixelMap};
use crate::fixture::{Address, Endpoint, LogicalAddress, StrandId};
use crate::geometry::{distance, BoundingBox, Point};

/// Tunables for spatial queries, mirrored from the `[spatial]` config section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialConfig {
    pub neighbor_radius: f64,
    pub collision_radius: f64,
    pub intersection_threshold: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            neighbor_radius: 3.0,
            collision_radius: 50.0,
            intersection_threshold: 50.0,
        }
    }
}

type CollisionKey = (StrandId, Address, Endpoint, u64);

#[derive(Debug, Default)]
pub struct SpatialCache {
    pixel_map: Option<PixelMap>,
    locations: HashMap<usize, Point>,
    all_locations: Option<Vec<Point>>,
    distances: HashMap<(usize, usize), f64>,
    neighbors: HashMap<(usize, u64), Vec<usize>>,
    colliding: HashMap<CollisionKey, Vec<LogicalAddress>>,
    intersections: HashMap<u64, Vec<Point>>,
    bounding_box: Option<Option<BoundingBox>>,
    tree: Option<KdTree>,
    /// Row-major n x n pairwise distances, filled by warmup.
    distance_matrix: Option<Vec<f64>>,
}

impl SpatialCache {
    /// Drops every derived structure.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    pub fn is_warm(&self) -> bool {
        self.distance_matrix.is_some()
    }

    pub fn pixel_map(&mut self, fixtures: &FixtureHierarchy) -> &PixelMap {
        self.pixel_map.get_or_insert_with(|| PixelMap::build(fixtures))
    }

    pub fn pixel_location(&mut self, fixtures: &FixtureHierarchy, index: usize) -> Option<Point> {
        if let Some(all) = &self.all_locations {
            return all.get(index).copied();
        }
        if let Some(&p) = self.locations.get(&index) {
            return Some(p);
        }

        let map = self.pixel_map.get_or_insert_with(|| PixelMap::build(fixtures));
        let logical = map.index_to_logical(index)?;
        let fixture = fixtures.get(&logical.strand)?.get(&logical.address)?;
        let location = fixture.pixel_location(logical.pixel);
        self.locations.insert(index, location);
        Some(location)
    }

    pub fn pixel_distance(&mut self, fixtures: &FixtureHierarchy, a: usize, b: usize) -> Option<f64> {
        if let Some(row) = self.matrix_row(a) {
            return row.get(b).copied();
        }
        if let Some(&d) = self.distances.get(&(a, b)) {
            return Some(d);
        }

        let d = distance(
            self.pixel_location(fixtures, a)?,
            self.pixel_location(fixtures, b)?,
        );
        self.distances.insert((a, b), d);
        self.distances.insert((b, a), d);
        Some(d)
    }

    /// Locations of every pixel, indexed by flat index.
    pub fn all_pixel_locations(&mut self, fixtures: &FixtureHierarchy) -> &[Point] {
        self.all_locations.get_or_insert_with(|| {
            fixtures
                .values()
                .flat_map(|strand| strand.values())
                .flat_map(|f| (0..f.pixels()).map(move |pixel| f.pixel_location(pixel)))
                .collect()
        })
    }

    fn tree(&mut self, fixtures: &FixtureHierarchy) -> &KdTree {
        let tree = match self.tree.take() {
            Some(tree) => tree,
            None => {
                let locations = self.all_pixel_locations(fixtures);
                let tree = KdTree::build(locations.iter().copied().enumerate().map(|(i, p)| (p, i)));
                debug!("Built KD-tree over {} pixels", tree.len());
                tree
            }
        };
        self.tree.insert(tree)
    }

    /// Flat indices of pixels within `radius` of `index`, including `index`
    /// itself. Unknown indices have no neighbors.
    pub fn pixel_neighbors(&mut self, fixtures: &FixtureHierarchy, index: usize, radius: f64) -> Vec<usize> {
        let key = (index, radius.to_bits());
        if let Some(cached) = self.neighbors.get(&key) {
            return cached.clone();
        }

        let Some(location) = self.pixel_location(fixtures, index) else {
            return Vec::new();
        };
        let neighbors = self.tree(fixtures).query_radius(location, radius);
        self.neighbors.insert(key, neighbors.clone());
        neighbors
    }

    /// Flat index of the pixel closest to `point`.
    pub fn nearest_pixel(&mut self, fixtures: &FixtureHierarchy, point: Point) -> Option<(usize, f64)> {
        self.tree(fixtures).nearest(point)
    }

    pub fn fixture_bounding_box(&mut self, fixtures: &FixtureHierarchy) -> Option<BoundingBox> {
        if let Some(bb) = self.bounding_box {
            return bb;
        }
        let bb = BoundingBox::from_points(self.all_pixel_locations(fixtures).iter().copied());
        self.bounding_box = Some(bb);
        bb
    }

    /// Fixtures with an endpoint within `radius` of the chosen endpoint of
    /// `strand:address`.
    ///
    /// A fixture is reported by pixel 0 when its start matches, otherwise by
    /// its last pixel when its end matches. The queried fixture is included
    /// when it matches itself.
    pub fn colliding_fixtures(
        &mut self,
        fixtures: &FixtureHierarchy,
        strand: StrandId,
        address: Address,
        endpoint: Endpoint,
        radius: f64,
    ) -> Result<Vec<LogicalAddress>> {
        let key = (strand, address, endpoint, radius.to_bits());
        if let Some(cached) = self.colliding.get(&key) {
            return Ok(cached.clone());
        }

        let target = fixtures
            .get(&strand)
            .and_then(|s| s.get(&address))
            .ok_or(SceneError::FixtureNotFound { strand, address })?
            .endpoint(endpoint);
        let r2 = radius * radius;

        let colliding: Vec<LogicalAddress> = fixtures
            .values()
            .flat_map(|s| s.values())
            .filter_map(|f| {
                if f.pos1().distance_squared(target) <= r2 {
                    Some(f.logical(0))
                } else if f.pos2().distance_squared(target) <= r2 {
                    Some(f.logical(f.last_pixel()))
                } else {
                    None
                }
            })
            .collect();

        self.colliding.insert(key, colliding.clone());
        Ok(colliding)
    }

    /// Centroids of fixture endpoint clusters.
    ///
    /// Greedy: the last remaining endpoint seeds a cluster and absorbs every
    /// other endpoint strictly closer than `threshold` to it. Results depend
    /// on endpoint order, which follows the hierarchy.
    pub fn intersection_points(&mut self, fixtures: &FixtureHierarchy, threshold: f64) -> Vec<Point> {
        let key = threshold.to_bits();
        if let Some(cached) = self.intersections.get(&key) {
            return cached.clone();
        }

        let mut endpoints: Vec<Point> = fixtures
            .values()
            .flat_map(|s| s.values())
            .flat_map(|f| [f.pos1(), f.pos2()])
            .collect();

        let mut centroids = Vec::new();
        while let Some(seed) = endpoints.pop() {
            let mut cluster = vec![seed];
            endpoints.retain(|&other| {
                if distance(seed, other) < threshold {
                    cluster.push(other);
                    false
                } else {
                    true
                }
            });
            let sum = cluster.iter().fold(Point::default(), |acc, &p| acc + p);
            centroids.push(sum * (1.0 / cluster.len() as f64));
        }

        self.intersections.insert(key, centroids.clone());
        centroids
    }

    /// Fills every cache eagerly, including the full pairwise distance matrix.
    pub fn warmup(&mut self, fixtures: &FixtureHierarchy, config: &SpatialConfig) {
        info!("Warming up scene caches...");

        for f in fixtures.values().flat_map(|s| s.values()) {
            for endpoint in Endpoint::ALL {
                if let Err(e) = self.colliding_fixtures(
                    fixtures,
                    f.strand(),
                    f.address(),
                    endpoint,
                    config.collision_radius,
                ) {
                    debug!("Skipping collisions for {}: {}", f, e);
                }
            }
        }

        let count = self.all_pixel_locations(fixtures).len();
        for index in 0..count {
            for neighbor in self.pixel_neighbors(fixtures, index, config.neighbor_radius) {
                self.pixel_distance(fixtures, index, neighbor);
            }
        }
        self.fixture_bounding_box(fixtures);
        self.intersection_points(fixtures, config.intersection_threshold);
        self.pixel_map(fixtures);

        let locations = self.all_pixel_locations(fixtures);
        let matrix: Vec<f64> = locations
            .iter()
            .flat_map(|&a| locations.iter().map(move |&b| distance(a, b)))
            .collect();
        self.distance_matrix = Some(matrix);

        info!("Done ({} pixels)", count);
    }

    /// Distances from `index` to every pixel; only available after warmup.
    pub fn pixel_distances(&self, index: usize) -> Option<&[f64]> {
        self.matrix_row(index)
    }

    fn matrix_row(&self, index: usize) -> Option<&[f64]> {
        let matrix = self.distance_matrix.as_ref()?;
        let n = self.all_locations.as_ref()?.len();
        (index < n).then(|| &matrix[index * n..(index + 1) * n])
    }
}
