use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::{distance, distance_point_to_line, Point, Rect};

/// Strand id. The wire protocol carries it as a single byte.
pub type StrandId = u8;

/// Fixture address, unique within a strand.
pub type Address = u32;

/// One physical LED, independent of buffer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalAddress {
    pub strand: StrandId,
    pub address: Address,
    pub pixel: u32,
}

impl LogicalAddress {
    pub const fn new(strand: StrandId, address: Address, pixel: u32) -> Self {
        Self {
            strand,
            address,
            pixel,
        }
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.strand, self.address, self.pixel)
    }
}

/// Which point of a fixture a collision query is centered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Start,
    End,
    Midpoint,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Endpoint::Start, Endpoint::End, Endpoint::Midpoint];
}

/// Shape of a fixture in scene space.
///
/// Every variant answers the same questions: where is pixel `i`, what are
/// its bounds, and how close is a point to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FixtureGeometry {
    /// A strip of evenly spaced pixels from `pos1` to `pos2`.
    Linear { pos1: Point, pos2: Point },
    /// Pixels placed clockwise on a circle, from `start-angle` to
    /// `end-angle` in degrees. Equal angles describe a full circle.
    Arc {
        center: Point,
        radius: f64,
        #[serde(rename = "start-angle")]
        start_angle: f64,
        #[serde(rename = "end-angle")]
        end_angle: f64,
    },
}

impl FixtureGeometry {
    /// The same shape shifted by `delta`.
    pub fn translated(self, delta: Point) -> Self {
        match self {
            FixtureGeometry::Linear { pos1, pos2 } => FixtureGeometry::Linear {
                pos1: pos1 + delta,
                pos2: pos2 + delta,
            },
            FixtureGeometry::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => FixtureGeometry::Arc {
                center: center + delta,
                radius,
                start_angle,
                end_angle,
            },
        }
    }

    fn is_full_circle(&self) -> bool {
        match self {
            FixtureGeometry::Linear { .. } => false,
            FixtureGeometry::Arc {
                start_angle,
                end_angle,
                ..
            } => (end_angle - start_angle).rem_euclid(360.0) == 0.0,
        }
    }

    /// Point at parameter `t` in `[0, 1]` along the shape.
    fn point_at(&self, t: f64) -> Point {
        match *self {
            FixtureGeometry::Linear { pos1, pos2 } => pos1.lerp(pos2, t),
            FixtureGeometry::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let sweep = if self.is_full_circle() {
                    360.0
                } else {
                    (end_angle - start_angle).rem_euclid(360.0)
                };
                let theta = (start_angle + sweep * t).to_radians();
                Point::new(
                    center.x + radius * theta.cos(),
                    center.y + radius * theta.sin(),
                )
            }
        }
    }
}

/// A contiguous run of pixels on one strand.
///
/// The data offset is derived from the strand's address ordering and is only
/// ever written by [`crate::addressing::recompute_offsets`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    strand: StrandId,
    address: Address,
    pixels: u32,
    #[serde(flatten)]
    geometry: FixtureGeometry,
    #[serde(skip)]
    offset: usize,
}

impl Fixture {
    pub fn new(strand: StrandId, address: Address, pixels: u32, geometry: FixtureGeometry) -> Self {
        Self {
            strand,
            address,
            pixels,
            geometry,
            offset: 0,
        }
    }

    pub fn linear(strand: StrandId, address: Address, pixels: u32, pos1: Point, pos2: Point) -> Self {
        Self::new(strand, address, pixels, FixtureGeometry::Linear { pos1, pos2 })
    }

    pub fn strand(&self) -> StrandId {
        self.strand
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn pixels(&self) -> u32 {
        self.pixels
    }

    pub fn geometry(&self) -> &FixtureGeometry {
        &self.geometry
    }

    /// Index of this fixture's first pixel in its strand's color buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub(crate) fn set_address(&mut self, strand: StrandId, address: Address) {
        self.strand = strand;
        self.address = address;
    }

    pub(crate) fn set_pixels(&mut self, pixels: u32) {
        self.pixels = pixels;
    }

    pub(crate) fn set_geometry(&mut self, geometry: FixtureGeometry) {
        self.geometry = geometry;
    }

    pub fn logical(&self, pixel: u32) -> LogicalAddress {
        LogicalAddress::new(self.strand, self.address, pixel)
    }

    pub fn last_pixel(&self) -> u32 {
        self.pixels.saturating_sub(1)
    }

    /// Location of the first pixel.
    pub fn pos1(&self) -> Point {
        match self.geometry {
            FixtureGeometry::Linear { pos1, .. } => pos1,
            FixtureGeometry::Arc { .. } => self.geometry.point_at(0.0),
        }
    }

    /// Location of the last pixel.
    pub fn pos2(&self) -> Point {
        match self.geometry {
            FixtureGeometry::Linear { pos2, .. } => pos2,
            FixtureGeometry::Arc { .. } if self.pixels > 1 => self.pixel_location(self.last_pixel()),
            FixtureGeometry::Arc { .. } => self.geometry.point_at(1.0),
        }
    }

    pub fn midpoint(&self) -> Point {
        match self.geometry {
            FixtureGeometry::Linear { pos1, pos2 } => pos1.midpoint(pos2),
            FixtureGeometry::Arc { .. } => self.geometry.point_at(0.5),
        }
    }

    pub fn endpoint(&self, endpoint: Endpoint) -> Point {
        match endpoint {
            Endpoint::Start => self.pos1(),
            Endpoint::End => self.pos2(),
            Endpoint::Midpoint => self.midpoint(),
        }
    }

    /// Scene location of `pixel`.
    ///
    /// The first and last pixels sit exactly on the endpoints; interior
    /// pixels are evenly spaced between them. A full circle spaces its pixels
    /// around the whole circumference so the last does not overlap the first.
    pub fn pixel_location(&self, pixel: u32) -> Point {
        if let FixtureGeometry::Linear { pos1, pos2 } = self.geometry {
            if pixel == 0 {
                return pos1;
            }
            if pixel == self.last_pixel() {
                return pos2;
            }
        }
        let divisor = if self.geometry.is_full_circle() {
            self.pixels
        } else {
            self.last_pixel()
        };
        if divisor == 0 {
            return self.geometry.point_at(0.0);
        }
        self.geometry.point_at(pixel as f64 / divisor as f64)
    }

    /// Bounds of the fixture as `(x, y, width, height)`.
    pub fn bounding_rect(&self) -> Rect {
        match self.geometry {
            FixtureGeometry::Linear { pos1, pos2 } => Rect::from_corners(pos1, pos2),
            FixtureGeometry::Arc { center, radius, .. } => Rect::new(
                center.x - radius,
                center.y - radius,
                radius * 2.0,
                radius * 2.0,
            ),
        }
    }

    /// Hit strength for a click at `pos`: the distance to the fixture when it
    /// is within `epsilon`, otherwise `None`.
    pub fn hit_test(&self, pos: Point, epsilon: f64) -> Option<f64> {
        let d = match self.geometry {
            FixtureGeometry::Linear { pos1, pos2 } => distance_point_to_line(pos1, pos2, pos),
            FixtureGeometry::Arc { center, radius, .. } => (distance(center, pos) - radius).abs(),
        };
        (d <= epsilon).then_some(d)
    }
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fixture [{}:{}] {} px @ {}",
            self.strand, self.address, self.pixels, self.offset
        )
    }
}
