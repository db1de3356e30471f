#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region geometry types and point-in-polygon containment.
//!
//! A [`Region`] is a named administrative boundary (state, county) whose
//! shape is either a single ring or a compound set of rings. Containment is
//! tested with `geo`'s crossing-number [`Contains`] implementation, which
//! treats points lying exactly on an edge or vertex as *outside*.
//!
//! Boundary data is stored as `(longitude, latitude)` while station data is
//! `(latitude, longitude)`. [`Region::matching_order`] probes both axis
//! orders so that datasets with inconsistent conventions still resolve.

use geo::{BoundingRect, Contains, Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// A finite `(latitude, longitude)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate, returning `None` unless both components are
    /// finite.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_finite() && longitude.is_finite() {
            Some(Self {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }

    /// Projects the coordinate onto ring space `(x, y)` for the given axis
    /// order.
    #[must_use]
    pub const fn to_xy(self, order: AxisOrder) -> (f64, f64) {
        match order {
            AxisOrder::LngLat => (self.longitude, self.latitude),
            AxisOrder::LatLng => (self.latitude, self.longitude),
        }
    }
}

/// Which component of a [`Coordinate`] is used as the ring's `x` axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AxisOrder {
    /// `x = longitude, y = latitude` (GeoJSON convention).
    LngLat,
    /// `x = latitude, y = longitude` (swapped frame).
    LatLng,
}

impl AxisOrder {
    /// Probe order used by [`Region::matching_order`].
    pub const PROBE: [Self; 2] = [Self::LngLat, Self::LatLng];
}

/// An axis-aligned bounding box in ring space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum `x`.
    pub min_x: f64,
    /// Minimum `y`.
    pub min_y: f64,
    /// Maximum `x`.
    pub max_x: f64,
    /// Maximum `y`.
    pub max_y: f64,
}

impl BoundingBox {
    /// Smallest box covering both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// A single closed ring of `(x, y)` vertices.
///
/// Rings with fewer than three distinct vertices are degenerate: they are
/// kept so that the owning region still exists, but they contain nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    polygon: Option<Polygon<f64>>,
}

impl Ring {
    /// Builds a ring from `(x, y)` vertices. The closing vertex is optional.
    /// Non-finite vertices are discarded.
    #[must_use]
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        let mut coords: Vec<Coord<f64>> = Vec::with_capacity(vertices.len());
        for (x, y) in vertices {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            let coord = Coord { x, y };
            if coords.last() != Some(&coord) {
                coords.push(coord);
            }
        }
        if coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }

        if coords.len() < 3 {
            return Self { polygon: None };
        }

        Self {
            polygon: Some(Polygon::new(LineString::from(coords), vec![])),
        }
    }

    /// Returns `true` if the ring has fewer than three distinct vertices.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.polygon.is_none()
    }

    /// Point-in-polygon test. Points on the ring's boundary are outside.
    #[must_use]
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        self.polygon
            .as_ref()
            .is_some_and(|polygon| polygon.contains(&Point::new(x, y)))
    }

    /// Bounding box of the ring, or `None` for degenerate rings.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let rect = self.polygon.as_ref()?.bounding_rect()?;
        Some(BoundingBox {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }
}

/// The shape owned by a [`Region`].
#[derive(Debug, Clone, PartialEq)]
pub enum RegionShape {
    /// One ring.
    Simple(Ring),
    /// Several rings; the region contains a point if any ring does.
    Compound(Vec<Ring>),
}

impl RegionShape {
    /// Returns `true` if the shape contains `(x, y)`.
    #[must_use]
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        match self {
            Self::Simple(ring) => ring.contains_xy(x, y),
            Self::Compound(rings) => rings.iter().any(|ring| ring.contains_xy(x, y)),
        }
    }

    /// Union of the member rings' bounding boxes.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Self::Simple(ring) => ring.bounding_box(),
            Self::Compound(rings) => rings
                .iter()
                .filter_map(Ring::bounding_box)
                .reduce(BoundingBox::union),
        }
    }
}

/// A named region with an optional shape.
///
/// A `None` shape comes from a boundary feature whose geometry was not a
/// polygon; such regions never contain any point.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Display name (e.g. `"Texas"`).
    pub name: String,
    /// Region geometry.
    pub shape: Option<RegionShape>,
}

impl Region {
    /// Creates a region.
    #[must_use]
    pub fn new(name: impl Into<String>, shape: Option<RegionShape>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Returns the first axis order under which the region contains
    /// `coord`, probing [`AxisOrder::LngLat`] before [`AxisOrder::LatLng`].
    #[must_use]
    pub fn matching_order(&self, coord: Coordinate) -> Option<AxisOrder> {
        let shape = self.shape.as_ref()?;
        AxisOrder::PROBE.into_iter().find(|&order| {
            let (x, y) = coord.to_xy(order);
            shape.contains_xy(x, y)
        })
    }

    /// Returns `true` if the region contains `coord` in either axis order.
    #[must_use]
    pub fn contains(&self, coord: Coordinate) -> bool {
        self.matching_order(coord).is_some()
    }

    /// Bounding box in ring space, or `None` if the region has no usable
    /// geometry.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.shape.as_ref()?.bounding_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Ring {
        Ring::new(vec![(min, min), (max, min), (max, max), (min, max)])
    }

    #[test]
    fn ring_contains_interior_point() {
        let ring = square(0.0, 10.0);
        assert!(ring.contains_xy(5.0, 5.0));
        assert!(!ring.contains_xy(15.0, 5.0));
    }

    #[test]
    fn ring_excludes_boundary_points() {
        let ring = square(0.0, 10.0);
        assert!(!ring.contains_xy(0.0, 5.0));
        assert!(!ring.contains_xy(10.0, 10.0));
    }

    #[test]
    fn degenerate_rings_contain_nothing() {
        let two = Ring::new(vec![(0.0, 0.0), (1.0, 1.0)]);
        assert!(two.is_degenerate());
        assert!(!two.contains_xy(0.5, 0.5));

        let closed_two = Ring::new(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert!(closed_two.is_degenerate());

        let empty = Ring::new(vec![]);
        assert!(empty.is_degenerate());
        assert!(!empty.contains_xy(0.0, 0.0));
        assert!(empty.bounding_box().is_none());
    }

    #[test]
    fn closing_vertex_is_optional() {
        let open = square(0.0, 4.0);
        let closed = Ring::new(vec![
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 4.0),
            (0.0, 4.0),
            (0.0, 0.0),
        ]);
        assert_eq!(open, closed);
    }

    #[test]
    fn non_finite_vertices_are_dropped() {
        let ring = Ring::new(vec![
            (0.0, 0.0),
            (f64::NAN, 1.0),
            (4.0, 0.0),
            (4.0, 4.0),
            (0.0, 4.0),
        ]);
        assert!(!ring.is_degenerate());
        assert!(ring.contains_xy(2.0, 2.0));
    }

    #[test]
    fn compound_contains_if_any_member_does() {
        let shape = RegionShape::Compound(vec![square(0.0, 1.0), square(10.0, 11.0)]);
        assert!(shape.contains_xy(10.5, 10.5));
        assert!(shape.contains_xy(0.5, 0.5));
        assert!(!shape.contains_xy(5.0, 5.0));
    }

    #[test]
    fn compound_bounding_box_covers_all_rings() {
        let shape = RegionShape::Compound(vec![
            square(0.0, 1.0),
            Ring::new(vec![(0.0, 0.0)]),
            square(10.0, 11.0),
        ]);
        let bbox = shape.bounding_box().unwrap();
        assert!((bbox.min_x - 0.0).abs() < f64::EPSILON);
        assert!((bbox.max_y - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn region_probes_lng_lat_before_lat_lng() {
        // Ring stored as (lng, lat) around lng -100..-90, lat 30..40.
        let region = Region::new(
            "Texas",
            Some(RegionShape::Simple(Ring::new(vec![
                (-100.0, 30.0),
                (-90.0, 30.0),
                (-90.0, 40.0),
                (-100.0, 40.0),
            ]))),
        );
        let coord = Coordinate::new(35.0, -95.0).unwrap();
        assert_eq!(region.matching_order(coord), Some(AxisOrder::LngLat));

        // The same region stored in the swapped frame still matches.
        let swapped = Region::new(
            "Texas",
            Some(RegionShape::Simple(Ring::new(vec![
                (30.0, -100.0),
                (30.0, -90.0),
                (40.0, -90.0),
                (40.0, -100.0),
            ]))),
        );
        assert_eq!(swapped.matching_order(coord), Some(AxisOrder::LatLng));
    }

    #[test]
    fn shapeless_region_contains_nothing() {
        let region = Region::new("Nowhere", None);
        assert!(!region.contains(Coordinate::new(1.0, 1.0).unwrap()));
        assert!(region.bounding_box().is_none());
    }

    #[test]
    fn coordinate_rejects_non_finite() {
        assert!(Coordinate::new(f64::NAN, 1.0).is_none());
        assert!(Coordinate::new(1.0, f64::INFINITY).is_none());
        assert!(Coordinate::new(0.0, 0.0).is_some());
    }

    #[test]
    fn axis_order_display() {
        assert_eq!(AxisOrder::LngLat.to_string(), "lng_lat");
        assert_eq!(AxisOrder::LatLng.as_ref(), "lat_lng");
    }
}
