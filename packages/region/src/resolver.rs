//! Point-to-region resolution.
//!
//! Regions are tested in dataset order and the first match wins. An R-tree
//! of region bounding boxes narrows the candidates, but the candidates are
//! still visited in dataset order so the result is identical to a linear
//! scan.

use ev_map_region_models::{AxisOrder, Coordinate, Region};
use rstar::{AABB, RTree, RTreeObject};

/// Bounding box of one region, keyed by its position in the dataset.
struct RegionEnvelope {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// A successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Name of the containing region.
    pub name: &'a str,
    /// Axis order under which the region matched.
    pub order: AxisOrder,
    /// Position of the region in the boundary dataset.
    pub index: usize,
}

/// Resolves coordinates to the region that contains them.
///
/// Built once per pipeline attempt and dropped with it.
pub struct RegionResolver {
    regions: Vec<Region>,
    index: RTree<RegionEnvelope>,
}

impl RegionResolver {
    /// Builds a resolver over `regions`, keeping their order.
    #[must_use]
    pub fn new(regions: Vec<Region>) -> Self {
        let envelopes: Vec<RegionEnvelope> = regions
            .iter()
            .enumerate()
            .filter_map(|(index, region)| {
                let bbox = region.bounding_box()?;
                Some(RegionEnvelope {
                    index,
                    envelope: AABB::from_corners(
                        [bbox.min_x, bbox.min_y],
                        [bbox.max_x, bbox.max_y],
                    ),
                })
            })
            .collect();

        log::debug!(
            "Indexed {} of {} regions with usable geometry",
            envelopes.len(),
            regions.len()
        );

        Self {
            regions,
            index: RTree::bulk_load(envelopes),
        }
    }

    /// Returns the name of the first region, in dataset order, containing
    /// `coord` under either axis order.
    #[must_use]
    pub fn resolve(&self, coord: Coordinate) -> Option<&str> {
        self.resolve_with_order(coord).map(|r| r.name)
    }

    /// Like [`Self::resolve`], but also reports which axis order matched.
    #[must_use]
    pub fn resolve_with_order(&self, coord: Coordinate) -> Option<Resolution<'_>> {
        let mut candidates: Vec<usize> = Vec::new();
        for order in AxisOrder::PROBE {
            let (x, y) = coord.to_xy(order);
            let query = AABB::from_point([x, y]);
            candidates.extend(
                self.index
                    .locate_in_envelope_intersecting(&query)
                    .map(|entry| entry.index),
            );
        }
        candidates.sort_unstable();
        candidates.dedup();

        candidates.into_iter().find_map(|index| {
            let region = &self.regions[index];
            region.matching_order(coord).map(|order| Resolution {
                name: &region.name,
                order,
                index,
            })
        })
    }

    /// All regions in dataset order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions, including those without geometry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if the resolver holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
