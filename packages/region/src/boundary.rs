//! Parses `GeoJSON` boundary datasets into [`Region`]s.
//!
//! Only the exterior (first) ring of each polygon is used. `Polygon`
//! features become [`RegionShape::Simple`] and `MultiPolygon` features
//! become [`RegionShape::Compound`]. Features with any other geometry are
//! kept with no shape, as are features whose geometry is missing or
//! invalid, so that one odd feature never fails the build.

use ev_map_region_models::{Region, RegionShape, Ring};
use geojson::{Geometry, PolygonType};
use serde_json::{Map, Value};

use crate::RegionError;

/// Property holding the display name in Census-derived boundary files.
pub const DEFAULT_NAME_PROPERTY: &str = "NAME";

/// Parses a `GeoJSON` `FeatureCollection` into regions, preserving the
/// dataset's feature order.
///
/// Features without a non-empty string name under `name_property` are
/// skipped with a warning. A missing, null or invalid `geometry` member
/// yields a region with no shape.
///
/// # Errors
///
/// Returns [`RegionError`] if the payload is not JSON or is not a
/// `FeatureCollection` with a `features` array.
pub fn parse_boundaries(bytes: &[u8], name_property: &str) -> Result<Vec<Region>, RegionError> {
    let payload: Value = serde_json::from_slice(bytes)?;

    let features = match &payload {
        Value::Object(object)
            if object.get("type").and_then(Value::as_str) == Some("FeatureCollection") =>
        {
            object
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| RegionError::Malformed {
                    message: "FeatureCollection has no features array".to_string(),
                })?
        }
        _ => {
            return Err(RegionError::Malformed {
                message: "expected a FeatureCollection".to_string(),
            });
        }
    };

    let mut regions = Vec::with_capacity(features.len());
    let mut unnamed = 0usize;
    let mut shapeless = 0usize;

    for (idx, feature) in features.iter().enumerate() {
        let Some(feature) = feature.as_object() else {
            log::warn!("Boundary feature {idx} is not an object, skipping");
            unnamed += 1;
            continue;
        };

        let Some(name) = feature_name(feature, name_property) else {
            log::warn!("Boundary feature {idx} has no '{name_property}' property, skipping");
            unnamed += 1;
            continue;
        };

        let geometry = feature_geometry(feature, &name);
        let shape = geometry.as_ref().and_then(geometry_shape);
        if shape.is_none() {
            log::warn!(
                "Boundary feature '{name}' has unsupported geometry type {}, it will resolve no points",
                geometry_type(geometry.as_ref())
            );
            shapeless += 1;
        }

        regions.push(Region::new(name, shape));
    }

    log::info!(
        "Parsed {} regions from {} boundary features ({unnamed} unnamed, {shapeless} without polygon geometry)",
        regions.len(),
        features.len(),
    );

    Ok(regions)
}

fn feature_name(feature: &Map<String, Value>, name_property: &str) -> Option<String> {
    feature
        .get("properties")?
        .get(name_property)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn feature_geometry(feature: &Map<String, Value>, name: &str) -> Option<Geometry> {
    let value = feature.get("geometry").filter(|v| !v.is_null())?;
    match Geometry::try_from(value.clone()) {
        Ok(geometry) => Some(geometry),
        Err(e) => {
            log::warn!("Boundary feature '{name}' has invalid geometry: {e}");
            None
        }
    }
}

fn geometry_shape(geometry: &Geometry) -> Option<RegionShape> {
    match &geometry.value {
        geojson::Value::Polygon(polygon) => Some(RegionShape::Simple(exterior_ring(polygon))),
        geojson::Value::MultiPolygon(polygons) => Some(RegionShape::Compound(
            polygons.iter().map(exterior_ring).collect(),
        )),
        _ => None,
    }
}

/// Builds a ring from the first ring of a polygon. Positions with fewer
/// than two ordinates are ignored; an empty polygon yields a degenerate
/// ring.
fn exterior_ring(polygon: &PolygonType) -> Ring {
    let vertices = polygon
        .first()
        .map(|ring| {
            ring.iter()
                .filter(|position| position.len() >= 2)
                .map(|position| (position[0], position[1]))
                .collect()
        })
        .unwrap_or_default();

    Ring::new(vertices)
}

fn geometry_type(geometry: Option<&Geometry>) -> &'static str {
    match geometry.map(|g| &g.value) {
        None => "null",
        Some(geojson::Value::Point(_)) => "Point",
        Some(geojson::Value::MultiPoint(_)) => "MultiPoint",
        Some(geojson::Value::LineString(_)) => "LineString",
        Some(geojson::Value::MultiLineString(_)) => "MultiLineString",
        Some(geojson::Value::Polygon(_)) => "Polygon",
        Some(geojson::Value::MultiPolygon(_)) => "MultiPolygon",
        Some(geojson::Value::GeometryCollection(_)) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_map_region_models::Coordinate;

    const FIXTURE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "NAME": "Square County" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[-100.0, 30.0], [-90.0, 30.0], [-90.0, 40.0], [-100.0, 40.0], [-100.0, 30.0]],
                        [[-96.0, 34.0], [-94.0, 34.0], [-94.0, 36.0], [-96.0, 36.0], [-96.0, 34.0]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Island County" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
                        [[[10.0, 10.0], [11.0, 10.0], [11.0, 11.0], [10.0, 11.0], [10.0, 10.0]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Capital" },
                "geometry": { "type": "Point", "coordinates": [5.0, 5.0] }
            },
            {
                "type": "Feature",
                "properties": { "OTHER": "No Name" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Nothing" },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "NAME": "No Geometry Key" }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Broken" },
                "geometry": { "type": "Polygon", "coordinates": "oops" }
            }
        ]
    }"#;

    #[test]
    fn parses_polygons_and_multipolygons_in_order() {
        let regions = parse_boundaries(FIXTURE.as_bytes(), DEFAULT_NAME_PROPERTY).unwrap();
        let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Square County",
                "Island County",
                "Capital",
                "Nothing",
                "No Geometry Key",
                "Broken"
            ]
        );

        assert!(matches!(regions[0].shape, Some(RegionShape::Simple(_))));
        match &regions[1].shape {
            Some(RegionShape::Compound(rings)) => assert_eq!(rings.len(), 2),
            other => panic!("expected compound shape, got {other:?}"),
        }
        assert!(regions[2].shape.is_none());
        assert!(regions[3].shape.is_none());
    }

    #[test]
    fn missing_or_invalid_geometry_keeps_a_shapeless_region() {
        let regions = parse_boundaries(FIXTURE.as_bytes(), DEFAULT_NAME_PROPERTY).unwrap();
        assert_eq!(regions[4].name, "No Geometry Key");
        assert!(regions[4].shape.is_none());
        assert_eq!(regions[5].name, "Broken");
        assert!(regions[5].shape.is_none());
    }

    #[test]
    fn rejects_collection_without_features() {
        let payload = r#"{ "type": "FeatureCollection" }"#;
        let err = parse_boundaries(payload.as_bytes(), DEFAULT_NAME_PROPERTY).unwrap_err();
        assert!(matches!(err, RegionError::Malformed { .. }));
    }

    #[test]
    fn only_the_exterior_ring_is_used() {
        let regions = parse_boundaries(FIXTURE.as_bytes(), DEFAULT_NAME_PROPERTY).unwrap();
        // Inside the hole of the second ring, but holes are ignored.
        let coord = Coordinate::new(35.0, -95.0).unwrap();
        assert!(regions[0].contains(coord));
    }

    #[test]
    fn compound_member_rings_are_tested_independently() {
        let regions = parse_boundaries(FIXTURE.as_bytes(), DEFAULT_NAME_PROPERTY).unwrap();
        let in_second_ring = Coordinate::new(10.5, 10.5).unwrap();
        assert!(regions[1].contains(in_second_ring));
    }

    #[test]
    fn honours_custom_name_property() {
        let regions = parse_boundaries(FIXTURE.as_bytes(), "OTHER").unwrap();
        let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["No Name"]);
    }

    #[test]
    fn rejects_non_feature_collections() {
        let geometry = r#"{ "type": "Point", "coordinates": [1.0, 2.0] }"#;
        let err = parse_boundaries(geometry.as_bytes(), DEFAULT_NAME_PROPERTY).unwrap_err();
        assert!(matches!(err, RegionError::Malformed { .. }));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_boundaries(b"{ not json", DEFAULT_NAME_PROPERTY).unwrap_err();
        assert!(matches!(err, RegionError::Json(_)));
    }

    #[test]
    fn empty_polygon_yields_degenerate_ring() {
        let payload = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "NAME": "Empty" },
                "geometry": { "type": "Polygon", "coordinates": [] }
            }]
        }"#;
        let regions = parse_boundaries(payload.as_bytes(), DEFAULT_NAME_PROPERTY).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(!regions[0].contains(Coordinate::new(0.0, 0.0).unwrap()));
    }
}
