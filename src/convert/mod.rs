use std::collections::HashMap;

use geo::Contains;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};

use crate::api::{Element, OverpassResponse};

/// Requested output geometry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GeometryKind {
    Point,
    Linestring,
    Polygon,
    Multipolygon,
}

/// Conversion result: the feature collection plus the number of elements
/// that were dropped because their geometry could not be resolved (missing
/// nodes, open rings, relations without an outer ring).
#[derive(Debug)]
pub struct Conversion {
    pub collection: FeatureCollection,
    pub skipped: usize,
}

/// Convert an Overpass response into a GeoJSON FeatureCollection of the
/// requested kind.
///
/// Features are emitted in the order their source elements appear in the
/// response. Elements with unresolvable geometry are skipped and counted
/// rather than failing the whole conversion.
pub fn as_geojson(response: &OverpassResponse, kind: GeometryKind) -> Conversion {
    let nodes = node_lookup(response);
    match kind {
        GeometryKind::Point => points(response),
        GeometryKind::Linestring => linestrings(response, &nodes),
        GeometryKind::Polygon => polygons(response, &nodes),
        GeometryKind::Multipolygon => multipolygons(response, &nodes),
    }
}

/// Position in GeoJSON order: [longitude, latitude]
type Position = Vec<f64>;

/// id -> (lon, lat) for every node in the response. Built once per
/// response, shared by the per-kind builders, never mutated.
fn node_lookup(response: &OverpassResponse) -> HashMap<u64, (f64, f64)> {
    response
        .elements
        .iter()
        .filter(|e| e.type_ == "node")
        .filter_map(|e| {
            let lat = e.lat?;
            let lon = e.lon?;
            Some((e.id, (lon, lat)))
        })
        .collect()
}

/// id -> node refs for every way in the response; relations resolve their
/// member ways through this.
fn way_lookup(response: &OverpassResponse) -> HashMap<u64, &[u64]> {
    response
        .elements
        .iter()
        .filter(|e| e.type_ == "way")
        .filter_map(|e| Some((e.id, e.nodes.as_deref()?)))
        .collect()
}

/// Resolve a way's node refs to positions, in order. `None` if any ref is
/// absent from the lookup.
fn resolve_coords(node_refs: &[u64], nodes: &HashMap<u64, (f64, f64)>) -> Option<Vec<Position>> {
    node_refs
        .iter()
        .map(|id| nodes.get(id).map(|&(lon, lat)| vec![lon, lat]))
        .collect()
}

/// A ring is closed when it has at least 4 positions and the first equals
/// the last.
fn is_closed(coords: &[Position]) -> bool {
    if coords.len() < 4 {
        return false;
    }
    let first = &coords[0];
    let last = &coords[coords.len() - 1];
    (first[0] - last[0]).abs() < 1e-9 && (first[1] - last[1]).abs() < 1e-9
}

fn properties(tags: &Option<HashMap<String, String>>) -> JsonObject {
    tags.as_ref()
        .map(|tags| {
            tags.iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                .collect()
        })
        .unwrap_or_default()
}

fn feature(element: &Element, value: Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(Id::Number(element.id.into())),
        properties: Some(properties(&element.tags)),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// One Feature per node element carrying a non-empty tag mapping. Bare
/// skeleton nodes pulled in by the query's down-recursion are not features.
fn points(response: &OverpassResponse) -> Conversion {
    let mut features = Vec::new();

    for element in &response.elements {
        if element.type_ != "node" {
            continue;
        }
        match &element.tags {
            Some(tags) if !tags.is_empty() => {}
            _ => continue,
        }
        let (lat, lon) = match (element.lat, element.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => continue,
        };
        features.push(feature(element, Value::Point(vec![lon, lat])));
    }

    Conversion {
        collection: collection(features),
        skipped: 0,
    }
}

/// One Feature per way element, node refs resolved in order. Ways
/// referencing a node absent from the response are skipped.
fn linestrings(response: &OverpassResponse, nodes: &HashMap<u64, (f64, f64)>) -> Conversion {
    let mut features = Vec::new();
    let mut skipped = 0;

    for element in &response.elements {
        if element.type_ != "way" {
            continue;
        }
        let node_refs = match &element.nodes {
            Some(refs) => refs,
            None => {
                skipped += 1;
                continue;
            }
        };
        match resolve_coords(node_refs, nodes) {
            Some(coords) if coords.len() >= 2 => {
                features.push(feature(element, Value::LineString(coords)));
            }
            _ => skipped += 1,
        }
    }

    Conversion {
        collection: collection(features),
        skipped,
    }
}

/// One Feature per closed way. Open rings are skipped, not repaired.
fn polygons(response: &OverpassResponse, nodes: &HashMap<u64, (f64, f64)>) -> Conversion {
    let mut features = Vec::new();
    let mut skipped = 0;

    for element in &response.elements {
        if element.type_ != "way" {
            continue;
        }
        let node_refs = match &element.nodes {
            Some(refs) => refs,
            None => {
                skipped += 1;
                continue;
            }
        };
        match resolve_coords(node_refs, nodes) {
            Some(coords) if is_closed(&coords) => {
                features.push(feature(element, Value::Polygon(vec![coords])));
            }
            _ => skipped += 1,
        }
    }

    Conversion {
        collection: collection(features),
        skipped,
    }
}

/// One Feature per relation element.
///
/// Member ways are resolved through the way and node lookups, partitioned
/// by role, and each closed ring is kept. Inner rings are grouped with the
/// first outer ring that spatially contains them; inners landing in no
/// outer are dropped. Relations with zero usable outer rings are skipped.
fn multipolygons(response: &OverpassResponse, nodes: &HashMap<u64, (f64, f64)>) -> Conversion {
    let ways = way_lookup(response);
    let mut features = Vec::new();
    let mut skipped = 0;

    for element in &response.elements {
        if element.type_ != "relation" {
            continue;
        }

        let mut outers: Vec<Vec<Position>> = Vec::new();
        let mut inners: Vec<Vec<Position>> = Vec::new();

        for member in element.members.iter().flatten() {
            if member.type_ != "way" {
                continue;
            }
            let node_refs = match ways.get(&member.ref_) {
                Some(refs) => refs,
                None => continue,
            };
            let coords = match resolve_coords(node_refs, nodes) {
                Some(coords) if is_closed(&coords) => coords,
                _ => continue,
            };
            match member.role.as_str() {
                "outer" => outers.push(coords),
                "inner" => inners.push(coords),
                _ => {}
            }
        }

        if outers.is_empty() {
            skipped += 1;
            continue;
        }

        // One polygon per outer ring; each inner joins its enclosing outer
        let mut polygons: Vec<Vec<Vec<Position>>> =
            outers.into_iter().map(|outer| vec![outer]).collect();
        for inner in inners {
            if let Some(polygon) = polygons.iter_mut().find(|p| ring_contains(&p[0], &inner)) {
                polygon.push(inner);
            }
        }

        features.push(feature(element, Value::MultiPolygon(polygons)));
    }

    Conversion {
        collection: collection(features),
        skipped,
    }
}

/// Point-in-polygon test on a representative vertex of the candidate inner
/// ring.
fn ring_contains(outer: &[Position], inner: &[Position]) -> bool {
    let exterior: geo::LineString = outer
        .iter()
        .map(|position| geo::Coord {
            x: position[0],
            y: position[1],
        })
        .collect();
    let polygon = geo::Polygon::new(exterior, vec![]);

    inner
        .first()
        .is_some_and(|position| polygon.contains(&geo::Point::new(position[0], position[1])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Member;

    fn node(id: u64, lat: f64, lon: f64) -> Element {
        Element {
            type_: "node".to_string(),
            id,
            lat: Some(lat),
            lon: Some(lon),
            nodes: None,
            members: None,
            tags: None,
        }
    }

    fn tagged_node(id: u64, lat: f64, lon: f64, key: &str, value: &str) -> Element {
        Element {
            tags: Some(HashMap::from([(key.to_string(), value.to_string())])),
            ..node(id, lat, lon)
        }
    }

    fn way(id: u64, nodes: Vec<u64>) -> Element {
        Element {
            type_: "way".to_string(),
            id,
            lat: None,
            lon: None,
            nodes: Some(nodes),
            members: None,
            tags: None,
        }
    }

    fn relation(id: u64, members: Vec<(u64, &str)>) -> Element {
        Element {
            type_: "relation".to_string(),
            id,
            lat: None,
            lon: None,
            nodes: None,
            members: Some(
                members
                    .into_iter()
                    .map(|(ref_, role)| Member {
                        type_: "way".to_string(),
                        ref_,
                        role: role.to_string(),
                    })
                    .collect(),
            ),
            tags: None,
        }
    }

    fn geometry_value(feature: &Feature) -> &Value {
        &feature.geometry.as_ref().unwrap().value
    }

    /// Four nodes forming a unit square plus a closed way over them
    fn square(way_id: u64, node_base: u64, origin: (f64, f64), size: f64) -> Vec<Element> {
        let (lat, lon) = origin;
        vec![
            node(node_base, lat, lon),
            node(node_base + 1, lat, lon + size),
            node(node_base + 2, lat + size, lon + size),
            node(node_base + 3, lat + size, lon),
            way(
                way_id,
                vec![
                    node_base,
                    node_base + 1,
                    node_base + 2,
                    node_base + 3,
                    node_base,
                ],
            ),
        ]
    }

    #[test]
    fn test_points_tagged_nodes_only() {
        let response = OverpassResponse {
            elements: vec![
                tagged_node(1, 50.85, 4.35, "amenity", "fuel"),
                node(2, 50.86, 4.36),
                tagged_node(3, 50.87, 4.37, "amenity", "cafe"),
            ],
        };

        let conversion = as_geojson(&response, GeometryKind::Point);
        let features = &conversion.collection.features;
        assert_eq!(features.len(), 2);
        assert_eq!(conversion.skipped, 0);

        // response order preserved
        assert_eq!(features[0].id, Some(Id::Number(1.into())));
        assert_eq!(features[1].id, Some(Id::Number(3.into())));

        // coordinates in [lon, lat] order
        match geometry_value(&features[0]) {
            Value::Point(position) => assert_eq!(position, &vec![4.35, 50.85]),
            other => panic!("expected Point, got {:?}", other),
        }

        let properties = features[0].properties.as_ref().unwrap();
        assert_eq!(
            properties.get("amenity"),
            Some(&JsonValue::String("fuel".to_string()))
        );
    }

    #[test]
    fn test_linestrings_resolve_node_refs() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 50.85, 4.35),
                node(2, 50.86, 4.36),
                node(3, 50.87, 4.37),
                way(100, vec![1, 2, 3]),
            ],
        };

        let conversion = as_geojson(&response, GeometryKind::Linestring);
        assert_eq!(conversion.collection.features.len(), 1);
        assert_eq!(conversion.skipped, 0);

        match geometry_value(&conversion.collection.features[0]) {
            Value::LineString(coords) => {
                assert_eq!(coords.len(), 3);
                assert_eq!(coords[0], vec![4.35, 50.85]);
                assert_eq!(coords[2], vec![4.37, 50.87]);
            }
            other => panic!("expected LineString, got {:?}", other),
        }
    }

    #[test]
    fn test_linestring_missing_node_skipped() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 50.85, 4.35),
                node(2, 50.86, 4.36),
                way(100, vec![1, 2, 99]),
                way(101, vec![1, 2]),
            ],
        };

        let conversion = as_geojson(&response, GeometryKind::Linestring);
        assert_eq!(conversion.collection.features.len(), 1);
        assert_eq!(conversion.skipped, 1);
        assert_eq!(
            conversion.collection.features[0].id,
            Some(Id::Number(101.into()))
        );
    }

    #[test]
    fn test_polygon_closed_triangle() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 50.85, 4.35),
                node(2, 50.86, 4.36),
                node(3, 50.85, 4.37),
                way(100, vec![1, 2, 3, 1]),
            ],
        };

        let conversion = as_geojson(&response, GeometryKind::Polygon);
        assert_eq!(conversion.collection.features.len(), 1);
        assert_eq!(conversion.skipped, 0);

        match geometry_value(&conversion.collection.features[0]) {
            Value::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 4);
                assert_eq!(rings[0][0], rings[0][3]);
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_polygon_open_way_skipped() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 50.85, 4.35),
                node(2, 50.86, 4.36),
                node(3, 50.85, 4.37),
                way(100, vec![1, 2, 3]),
            ],
        };

        let conversion = as_geojson(&response, GeometryKind::Polygon);
        assert!(conversion.collection.features.is_empty());
        assert_eq!(conversion.skipped, 1);
    }

    #[test]
    fn test_multipolygon_groups_inner_with_outer() {
        let mut elements = square(100, 1, (50.0, 4.0), 1.0);
        elements.extend(square(101, 11, (50.25, 4.25), 0.5));
        elements.push(relation(500, vec![(100, "outer"), (101, "inner")]));
        let response = OverpassResponse { elements };

        let conversion = as_geojson(&response, GeometryKind::Multipolygon);
        assert_eq!(conversion.collection.features.len(), 1);
        assert_eq!(conversion.skipped, 0);

        match geometry_value(&conversion.collection.features[0]) {
            Value::MultiPolygon(polygons) => {
                assert_eq!(polygons.len(), 1);
                // one outer ring plus its nested inner
                assert_eq!(polygons[0].len(), 2);
                assert_eq!(polygons[0][0][0], vec![4.0, 50.0]);
                assert_eq!(polygons[0][1][0], vec![4.25, 50.25]);
            }
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_multipolygon_without_outer_skipped() {
        let mut elements = square(100, 1, (50.0, 4.0), 1.0);
        elements.push(relation(500, vec![(100, "inner")]));
        let response = OverpassResponse { elements };

        let conversion = as_geojson(&response, GeometryKind::Multipolygon);
        assert!(conversion.collection.features.is_empty());
        assert_eq!(conversion.skipped, 1);
    }

    #[test]
    fn test_multipolygon_stray_inner_dropped() {
        // inner ring well outside the outer ring
        let mut elements = square(100, 1, (50.0, 4.0), 1.0);
        elements.extend(square(101, 11, (60.0, 14.0), 0.5));
        elements.push(relation(500, vec![(100, "outer"), (101, "inner")]));
        let response = OverpassResponse { elements };

        let conversion = as_geojson(&response, GeometryKind::Multipolygon);
        assert_eq!(conversion.collection.features.len(), 1);

        match geometry_value(&conversion.collection.features[0]) {
            Value::MultiPolygon(polygons) => {
                assert_eq!(polygons.len(), 1);
                assert_eq!(polygons[0].len(), 1);
            }
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_multipolygon_open_member_ring_ignored() {
        let mut elements = square(100, 1, (50.0, 4.0), 1.0);
        // an open way cannot contribute a ring
        elements.push(way(101, vec![1, 2, 3]));
        elements.push(relation(500, vec![(100, "outer"), (101, "inner")]));
        let response = OverpassResponse { elements };

        let conversion = as_geojson(&response, GeometryKind::Multipolygon);
        assert_eq!(conversion.collection.features.len(), 1);
        assert_eq!(conversion.skipped, 0);

        match geometry_value(&conversion.collection.features[0]) {
            Value::MultiPolygon(polygons) => assert_eq!(polygons[0].len(), 1),
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_collection_serializes_as_feature_collection() {
        let response = OverpassResponse {
            elements: vec![tagged_node(1, 50.85, 4.35, "amenity", "fuel")],
        };

        let conversion = as_geojson(&response, GeometryKind::Point);
        let json = serde_json::to_value(&conversion.collection).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["properties"]["amenity"], "fuel");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
    }
}
