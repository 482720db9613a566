use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geojson::GeoJson;

use super::BoundingBox;
use crate::error::Error;

/// Bounding box from the spatial extent of a georeferenced vector file.
///
/// Supported formats are GeoJSON (`.geojson` / `.json`) and GPX (`.gpx`).
/// Both are defined on WGS84, so the extent is usable directly without a
/// reprojection step.
pub fn from_file(path: &Path) -> Result<BoundingBox, Error> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("geojson") | Some("json") => geojson_bounds(path),
        Some("gpx") => gpx_bounds(path),
        _ => Err(unreadable(path, "unsupported file extension")),
    }
}

fn unreadable(path: &Path, reason: impl ToString) -> Error {
    Error::UnreadableFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn geojson_bounds(path: &Path) -> Result<BoundingBox, Error> {
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).map_err(|e| unreadable(path, e))?;

    let mut positions = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in fc.features {
                if let Some(geometry) = feature.geometry {
                    collect_positions(&geometry.value, &mut positions);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = feature.geometry {
                collect_positions(&geometry.value, &mut positions);
            }
        }
        GeoJson::Geometry(geometry) => collect_positions(&geometry.value, &mut positions),
    }

    BoundingBox::from_positions(&positions).ok_or_else(|| unreadable(path, "no coordinates found"))
}

/// Gather every (lon, lat) position of a GeoJSON geometry.
fn collect_positions(value: &geojson::Value, out: &mut Vec<(f64, f64)>) {
    use geojson::Value;

    let push = |out: &mut Vec<(f64, f64)>, position: &[f64]| {
        if position.len() >= 2 {
            out.push((position[0], position[1]));
        }
    };

    match value {
        Value::Point(position) => push(out, position),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            for position in positions {
                push(out, position);
            }
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            for line in lines {
                for position in line {
                    push(out, position);
                }
            }
        }
        Value::MultiPolygon(polygons) => {
            for polygon in polygons {
                for ring in polygon {
                    for position in ring {
                        push(out, position);
                    }
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_positions(&geometry.value, out);
            }
        }
    }
}

fn gpx_bounds(path: &Path) -> Result<BoundingBox, Error> {
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let gpx = gpx::read(BufReader::new(file)).map_err(|e| unreadable(path, e))?;

    let mut positions = Vec::new();
    for waypoint in &gpx.waypoints {
        let point = waypoint.point();
        positions.push((point.x(), point.y()));
    }
    for track in &gpx.tracks {
        for segment in &track.segments {
            for waypoint in &segment.points {
                let point = waypoint.point();
                positions.push((point.x(), point.y()));
            }
        }
    }
    for route in &gpx.routes {
        for waypoint in &route.points {
            let point = waypoint.point();
            positions.push((point.x(), point.y()));
        }
    }

    BoundingBox::from_positions(&positions).ok_or_else(|| unreadable(path, "no coordinates found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_geojson_extent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "area.geojson",
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "geometry": {"type": "Point", "coordinates": [4.35, 50.85]},
                        "properties": {}
                    },
                    {
                        "type": "Feature",
                        "geometry": {
                            "type": "LineString",
                            "coordinates": [[4.30, 50.80], [4.40, 50.90]]
                        },
                        "properties": {}
                    }
                ]
            }"#,
        );

        let bbox = from_file(&path).unwrap();
        assert_eq!(bbox.south, 50.80);
        assert_eq!(bbox.west, 4.30);
        assert_eq!(bbox.north, 50.90);
        assert_eq!(bbox.east, 4.40);
    }

    #[test]
    fn test_gpx_extent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "trace.gpx",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test">
  <wpt lat="50.85" lon="4.35"></wpt>
  <wpt lat="50.80" lon="4.40"></wpt>
</gpx>"#,
        );

        let bbox = from_file(&path).unwrap();
        assert_eq!(bbox.south, 50.80);
        assert_eq!(bbox.west, 4.35);
        assert_eq!(bbox.north, 50.85);
        assert_eq!(bbox.east, 4.40);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "raster.tif", "not a vector file");

        assert!(matches!(
            from_file(&path),
            Err(Error::UnreadableFile { .. })
        ));
    }

    #[test]
    fn test_unparseable_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "broken.geojson", "{ not geojson");

        assert!(matches!(
            from_file(&path),
            Err(Error::UnreadableFile { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let path = std::path::Path::new("/nonexistent/area.geojson");
        assert!(matches!(
            from_file(path),
            Err(Error::UnreadableFile { .. })
        ));
    }
}
