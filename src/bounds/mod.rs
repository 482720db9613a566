mod file;

pub use file::from_file;

use std::fmt;

use crate::error::Error;

// Meters per degree of latitude at the equator
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Geographic bounding box in WGS84 degrees.
///
/// Field order follows the Overpass convention: south, west, north, east.
/// The constructor normalizes coordinates so that `south <= north` and
/// `west <= east` always hold; boxes are immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south: south.min(north),
            west: west.min(east),
            north: south.max(north),
            east: west.max(east),
        }
    }

    /// Square buffer of `buffer_meters` around a point, converted to degrees.
    ///
    /// Uses the same city-scale approximation as a local equirectangular
    /// projection:
    /// - 1 degree latitude ≈ 111,320 m
    /// - 1 degree longitude ≈ 111,320 m * cos(lat)
    ///
    /// Accurate enough for buffer-sized areas without pulling in a full
    /// proj dependency. The latitude span is clamped to the valid range.
    pub fn from_point(lat: f64, lon: f64, buffer_meters: f64) -> Result<Self, Error> {
        if !buffer_meters.is_finite() || buffer_meters <= 0.0 {
            return Err(Error::InvalidBuffer(buffer_meters));
        }

        let lat_delta = buffer_meters / METERS_PER_DEGREE;
        let lon_delta = buffer_meters / (METERS_PER_DEGREE * lat.to_radians().cos());

        Ok(Self::new(
            (lat - lat_delta).max(-90.0),
            lon - lon_delta,
            (lat + lat_delta).min(90.0),
            lon + lon_delta,
        ))
    }

    /// Extent of a set of (lon, lat) positions, reordered into the
    /// south/west/north/east form Overpass expects. `None` if empty.
    pub(crate) fn from_positions(positions: &[(f64, f64)]) -> Option<Self> {
        if positions.is_empty() {
            return None;
        }

        let mut west = f64::MAX;
        let mut east = f64::MIN;
        let mut south = f64::MAX;
        let mut north = f64::MIN;

        for &(lon, lat) in positions {
            west = west.min(lon);
            east = east.max(lon);
            south = south.min(lat);
            north = north.max(lat);
        }

        Some(Self::new(south, west, north, east))
    }
}

/// Formats as the Overpass `(south,west,north,east)` literal with fixed
/// six-decimal precision.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6},{:.6},{:.6},{:.6})",
            self.south, self.west, self.north, self.east
        )
    }
}
