//! osmgrab - Extract GeoJSON features from OpenStreetMap through the Overpass API

pub mod api;
pub mod bounds;
pub mod config;
pub mod convert;
pub mod error;
pub mod query;
