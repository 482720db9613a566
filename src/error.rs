use std::path::PathBuf;

use thiserror::Error;

/// Fatal failure kinds surfaced by the pipeline.
///
/// Per-feature geometry defects (missing nodes, open rings, relations
/// without an outer ring) are not represented here: conversion skips those
/// features locally and reports them through the skipped count on
/// [`crate::convert::Conversion`].
#[derive(Debug, Error)]
pub enum Error {
    /// Buffer sizes must be positive, finite meters.
    #[error("invalid buffer size: {0} m (must be > 0)")]
    InvalidBuffer(f64),

    /// The input file could not be read as a georeferenced vector file.
    #[error("unable to read spatial extent from {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    /// The geocoding service was unreachable, errored, or found no match.
    #[error("geocoding failed: {0}")]
    Geocoding(String),

    /// Network failure, non-success status, or a non-JSON response body.
    #[error("overpass transport error: {0}")]
    Transport(String),

    /// The Overpass server rejected the query as malformed (HTTP 400).
    #[error("overpass rejected the query as malformed")]
    OverpassSyntax,
}
