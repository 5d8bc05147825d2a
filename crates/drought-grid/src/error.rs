//! Error types for the grid crate.

use thiserror::Error;

/// Errors that can occur when loading or querying the processing grid.
#[derive(Debug, Error)]
pub enum GridError {
    /// I/O error reading the grid file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON syntax or structure error in the grid file.
    #[error("GeoJSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is valid JSON but not a GeoJSON FeatureCollection.
    #[error("Expected a FeatureCollection, found \"{kind}\"")]
    NotAFeatureCollection {
        /// The `type` value found at the document root.
        kind: String,
    },

    /// A feature has no usable tile identifier property.
    #[error("Feature #{feature_index} has no tile identifier (looked for \"tile_ids\", \"tile_id\", \"id\")")]
    MissingTileId {
        /// Zero-based position of the feature in the collection.
        feature_index: usize,
    },

    /// Two features carry the same tile identifier.
    #[error("Duplicate tile identifier \"{tile_id}\"")]
    DuplicateTileId {
        /// The repeated identifier.
        tile_id: String,
    },

    /// A feature has no geometry object.
    #[error("Tile \"{tile_id}\" has no geometry")]
    MissingGeometry {
        /// Identifier of the offending tile.
        tile_id: String,
    },

    /// A feature's geometry is not a polygon type.
    #[error("Tile \"{tile_id}\" has unsupported geometry type \"{kind}\" (expected Polygon or MultiPolygon)")]
    UnsupportedGeometry {
        /// Identifier of the offending tile.
        tile_id: String,
        /// The geometry `type` value found.
        kind: String,
    },

    /// A geometry has no coordinates to derive bounds from.
    #[error("Tile \"{tile_id}\" has an empty or malformed geometry")]
    EmptyGeometry {
        /// Identifier of the offending tile.
        tile_id: String,
    },
}
