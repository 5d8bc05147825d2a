//! Processing grid loaded from a GeoJSON FeatureCollection.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::{Bounds, Geometry, GridError, Result, Tile};

/// Property names probed, in order, for the tile identifier.
const ID_PROPERTIES: [&str; 3] = ["tile_ids", "tile_id", "id"];

/// Document model for the grid file. Only the fields the runner needs
/// are parsed; everything else in the file is ignored.
#[derive(Debug, Deserialize)]
struct FeatureCollectionDoc {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

/// The full processing grid for one run.
///
/// Loaded once per run from a GeoJSON FeatureCollection; tiles keep the
/// order they appear in the file, which is the order the batch runner
/// attempts them in.
///
/// # Example
///
/// ```no_run
/// use drought_grid::TileGrid;
///
/// let grid = TileGrid::from_geojson_file("anciliary/grid_20_v2.geojson")?;
/// for tile in grid.iter() {
///     println!("{}", tile.id());
/// }
/// # Ok::<(), drought_grid::GridError>(())
/// ```
#[derive(Debug)]
pub struct TileGrid {
    tiles: Vec<Tile>,
    by_id: HashMap<String, usize>,
}

impl TileGrid {
    /// Load a grid from a GeoJSON file on disk.
    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&text)
    }

    /// Parse a grid from GeoJSON text.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let doc: FeatureCollectionDoc = serde_json::from_str(text)?;
        if doc.kind != "FeatureCollection" {
            return Err(GridError::NotAFeatureCollection { kind: doc.kind });
        }

        let mut tiles = Vec::with_capacity(doc.features.len());
        let mut by_id = HashMap::with_capacity(doc.features.len());
        for (feature_index, feature) in doc.features.into_iter().enumerate() {
            let tile = parse_feature(feature_index, feature)?;
            if by_id.contains_key(tile.id()) {
                return Err(GridError::DuplicateTileId {
                    tile_id: tile.id().to_string(),
                });
            }
            by_id.insert(tile.id().to_string(), tiles.len());
            tiles.push(tile);
        }

        Ok(TileGrid { tiles, by_id })
    }

    /// Number of tiles in the grid.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True if the grid has no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterate tiles in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    /// Look up a tile by identifier.
    pub fn get(&self, tile_id: &str) -> Option<&Tile> {
        self.by_id.get(tile_id).map(|&i| &self.tiles[i])
    }

    /// Union of every tile's bounds, or `None` for an empty grid.
    ///
    /// The DEM ingestion prepare step loads one elevation mosaic covering
    /// the whole grid, so it works from these total bounds rather than
    /// per-tile bounds.
    pub fn total_bounds(&self) -> Option<Bounds> {
        let mut total: Option<Bounds> = None;
        for tile in &self.tiles {
            let b = tile.bounds();
            total = Some(match total {
                Some(t) => t.union(&b),
                None => b,
            });
        }
        total
    }
}

impl<'a> IntoIterator for &'a TileGrid {
    type Item = &'a Tile;
    type IntoIter = std::slice::Iter<'a, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn parse_feature(feature_index: usize, feature: FeatureDoc) -> Result<Tile> {
    let tile_id = feature
        .properties
        .as_ref()
        .and_then(|props| {
            ID_PROPERTIES
                .iter()
                .find_map(|key| props.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .ok_or(GridError::MissingTileId { feature_index })?;

    let geometry_value = feature
        .geometry
        .filter(|g| !g.is_null())
        .ok_or_else(|| GridError::MissingGeometry {
            tile_id: tile_id.clone(),
        })?;

    let kind = geometry_value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();
    let geometry: Geometry =
        serde_json::from_value(geometry_value).map_err(|_| GridError::UnsupportedGeometry {
            tile_id: tile_id.clone(),
            kind,
        })?;

    Tile::new(tile_id, geometry)
}
