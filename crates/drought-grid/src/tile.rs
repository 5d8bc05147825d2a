//! Single processing-grid tile representation.

use serde::{Deserialize, Serialize};

use crate::{GridError, Result};

/// Axis-aligned bounding box of a tile in grid coordinates.
///
/// The grid files carry projected coordinates (the drought deployment uses
/// a LAEA grid), so the fields are named x/y rather than lon/lat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum x (west edge).
    pub min_x: f64,
    /// Minimum y (south edge).
    pub min_y: f64,
    /// Maximum x (east edge).
    pub max_x: f64,
    /// Maximum y (north edge).
    pub max_y: f64,
}

impl Bounds {
    /// Check if a coordinate is within the bounds.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest bounds covering both `self` and `other`.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Width of the bounds along x.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounds along y.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A coordinate position. GeoJSON allows trailing elements (elevation);
/// only the first two are used for bounds derivation.
pub type Position = Vec<f64>;

/// Tile geometry as carried by the grid file.
///
/// Parsed just enough to derive bounds; the rings are otherwise passed
/// through verbatim into job documents for the per-tile workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single polygon: exterior ring followed by interior rings.
    Polygon(Vec<Vec<Position>>),
    /// A collection of polygons.
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// Iterate over every position in every ring.
    fn positions(&self) -> Box<dyn Iterator<Item = &Position> + '_> {
        match self {
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten()),
            Geometry::MultiPolygon(polys) => {
                Box::new(polys.iter().flatten().flatten())
            }
        }
    }
}

/// A single tile of the processing grid.
///
/// Immutable once loaded; the identifier is unique within a grid.
#[derive(Debug, Clone)]
pub struct Tile {
    id: String,
    geometry: Geometry,
    bounds: Bounds,
}

impl Tile {
    /// Build a tile from an identifier and geometry, deriving bounds.
    ///
    /// Fails if the geometry contains no valid two-element position.
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Result<Self> {
        let id = id.into();
        let bounds = derive_bounds(&geometry).ok_or_else(|| GridError::EmptyGeometry {
            tile_id: id.clone(),
        })?;
        Ok(Tile {
            id,
            geometry,
            bounds,
        })
    }

    /// Stable tile identifier (the `tile_ids` property of the grid file).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The tile's polygon geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Axis-aligned bounds derived from the geometry.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// Derive the bounding box of a geometry, ignoring malformed positions.
fn derive_bounds(geometry: &Geometry) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;
    for pos in geometry.positions() {
        if pos.len() < 2 {
            continue;
        }
        let point = Bounds {
            min_x: pos[0],
            min_y: pos[1],
            max_x: pos[0],
            max_y: pos[1],
        };
        bounds = Some(match bounds {
            Some(b) => b.union(&point),
            None => point,
        });
    }
    bounds
}
