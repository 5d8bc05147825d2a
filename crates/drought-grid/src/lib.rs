//! # drought-grid
//!
//! Processing-grid model for the drought monitoring batch pipeline.
//!
//! The deployment partitions its area of interest into fixed grid tiles
//! (20 km LAEA cells, one feature per tile in a GeoJSON file). Every batch
//! job — baseline statistics, z-normalization, DEM and TCD ingestion — is
//! dispatched per tile, so the grid file is the single source of truth for
//! what a run has to process.
//!
//! This crate loads that file once per run and exposes the tiles in file
//! order, with derived bounds for the steps that need a spatial envelope.
//!
//! ## Example
//!
//! ```no_run
//! use drought_grid::TileGrid;
//!
//! let grid = TileGrid::from_geojson_file("anciliary/grid_20_v2.geojson")?;
//! println!("{} tiles to process", grid.len());
//!
//! if let Some(total) = grid.total_bounds() {
//!     println!("grid envelope: {:?}", total);
//! }
//! # Ok::<(), drought_grid::GridError>(())
//! ```

mod error;
mod grid;
mod tile;

pub use error::GridError;
pub use grid::TileGrid;
pub use tile::{Bounds, Geometry, Position, Tile};

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
