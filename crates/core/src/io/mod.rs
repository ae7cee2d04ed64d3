//! I/O operations for reading and writing vector layers

mod geojson_io;
mod gpkg;

pub use geojson_io::{read_layer, read_line_layer, read_point_layer, write_layer};
pub use gpkg::{encode_gpkg_geometry, GeoPackage, TableRef, DEFAULT_SRS_ID};
