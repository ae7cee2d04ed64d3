//! Minimal GeoPackage writer
//!
//! Writes feature layers as tables of one GeoPackage (SQLite) container,
//! enough for downstream GIS tools to open the result: required metadata
//! tables, application_id/user_version pragmas, and standard GeoPackage
//! geometry blobs (GP header + little-endian WKB).
//!
//! Supported geometry kinds: Point, MultiPoint, LineString,
//! MultiLineString. Writing a table that already exists replaces it.

use crate::error::{Error, Result};
use crate::vector::{bounding_box, geometry_kind, AttributeValue, FeatureCollection};
use geo_types::{Geometry, LineString, Point};
use rusqlite::{types::Value as SqlValue, Connection};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default spatial reference for written layers (WGS 84)
pub const DEFAULT_SRS_ID: i32 = 4326;

/// Reference to one table inside a GeoPackage container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub path: PathBuf,
    pub table: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.table)
    }
}

/// An open GeoPackage container
pub struct GeoPackage {
    conn: Connection,
    path: PathBuf,
}

impl GeoPackage {
    /// Open a container, creating it (and its metadata tables) if missing.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "application_id", 0x4750_4B47_i64)?;
        conn.pragma_update(None, "user_version", 10300_i64)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
                 srs_name TEXT NOT NULL,
                 srs_id INTEGER PRIMARY KEY,
                 organization TEXT NOT NULL,
                 organization_coordsys_id INTEGER NOT NULL,
                 definition TEXT NOT NULL,
                 description TEXT
             );
             CREATE TABLE IF NOT EXISTS gpkg_contents (
                 table_name TEXT PRIMARY KEY,
                 data_type TEXT NOT NULL,
                 identifier TEXT UNIQUE,
                 description TEXT DEFAULT '',
                 last_change DATETIME NOT NULL DEFAULT
                     (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
                 min_x DOUBLE,
                 min_y DOUBLE,
                 max_x DOUBLE,
                 max_y DOUBLE,
                 srs_id INTEGER,
                 CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id)
                     REFERENCES gpkg_spatial_ref_sys(srs_id)
             );
             CREATE TABLE IF NOT EXISTS gpkg_geometry_columns (
                 table_name TEXT NOT NULL,
                 column_name TEXT NOT NULL,
                 geometry_type_name TEXT NOT NULL,
                 srs_id INTEGER NOT NULL,
                 z TINYINT NOT NULL,
                 m TINYINT NOT NULL,
                 CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name)
             );",
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO gpkg_spatial_ref_sys VALUES
                 ('Undefined Cartesian SRS', -1, 'NONE', -1, 'undefined', NULL),
                 ('Undefined Geographic SRS', 0, 'NONE', 0, 'undefined', NULL),
                 ('WGS 84', 4326, 'EPSG', 4326,
                  'GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]',
                  NULL)",
            [],
        )?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a feature collection as table `table`, replacing any existing
    /// table of that name. Returns a reference to the written table.
    pub fn write_layer(&mut self, table: &str, layer: &FeatureCollection) -> Result<TableRef> {
        self.write_layer_with_srs(table, layer, DEFAULT_SRS_ID)
    }

    /// Like [`write_layer`](Self::write_layer) with an explicit srs_id.
    pub fn write_layer_with_srs(
        &mut self,
        table: &str,
        layer: &FeatureCollection,
        srs_id: i32,
    ) -> Result<TableRef> {
        let columns = attribute_columns(layer);
        let geom_type = layer_geometry_type(layer);
        let bbox = layer.bounding_box();

        let tx = self.conn.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)), [])?;
        tx.execute(
            "DELETE FROM gpkg_contents WHERE table_name = ?1",
            [table],
        )?;
        tx.execute(
            "DELETE FROM gpkg_geometry_columns WHERE table_name = ?1",
            [table],
        )?;

        let mut ddl = format!(
            "CREATE TABLE {} (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB",
            quote_ident(table)
        );
        for (name, affinity) in &columns {
            ddl.push_str(&format!(", {} {}", quote_ident(name), affinity));
        }
        ddl.push(')');
        tx.execute(&ddl, [])?;

        {
            let placeholders: Vec<String> =
                (1..=columns.len() + 1).map(|i| format!("?{i}")).collect();
            let col_names: Vec<String> = std::iter::once("geom".to_string())
                .chain(columns.iter().map(|(n, _)| quote_ident(n)))
                .collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                col_names.join(", "),
                placeholders.join(", ")
            );
            let mut stmt = tx.prepare(&sql)?;
            for feature in layer.iter() {
                let geom_blob: SqlValue = match &feature.geometry {
                    Some(g) => SqlValue::Blob(encode_gpkg_geometry(g, srs_id)?),
                    None => SqlValue::Null,
                };
                let mut row: Vec<SqlValue> = Vec::with_capacity(columns.len() + 1);
                row.push(geom_blob);
                for (name, _) in &columns {
                    row.push(match feature.get_property(name) {
                        Some(v) => attribute_to_sql(v),
                        None => SqlValue::Null,
                    });
                }
                stmt.execute(rusqlite::params_from_iter(row))?;
            }
        }

        tx.execute(
            "INSERT INTO gpkg_contents
                 (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id)
             VALUES (?1, 'features', ?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                table,
                bbox.map(|b| b.min_x),
                bbox.map(|b| b.min_y),
                bbox.map(|b| b.max_x),
                bbox.map(|b| b.max_y),
                srs_id,
            ],
        )?;
        tx.execute(
            "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', ?2, ?3, 0, 0)",
            rusqlite::params![table, geom_type, srs_id],
        )?;

        tx.commit()?;

        info!(table, rows = layer.len(), path = %self.path.display(), "wrote layer");
        Ok(TableRef {
            path: self.path.clone(),
            table: table.to_string(),
        })
    }

    /// Names of the feature tables registered in this container.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT table_name FROM gpkg_contents ORDER BY table_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Number of rows in a feature table.
    pub fn feature_count(&self, table: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column name/affinity pairs for the union of all attribute keys.
///
/// Affinity is taken from the first non-null value seen for each key.
fn attribute_columns(layer: &FeatureCollection) -> Vec<(String, &'static str)> {
    let mut columns: Vec<(String, &'static str)> = Vec::new();
    for feature in layer.iter() {
        for (key, value) in &feature.properties {
            if !columns.iter().any(|(name, _)| name == key) {
                columns.push((key.clone(), affinity(value)));
            }
        }
    }
    columns.sort_by(|a, b| a.0.cmp(&b.0));
    columns
}

fn affinity(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::Bool(_) | AttributeValue::Int(_) => "INTEGER",
        AttributeValue::Float(_) => "REAL",
        _ => "TEXT",
    }
}

fn attribute_to_sql(value: &AttributeValue) -> SqlValue {
    match value {
        AttributeValue::Null => SqlValue::Null,
        AttributeValue::Bool(b) => SqlValue::Integer(*b as i64),
        AttributeValue::Int(i) => SqlValue::Integer(*i),
        AttributeValue::Float(f) => SqlValue::Real(*f),
        AttributeValue::String(s) => SqlValue::Text(s.clone()),
    }
}

fn layer_geometry_type(layer: &FeatureCollection) -> &'static str {
    match layer.iter().find_map(|f| f.geometry.as_ref()) {
        Some(Geometry::Point(_)) => "POINT",
        Some(Geometry::MultiPoint(_)) => "MULTIPOINT",
        Some(Geometry::LineString(_)) => "LINESTRING",
        Some(Geometry::MultiLineString(_)) => "MULTILINESTRING",
        _ => "GEOMETRY",
    }
}

// ─── GeoPackage geometry blob ───────────────────────────────────────────

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;

/// Encode a geometry as a GeoPackage blob: "GP" header, little-endian
/// envelope, then standard WKB.
pub fn encode_gpkg_geometry(geom: &Geometry<f64>, srs_id: i32) -> Result<Vec<u8>> {
    let bbox = bounding_box(geom);
    let mut buf = Vec::with_capacity(64);

    buf.extend_from_slice(b"GP");
    buf.push(0); // version
    // flags: bit 0 = little endian, bits 3..1 = envelope indicator
    match bbox {
        Some(_) => buf.push(0b0000_0011), // xy envelope
        None => buf.push(0b0000_0001),    // no envelope
    }
    buf.extend_from_slice(&srs_id.to_le_bytes());
    if let Some(b) = bbox {
        for v in [b.min_x, b.max_x, b.min_y, b.max_y] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    encode_wkb(geom, &mut buf)?;
    debug!(kind = geometry_kind(geom), bytes = buf.len(), "encoded geometry");
    Ok(buf)
}

fn encode_wkb(geom: &Geometry<f64>, buf: &mut Vec<u8>) -> Result<()> {
    match geom {
        Geometry::Point(p) => wkb_point(p, buf),
        Geometry::LineString(ls) => wkb_linestring(ls, buf),
        Geometry::MultiPoint(mp) => {
            wkb_header(WKB_MULTIPOINT, buf);
            buf.extend_from_slice(&(mp.0.len() as u32).to_le_bytes());
            for p in &mp.0 {
                wkb_point(p, buf);
            }
        }
        Geometry::MultiLineString(mls) => {
            wkb_header(WKB_MULTILINESTRING, buf);
            buf.extend_from_slice(&(mls.0.len() as u32).to_le_bytes());
            for ls in &mls.0 {
                wkb_linestring(ls, buf);
            }
        }
        other => {
            return Err(Error::WrongGeometryType {
                expected: "point or line geometry",
                actual: geometry_kind(other),
            })
        }
    }
    Ok(())
}

fn wkb_header(geom_type: u32, buf: &mut Vec<u8>) {
    buf.push(1); // little endian
    buf.extend_from_slice(&geom_type.to_le_bytes());
}

fn wkb_point(p: &Point<f64>, buf: &mut Vec<u8>) {
    wkb_header(WKB_POINT, buf);
    buf.extend_from_slice(&p.x().to_le_bytes());
    buf.extend_from_slice(&p.y().to_le_bytes());
}

fn wkb_linestring(ls: &LineString<f64>, buf: &mut Vec<u8>) {
    wkb_header(WKB_LINESTRING, buf);
    buf.extend_from_slice(&(ls.0.len() as u32).to_le_bytes());
    for c in &ls.0 {
        buf.extend_from_slice(&c.x.to_le_bytes());
        buf.extend_from_slice(&c.y.to_le_bytes());
    }
}
