//! Lecture/écriture GeoParquet via DuckDB
//!
//! Les artefacts sont des fichiers Parquet compressés (gzip) avec une
//! colonne géométrique encodée en WKB et des métadonnées `geo`
//! versionnées portant le CRS, conformes au schéma GeoParquet 1.0.0.
//!
//! L'écriture est atomique: export vers un fichier temporaire voisin,
//! puis renommage sous le nom canonique. Un échec en cours d'écriture
//! ne laisse jamais de fichier partiel observable.

use std::collections::BTreeSet;
use std::path::Path;

use duckdb::Connection;
use geo::Geometry;
use tracing::{debug, info};

use maillage::{to_multipolygon, CodeInsee, CommuneRecord, GeoTable};

use crate::error::PipelineError;

/// Version du schéma des métadonnées `geo`
const GEO_SCHEMA_VERSION: &str = "1.0.0";

/// Ligne d'un artefact de sortie: clé, nom, géométrie quelconque
#[derive(Debug, Clone)]
pub struct ArtifactRow {
    pub key: Option<String>,
    pub name: Option<String>,
    pub geometry: Geometry,
}

/// Écrit un artefact GeoParquet sous le nom canonique donné.
///
/// `id_col` et `name_col` nomment les deux colonnes attributaires
/// (ex: `dep_insee`, `dep_nom`).
pub fn write_artifact(
    path: &Path,
    epsg: u32,
    id_col: &str,
    name_col: &str,
    rows: &[ArtifactRow],
) -> Result<(), PipelineError> {
    let conn = Connection::open_in_memory()?;

    conn.execute(
        &format!(
            "CREATE TABLE export (\"{}\" VARCHAR, \"{}\" VARCHAR, geometry BLOB)",
            id_col, name_col
        ),
        [],
    )?;

    let mut geometry_types: BTreeSet<&'static str> = BTreeSet::new();
    {
        let mut appender = conn.appender("export")?;
        for row in rows {
            geometry_types.insert(geometry_type_name(&row.geometry));
            let bytes = wkb::geom_to_wkb(&row.geometry).map_err(|e| PipelineError::Wkb {
                entity_id: row.key.clone().unwrap_or_else(|| "<null>".into()),
                reason: format!("{:?}", e),
            })?;
            appender.append_row(duckdb::params![row.key, row.name, bytes])?;
        }
        appender.flush()?;
    }

    // Export atomique: fichier temporaire voisin puis renommage
    let tmp_path = path.with_extension("parquet.tmp");
    let metadata = geo_metadata(epsg, &geometry_types);
    let copied = conn.execute(
        &format!(
            "COPY export TO '{}' (FORMAT PARQUET, COMPRESSION gzip, KV_METADATA {{geo: '{}'}})",
            sql_escape(&tmp_path.to_string_lossy()),
            sql_escape(&metadata),
        ),
        [],
    );
    if let Err(e) = copied {
        // Pas de résidu temporaire après un export raté
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    std::fs::rename(&tmp_path, path)?;

    info!(path = %path.display(), rows = rows.len(), "Wrote artifact");
    Ok(())
}

/// Écrit une table communale (colonnes `com_insee`, `com_nom`)
pub fn write_commune_table(path: &Path, table: &GeoTable) -> Result<(), PipelineError> {
    let rows: Vec<ArtifactRow> = table
        .rows
        .iter()
        .map(|r| ArtifactRow {
            key: Some(r.insee.to_string()),
            name: Some(r.nom.clone()),
            geometry: Geometry::MultiPolygon(r.geometry.clone()),
        })
        .collect();
    write_artifact(path, table.epsg, "com_insee", "com_nom", &rows)
}

/// Lit une table communale GeoParquet.
///
/// Valide le schéma (colonnes `com_insee`, `com_nom`, `geometry`), la
/// présence du CRS dans les métadonnées `geo`, et les codes INSEE.
/// Les géométries non surfaciques sont rejetées. Aucune réparation
/// n'est faite ici.
pub fn read_commune_table(path: &Path) -> Result<GeoTable, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::SourceUnavailable {
            path: path.to_path_buf(),
        });
    }
    let file_name = path.display().to_string();
    let escaped = sql_escape(&path.to_string_lossy());
    let conn = Connection::open_in_memory()?;

    // Validation du schéma
    let mut stmt = conn.prepare(&format!(
        "SELECT column_name FROM (DESCRIBE SELECT * FROM read_parquet('{}'))",
        escaped
    ))?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    let missing: Vec<String> = ["com_insee", "com_nom", "geometry"]
        .iter()
        .filter(|c| !columns.iter().any(|have| have == *c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::schema(&file_name, missing));
    }

    let epsg = read_epsg(&conn, &escaped, &file_name)?;

    // Lecture des lignes
    let mut stmt = conn.prepare(&format!(
        "SELECT com_insee, com_nom, geometry FROM read_parquet('{}') ORDER BY com_insee",
        escaped
    ))?;
    let raw_rows: Vec<(String, String, Vec<u8>)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_, _>>()?;

    let mut table = GeoTable::new(epsg);
    for (code, nom, bytes) in raw_rows {
        let insee = CodeInsee::parse(&code)?;
        let geometry = wkb::wkb_to_geom(&mut bytes.as_slice()).map_err(|e| {
            PipelineError::Wkb {
                entity_id: insee.to_string(),
                reason: format!("{:?}", e),
            }
        })?;
        let geometry = to_multipolygon(geometry).ok_or_else(|| {
            PipelineError::Wkb {
                entity_id: insee.to_string(),
                reason: "non-surface geometry in commune table".into(),
            }
        })?;
        table.rows.push(CommuneRecord {
            insee,
            nom,
            geometry,
        });
    }

    debug!(path = %path.display(), rows = table.len(), epsg = epsg, "Read commune table");
    Ok(table)
}

/// Extrait le code EPSG des métadonnées `geo` du fichier
fn read_epsg(conn: &Connection, escaped: &str, file_name: &str) -> Result<u32, PipelineError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT decode(value) FROM parquet_kv_metadata('{}') WHERE decode(key) = 'geo'",
        escaped
    ))?;
    let mut rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let raw = match rows.next() {
        Some(value) => value?,
        None => return Err(PipelineError::crs(file_name, "no 'geo' metadata key")),
    };

    let parsed: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| PipelineError::crs(file_name, format!("invalid geo metadata: {}", e)))?;
    parsed
        .pointer("/columns/geometry/crs/epsg")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .ok_or_else(|| PipelineError::crs(file_name, "no EPSG code in geo metadata"))
}

/// Construit le JSON des métadonnées `geo` (GeoParquet)
fn geo_metadata(epsg: u32, geometry_types: &BTreeSet<&'static str>) -> String {
    let types: Vec<&str> = geometry_types.iter().copied().collect();
    serde_json::json!({
        "version": GEO_SCHEMA_VERSION,
        "primary_column": "geometry",
        "columns": {
            "geometry": {
                "encoding": "WKB",
                "geometry_types": types,
                "crs": { "epsg": epsg },
            }
        }
    })
    .to_string()
}

fn geometry_type_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        _ => "Geometry",
    }
}

/// Échappe une chaîne pour un littéral SQL DuckDB
fn sql_escape(value: &str) -> String {
    value.replace('\'', "''")
}
