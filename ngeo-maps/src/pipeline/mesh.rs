//! Étape d'agrégation en maillages administratifs
//!
//! Chaque table communale produite en amont (territoires et composites,
//! aux deux tiers) est croisée avec le catalogue des maillages. Une
//! unité de travail = (fichier de géométries, maille); elle produit
//! trois artefacts: surface, point représentatif, frontière.

use std::fs;
use std::path::PathBuf;

use geo::Geometry;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use maillage::{boundary, dissolve, representative_point, GeoTable, MeshRow, MeshUnit};

use crate::attributes::AttributeStore;
use crate::config::{mesh_catalog, MeshDefinition};
use crate::error::PipelineError;
use crate::naming::{self, GeometryKind, GeometrySource, Tier};
use crate::report::SharedReport;
use crate::store::{self, geoparquet};

use super::PipelineContext;

const STAGE: &str = "mesh";

/// Croise les géométries disponibles avec le catalogue de maillages
pub fn run(ctx: &PipelineContext, report: &SharedReport) {
    let attributes = match AttributeStore::open(&ctx.db) {
        Ok(store) => store,
        Err(e) => {
            warn!(db = %ctx.db.display(), error = %e, "Attribute store unavailable, mesh stage aborted");
            report.failure(STAGE, "attribute-store", e.to_string());
            return;
        }
    };

    let sources = enumerate_sources(ctx);
    if sources.is_empty() {
        report.warning("mesh: no commune geometry tables found".into());
        return;
    }

    let catalog = mesh_catalog();
    let units: Vec<(&(PathBuf, GeometrySource), &MeshDefinition)> = sources
        .iter()
        .flat_map(|source| catalog.iter().map(move |mesh| (source, mesh)))
        .filter(|((_, src), mesh)| {
            let eligible = !mesh.national_only || is_national_scope(&src.scope);
            if !eligible {
                debug!(
                    level = mesh.level,
                    scope = src.scope.as_str(),
                    "Mesh not defined for this scope, skipped"
                );
            }
            eligible
        })
        .collect();

    units.par_iter().for_each(|((path, source), mesh)| {
        let unit = format!(
            "{}-{}{}-{}{}",
            mesh.level,
            source.scope,
            source.style.segment(),
            ctx.year,
            source.tier.suffix()
        );
        match process_unit(ctx, &attributes, path, source, mesh) {
            Ok(Outcome::Completed) => report.completed(STAGE),
            Ok(Outcome::Cached) => report.skipped(STAGE),
            Err(e) => {
                warn!(unit = unit.as_str(), error = %e, "Mesh aggregation failed");
                report.failure(STAGE, &unit, e.to_string());
            }
        }
    });
}

enum Outcome {
    Completed,
    Cached,
}

/// Les maillages intercommunaux (EPCI, EPT) ne sont définis que sur la
/// couverture nationale
fn is_national_scope(scope: &str) -> bool {
    matches!(scope, "fra" | "frdrom")
}

/// Liste les tables communales des deux tiers, composites incluses
fn enumerate_sources(ctx: &PipelineContext) -> Vec<(PathBuf, GeometrySource)> {
    let mut sources = Vec::new();
    for tier in [Tier::Standard, Tier::Generalized] {
        let dir = ctx.output.join(tier.dir_name());
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(source) = naming::parse_geometry_file(file_name) {
                sources.push((path, source));
            }
        }
    }
    sources.sort_by(|a, b| a.0.cmp(&b.0));
    sources
}

fn process_unit(
    ctx: &PipelineContext,
    attributes: &AttributeStore,
    path: &PathBuf,
    source: &GeometrySource,
    mesh: &MeshDefinition,
) -> Result<Outcome, PipelineError> {
    let out_dir = naming::mesh_dir(&ctx.output, &source.scope, source.style);
    let out_paths: Vec<(GeometryKind, PathBuf)> = GeometryKind::ALL
        .iter()
        .map(|&kind| {
            let file = naming::mesh_file(
                mesh.level,
                &source.scope,
                source.style,
                &ctx.year,
                kind,
                source.tier,
            );
            (kind, out_dir.join(file))
        })
        .collect();

    if store::all_exist(&out_paths.iter().map(|(_, p)| p.clone()).collect::<Vec<_>>()) {
        return Ok(Outcome::Cached);
    }
    fs::create_dir_all(&out_dir)?;

    let table = geoparquet::read_commune_table(path)?;
    if table.is_empty() {
        return Err(PipelineError::empty(format!(
            "commune table {}",
            path.display()
        )));
    }

    let units = aggregate(attributes, &table, mesh)?;
    // Aucune unité, ou que des surfaces vides: ne rien écrire plutôt
    // qu'un jeu d'artefacts incomplet
    if units.iter().all(|u| u.surface.0.is_empty()) {
        return Err(PipelineError::empty(format!(
            "mesh {} over {}",
            mesh.level,
            source.scope
        )));
    }

    for (kind, out_path) in &out_paths {
        if out_path.is_file() {
            continue;
        }
        let rows = artifact_rows(&units, *kind);
        geoparquet::write_artifact(out_path, table.epsg, mesh.id_col, mesh.name_col, &rows)?;
    }

    info!(
        level = mesh.level,
        scope = source.scope.as_str(),
        units = units.len(),
        "Mesh aggregated"
    );
    Ok(Outcome::Completed)
}

/// Jointure attributaire puis dissolution.
///
/// Les communes sans correspondance dans le référentiel gardent une
/// clé nulle et restent dans la sortie. Le maillage communal est une
/// copie identité: pas de jointure, pas de dissolution.
fn aggregate(
    attributes: &AttributeStore,
    table: &GeoTable,
    mesh: &MeshDefinition,
) -> Result<Vec<MeshUnit>, PipelineError> {
    if !mesh.dissolve {
        return Ok(table
            .rows
            .iter()
            .map(|row| MeshUnit {
                key: Some(row.insee.to_string()),
                name: Some(row.nom.clone()),
                surface: row.geometry.clone(),
            })
            .collect());
    }

    let mapping = attributes.fetch(mesh)?;
    let mut unmatched = 0usize;
    let rows: Vec<MeshRow> = table
        .rows
        .iter()
        .map(|row| match mapping.get(row.insee.as_str()) {
            Some(attrs) => MeshRow {
                key: attrs.key.clone(),
                name: attrs.name.clone(),
                geometry: row.geometry.clone(),
            },
            None => {
                unmatched += 1;
                MeshRow {
                    key: None,
                    name: None,
                    geometry: row.geometry.clone(),
                }
            }
        })
        .collect();

    if unmatched > 0 {
        debug!(
            level = mesh.level,
            unmatched = unmatched,
            "Communes without attribute match, kept under null key"
        );
    }

    Ok(dissolve(rows))
}

/// Dérive les lignes d'un artefact pour une représentation donnée
fn artifact_rows(units: &[MeshUnit], kind: GeometryKind) -> Vec<geoparquet::ArtifactRow> {
    units
        .iter()
        .filter_map(|unit| {
            let geometry = match kind {
                GeometryKind::Surface => Geometry::MultiPolygon(unit.surface.clone()),
                GeometryKind::Boundary => Geometry::MultiLineString(boundary(&unit.surface)),
                GeometryKind::Centroid => {
                    let Some(point) = representative_point(&unit.surface) else {
                        debug!(
                            key = unit.key.as_deref().unwrap_or("<null>"),
                            "Empty surface, no representative point"
                        );
                        return None;
                    };
                    Geometry::Point(point)
                }
            };
            Some(geoparquet::ArtifactRow {
                key: unit.key.clone(),
                name: unit.name.clone(),
                geometry,
            })
        })
        .collect()
}
