//! Étape de généralisation: validation, simplification, déduplication
//!
//! Pour chaque territoire, trois artefacts communaux sont produits:
//! - `standard/com-{terr}-{année}.parquet`: géométries validées/réparées
//! - `gen/com-{terr}-{année}-simplified-{tol}m.parquet`: intermédiaire simplifié
//! - `gen/com-{terr}-{année}-gen.parquet`: simplifié puis dédupliqué/dissous

use rayon::prelude::*;
use tracing::{info, warn};

use maillage::{dedupe_and_dissolve, repair, simplify_table, GeoTable, Reprojector};

use crate::config::Territory;
use crate::error::PipelineError;
use crate::naming::{self, Tier};
use crate::report::SharedReport;
use crate::store::{self, geoparquet};

use super::PipelineContext;

const STAGE: &str = "generalize";

/// Traite tous les territoires en parallèle
pub fn run(ctx: &PipelineContext, report: &SharedReport) {
    Territory::ALL.par_iter().for_each(|&territory| {
        let unit = format!("{}-{}", territory.code(), ctx.year);
        match process_territory(ctx, territory) {
            Ok(Outcome::Completed) => report.completed(STAGE),
            Ok(Outcome::Cached) => report.skipped(STAGE),
            Err(PipelineError::SourceUnavailable { path }) if !territory.is_anchor() => {
                // Territoire d'outre-mer optionnel: dégradation gracieuse
                warn!(territory = territory.code(), path = %path.display(), "Input missing, territory skipped");
                report.warning(format!("{}: input missing ({})", unit, path.display()));
            }
            Err(e) => {
                warn!(territory = territory.code(), error = %e, "Generalization failed");
                report.failure(STAGE, &unit, e.to_string());
            }
        }
    });
}

enum Outcome {
    Completed,
    Cached,
}

fn process_territory(ctx: &PipelineContext, territory: Territory) -> Result<Outcome, PipelineError> {
    let standard_dir = ctx.output.join(Tier::Standard.dir_name());
    let gen_dir = ctx.output.join(Tier::Generalized.dir_name());

    let standard_path =
        standard_dir.join(naming::territory_file(territory.code(), &ctx.year, Tier::Standard));
    let simplified_path =
        gen_dir.join(naming::simplified_file(territory.code(), &ctx.year, ctx.tolerance));
    let gen_path =
        gen_dir.join(naming::territory_file(territory.code(), &ctx.year, Tier::Generalized));

    if store::all_exist(&[
        standard_path.clone(),
        simplified_path.clone(),
        gen_path.clone(),
    ]) {
        return Ok(Outcome::Cached);
    }
    std::fs::create_dir_all(&standard_dir)?;
    std::fs::create_dir_all(&gen_dir)?;

    // Réparation idempotente avant tout traitement
    let mut table = store::load_territory(&ctx.input, territory, &ctx.year)?;
    for row in &mut table.rows {
        table_repair(row);
    }
    table.sort_by_code();

    if !standard_path.is_file() {
        geoparquet::write_commune_table(&standard_path, &table)?;
    }

    // Le CRS doit être projeté avant simplification
    let projected = ensure_projected(table, territory)?;

    let simplified = simplify_table(&projected, ctx.tolerance);
    if !simplified_path.is_file() {
        geoparquet::write_commune_table(&simplified_path, &simplified)?;
    }

    let generalized = dedupe_and_dissolve(&simplified, ctx.threshold);
    if generalized.is_empty() {
        return Err(PipelineError::empty(format!(
            "dedupe for territory {}",
            territory.code()
        )));
    }
    if !gen_path.is_file() {
        geoparquet::write_commune_table(&gen_path, &generalized)?;
    }

    info!(
        territory = territory.code(),
        communes = generalized.len(),
        "Territory generalized"
    );
    Ok(Outcome::Completed)
}

fn table_repair(row: &mut maillage::CommuneRecord) {
    row.geometry = repair::repair(&row.geometry, row.insee.as_str());
}

/// Reprojette la table vers le CRS planaire du territoire si le CRS
/// d'entrée est géographique
fn ensure_projected(table: GeoTable, territory: Territory) -> Result<GeoTable, PipelineError> {
    if !maillage::is_geographic(table.epsg) {
        return Ok(table);
    }
    let reprojector = Reprojector::new(table.epsg, territory.epsg())?;
    Ok(reprojector.transform_table(&table)?)
}
