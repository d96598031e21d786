//! Assemblage des couvertures nationales (France + DROM)
//!
//! Disposition naturelle: tout est reprojeté en Mercator monde
//! (EPSG:3395), positions géographiques vraies. Disposition compacte:
//! la métropole reste l'ancrage en Lambert-93 et chaque DROM est placé
//! par transformation affine dans sa boîte cible. Les quatre tables
//! (2 styles x 2 tiers) sont indépendantes.

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{info, warn};

use maillage::{apply_placement, GeoTable, Placement, Reprojector};

use crate::config::{Territory, COMPACT_EPSG, NATURAL_EPSG};
use crate::error::PipelineError;
use crate::naming::{self, Style, Tier};
use crate::report::SharedReport;
use crate::store::{self, geoparquet};

use super::PipelineContext;

const STAGE: &str = "compose";

/// Produit les quatre couvertures nationales en parallèle
pub fn run(ctx: &PipelineContext, report: &SharedReport) {
    let units: Vec<(Style, Tier)> = vec![
        (Style::Natural, Tier::Standard),
        (Style::Compact, Tier::Standard),
        (Style::Natural, Tier::Generalized),
        (Style::Compact, Tier::Generalized),
    ];

    units.par_iter().for_each(|&(style, tier)| {
        let unit = format!("frdrom{}-{}{}", style.segment(), ctx.year, tier.suffix());
        match compose_one(ctx, style, tier, report) {
            Ok(Outcome::Completed) => report.completed(STAGE),
            Ok(Outcome::Cached) => report.skipped(STAGE),
            Err(e) => {
                warn!(unit = unit.as_str(), error = %e, "Composite assembly failed");
                report.failure(STAGE, &unit, e.to_string());
            }
        }
    });
}

enum Outcome {
    Completed,
    Cached,
}

fn compose_one(
    ctx: &PipelineContext,
    style: Style,
    tier: Tier,
    report: &SharedReport,
) -> Result<Outcome, PipelineError> {
    let tier_dir = ctx.output.join(tier.dir_name());
    let out_path = tier_dir.join(naming::composite_file(style, &ctx.year, tier));
    if store::all_exist(&[out_path.clone()]) {
        return Ok(Outcome::Cached);
    }

    // L'ancrage métropolitain est obligatoire; les DROM manquants
    // dégradent gracieusement
    let anchor = load_tier_table(ctx, Territory::Fra, tier)?;

    let mut droms: Vec<(Territory, GeoTable)> = Vec::new();
    for &territory in &Territory::DROMS {
        match load_tier_table(ctx, territory, tier) {
            Ok(table) => droms.push((territory, table)),
            Err(PipelineError::SourceUnavailable { path }) => {
                warn!(territory = territory.code(), "Territory table missing, excluded from composite");
                report.warning(format!(
                    "composite {}{}: missing {} ({})",
                    style.segment(),
                    tier.suffix(),
                    territory.code(),
                    path.display()
                ));
            }
            Err(e) => return Err(e),
        }
    }

    let composite = match style {
        Style::Natural => compose_natural(anchor, droms)?,
        Style::Compact => compose_compact(ctx, anchor, droms)?,
    };

    if composite.is_empty() {
        return Err(PipelineError::empty(format!(
            "composite frdrom{}{}",
            style.segment(),
            tier.suffix()
        )));
    }

    geoparquet::write_commune_table(&out_path, &composite)?;
    info!(
        path = %out_path.display(),
        communes = composite.len(),
        "Composite assembled"
    );
    Ok(Outcome::Completed)
}

/// Reprojection de tous les territoires en Mercator monde
fn compose_natural(
    anchor: GeoTable,
    droms: Vec<(Territory, GeoTable)>,
) -> Result<GeoTable, PipelineError> {
    let mut parts = Vec::with_capacity(droms.len() + 1);

    for table in std::iter::once(anchor).chain(droms.into_iter().map(|(_, t)| t)) {
        let reprojector = Reprojector::new(table.epsg, NATURAL_EPSG)?;
        parts.push(reprojector.transform_table(&table)?);
    }

    Ok(GeoTable::concat(NATURAL_EPSG, parts))
}

/// Placement affine des DROM autour de l'ancrage Lambert-93.
///
/// Les coordonnées des DROM restent celles de leur CRS natif avant
/// placement: la transformation affine les amène directement dans le
/// repère compact, sans reprojection.
fn compose_compact(
    ctx: &PipelineContext,
    anchor: GeoTable,
    droms: Vec<(Territory, GeoTable)>,
) -> Result<GeoTable, PipelineError> {
    let mut parts = Vec::with_capacity(droms.len() + 1);

    // L'ancrage est déjà en Lambert-93
    let mut anchor = anchor;
    anchor.epsg = COMPACT_EPSG;
    parts.push(anchor);

    // L'index de placement suit l'ordre des DROM présents: un
    // territoire manquant libère sa boîte pour les suivants
    for (index, (territory, table)) in droms.into_iter().enumerate() {
        let extent = table.bounding_rect().ok_or_else(|| {
            PipelineError::empty(format!("extent of territory {}", territory.code()))
        })?;
        let placement = Placement::fit(
            extent,
            ctx.placement.side_max_box,
            ctx.placement.target_center(index),
            territory.code(),
        )?;
        parts.push(apply_placement(&table, &placement, COMPACT_EPSG));
    }

    Ok(GeoTable::concat(COMPACT_EPSG, parts))
}

fn load_tier_table(
    ctx: &PipelineContext,
    territory: Territory,
    tier: Tier,
) -> Result<GeoTable, PipelineError> {
    let path: PathBuf = ctx
        .output
        .join(tier.dir_name())
        .join(naming::territory_file(territory.code(), &ctx.year, tier));
    geoparquet::read_commune_table(&path)
}
