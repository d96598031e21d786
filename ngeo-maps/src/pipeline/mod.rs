//! Orchestration du pipeline
//!
//! Trois étapes s'enchaînent sur des listes de travail énumérables:
//! généralisation (territoire x tier), assemblage composite
//! (style x tier), agrégation en maillages (fichier x maille). Chaque
//! unité lit et écrit des fichiers indépendants; les échecs sont
//! attrapés à la frontière de l'unité et n'arrêtent pas les autres.

pub mod compose;
pub mod generalize;
pub mod mesh;

use std::path::PathBuf;
use std::time::Instant;

use crate::config::PlacementConfig;
use crate::report::{PipelineReport, SharedReport};

/// Paramètres partagés par toutes les étapes
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Répertoire des tables communales d'entrée
    pub input: PathBuf,

    /// Répertoire racine des artefacts produits
    pub output: PathBuf,

    /// Base DuckDB du référentiel attributaire
    pub db: PathBuf,

    /// Millésime (année de référence)
    pub year: String,

    /// Tolérance de simplification (unités planaires)
    pub tolerance: f64,

    /// Seuil de surface de la déduplication
    pub threshold: f64,

    /// Politique de placement compact
    pub placement: PlacementConfig,
}

/// Exécute le pipeline complet: generalize -> compose -> mesh
pub fn run_all(ctx: &PipelineContext) -> PipelineReport {
    let started = Instant::now();
    let report = SharedReport::new(&ctx.year);

    generalize::run(ctx, &report);
    compose::run(ctx, &report);
    mesh::run(ctx, &report);

    let mut report = report.into_inner();
    report.set_duration(started.elapsed());
    report.finalize();
    report
}
