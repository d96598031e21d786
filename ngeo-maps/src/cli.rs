//! Définition et implémentation des commandes CLI
//!
//! - `run`: pipeline complet (generalize -> compose -> mesh)
//! - `generalize`, `compose`, `mesh`: une seule étape
//!
//! Les étapes lisent et écrivent des fichiers: relancer une commande
//! après un échec partiel ne refait que les artefacts manquants.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use tracing::info;

use crate::config::PlacementConfig;
use crate::pipeline::{self, PipelineContext};
use crate::report::{RunStatus, SharedReport};

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline: generalize, compose, mesh
    Run {
        #[command(flatten)]
        args: PipelineArgs,
    },

    /// Validate, simplify and dedupe the per-territory commune tables
    Generalize {
        #[command(flatten)]
        args: PipelineArgs,
    },

    /// Assemble the national coverage (natural and compact layouts)
    Compose {
        #[command(flatten)]
        args: PipelineArgs,
    },

    /// Aggregate commune tables into administrative meshes
    Mesh {
        #[command(flatten)]
        args: PipelineArgs,
    },
}

/// Paramètres communs à toutes les commandes
#[derive(Args)]
pub struct PipelineArgs {
    /// Directory holding the input commune tables (com-{terr}-{year}.parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Root directory for produced artifacts
    #[arg(short, long)]
    pub output: PathBuf,

    /// DuckDB attribute database (défaut : env NGEO_DB / ngeo.duckdb)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Millésime (reference year, e.g. 2025)
    #[arg(short, long)]
    pub year: String,

    /// Simplification tolerance in planar units (meters)
    #[arg(long, default_value_t = maillage::DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Surface threshold for duplicated fragment removal
    #[arg(long, default_value_t = maillage::DEFAULT_SURFACE_THRESHOLD)]
    pub threshold: f64,

    /// Maximum number of work units processed concurrently
    #[arg(long, alias = "threads")]
    pub jobs: Option<usize>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl PipelineArgs {
    fn context(&self) -> PipelineContext {
        let db = self
            .db
            .clone()
            .or_else(|| std::env::var_os("NGEO_DB").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("ngeo.duckdb"));

        PipelineContext {
            input: self.input.clone(),
            output: self.output.clone(),
            db,
            year: self.year.clone(),
            tolerance: self.tolerance,
            threshold: self.threshold,
            placement: PlacementConfig::default(),
        }
    }

    fn init_thread_pool(&self) -> Result<()> {
        let jobs = self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()?;
        info!(jobs = jobs, "Worker pool initialized");
        Ok(())
    }
}

/// Exécute la commande `run`
pub fn cmd_run(args: &PipelineArgs) -> Result<()> {
    args.init_thread_pool()?;
    let ctx = args.context();
    let report = pipeline::run_all(&ctx);
    finish(args, report)
}

/// Exécute une étape isolée
pub fn cmd_stage(args: &PipelineArgs, stage: Stage) -> Result<()> {
    args.init_thread_pool()?;
    let ctx = args.context();
    let started = Instant::now();
    let shared = SharedReport::new(&ctx.year);

    match stage {
        Stage::Generalize => pipeline::generalize::run(&ctx, &shared),
        Stage::Compose => pipeline::compose::run(&ctx, &shared),
        Stage::Mesh => pipeline::mesh::run(&ctx, &shared),
    }

    let mut report = shared.into_inner();
    report.set_duration(started.elapsed());
    report.finalize();
    finish(args, report)
}

/// Étape isolée sélectionnée par la sous-commande
#[derive(Debug, Clone, Copy)]
pub enum Stage {
    Generalize,
    Compose,
    Mesh,
}

fn finish(args: &PipelineArgs, report: crate::report::PipelineReport) -> Result<()> {
    report.display();
    if let Some(path) = &args.report {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report saved");
    }

    match report.status {
        Some(RunStatus::Failed) => bail!("pipeline failed: no unit produced an artifact"),
        Some(RunStatus::PartialSuccess) => {
            info!(failures = report.failures.len(), "Pipeline finished with failures");
            Ok(())
        }
        _ => Ok(()),
    }
}
