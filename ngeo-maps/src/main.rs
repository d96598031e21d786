//! Point d'entrée CLI pour ngeo-maps

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

use ngeo_maps::cli::{self, Commands, Stage};

/// Fabriquer les fonds de carte administratifs français
#[derive(Parser)]
#[command(name = "ngeo-maps")]
#[command(author, version)]
#[command(about = "Fabriquer les fonds de carte administratifs français (communes et maillages)")]
#[command(long_about = "Pipeline de fabrication des fonds de carte: généralisation des géométries \
communales par territoire, assemblage de la couverture nationale (dispositions naturelle et \
compacte), agrégation en maillages administratifs (dep, reg, arr, epci, ept, com).")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run { args } => {
            info!(input = %args.input.display(), year = %args.year, "Full pipeline");
            cli::cmd_run(&args)?;
        }
        Commands::Generalize { args } => {
            info!(input = %args.input.display(), year = %args.year, "Generalize stage");
            cli::cmd_stage(&args, Stage::Generalize)?;
        }
        Commands::Compose { args } => {
            info!(output = %args.output.display(), year = %args.year, "Compose stage");
            cli::cmd_stage(&args, Stage::Compose)?;
        }
        Commands::Mesh { args } => {
            info!(output = %args.output.display(), year = %args.year, "Mesh stage");
            cli::cmd_stage(&args, Stage::Mesh)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
