//! # ngeo-maps
//!
//! Fabrication des fonds de carte administratifs français à partir des
//! géométries communales: généralisation par territoire, assemblage de
//! la couverture nationale (dispositions naturelle et compacte),
//! agrégation en maillages administratifs avec trois représentations
//! (surface, point représentatif, frontière).
//!
//! ## Usage CLI
//!
//! ```bash
//! # Pipeline complet sur le millésime 2025
//! ngeo-maps run --input ./input --output ./output --year 2025
//!
//! # Une seule étape
//! ngeo-maps generalize --input ./input --output ./output --year 2025
//! ngeo-maps mesh --input ./input --output ./output --year 2025 --db ./ngeo.duckdb
//! ```

pub mod attributes;
pub mod cli;
pub mod config;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod report;
pub mod store;

pub use config::{PlacementConfig, Territory};
pub use error::PipelineError;
pub use pipeline::{run_all, PipelineContext};
pub use report::{PipelineReport, RunStatus};
