//! Taxonomie des erreurs du pipeline
//!
//! Les erreurs sont attrapées à la frontière de chaque unité de
//! travail, journalisées avec le contexte (territoire, style, tier,
//! maille), et n'interrompent pas les unités sœurs.

use std::path::PathBuf;

use thiserror::Error;

/// Erreurs pouvant survenir dans le pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Colonnes requises absentes du fichier d'entrée
    #[error("Schema error in {file}: missing columns {missing:?}")]
    Schema { file: String, missing: Vec<String> },

    /// CRS absent ou illisible dans les métadonnées du fichier
    #[error("CRS error in {file}: {reason}")]
    Crs { file: String, reason: String },

    /// Fichier d'entrée ou source attributaire introuvable
    #[error("Source unavailable: {}", path.display())]
    SourceUnavailable { path: PathBuf },

    /// Jointure ou dissolution sans aucune ligne exploitable
    #[error("Empty result for {context}")]
    EmptyResult { context: String },

    /// Erreur géométrique remontée par le moteur maillage
    #[error(transparent)]
    Geometry(#[from] maillage::MaillageError),

    /// Erreur DuckDB (lecture parquet, requête attributaire, export)
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Erreur d'I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encodage/décodage WKB impossible
    #[error("WKB error for {entity_id}: {reason}")]
    Wkb { entity_id: String, reason: String },
}

impl PipelineError {
    /// Crée une erreur de schéma
    pub fn schema(file: impl Into<String>, missing: Vec<String>) -> Self {
        Self::Schema {
            file: file.into(),
            missing,
        }
    }

    /// Crée une erreur de CRS
    pub fn crs(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Crs {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de résultat vide
    pub fn empty(context: impl Into<String>) -> Self {
        Self::EmptyResult {
            context: context.into(),
        }
    }
}
