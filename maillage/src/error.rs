//! Types d'erreurs pour le crate maillage

use thiserror::Error;

/// Erreurs pouvant survenir lors des traitements géométriques
#[derive(Debug, Error)]
pub enum MaillageError {
    /// Code INSEE invalide (non numérique ou trop long)
    #[error("Invalid INSEE code: {0:?} (expected 5 numeric characters)")]
    InvalidCode(String),

    /// Emprise dégénérée: impossible de calculer un placement affine
    #[error("Degenerate extent for {entity_id}: {reason}")]
    DegenerateExtent { entity_id: String, reason: String },

    /// Projection impossible
    #[error("Projection error: {0}")]
    Projection(String),
}
