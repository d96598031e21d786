//! Accès aux tables de géométries et porte d'idempotence

pub mod geoparquet;

use std::path::{Path, PathBuf};

use tracing::debug;

use maillage::GeoTable;

use crate::config::Territory;
use crate::error::PipelineError;
use crate::naming::{self, Tier};

/// Charge la table communale d'un territoire depuis le répertoire
/// d'entrée. Lecture pure: les validations (schéma, CRS, codes) sont
/// celles de la couche GeoParquet.
pub fn load_territory(
    input_dir: &Path,
    territory: Territory,
    year: &str,
) -> Result<GeoTable, PipelineError> {
    let path = input_dir.join(naming::territory_file(territory.code(), year, Tier::Standard));
    geoparquet::read_commune_table(&path)
}

/// Porte d'idempotence: vrai si tous les fichiers existent déjà.
///
/// L'existence du fichier est le seul signal de cache; aucun manifeste
/// ni empreinte de contenu n'est maintenu.
pub fn all_exist(paths: &[PathBuf]) -> bool {
    let exist = paths.iter().all(|p| p.is_file());
    if exist && !paths.is_empty() {
        debug!(first = %paths[0].display(), count = paths.len(), "Outputs already present, skipping");
    }
    exist
}
