//! Référentiel attributaire commune -> mailles supérieures
//!
//! Le référentiel est une base DuckDB ouverte en lecture seule; chaque
//! définition de maillage détient sa requête de sélection
//! `{com_insee, <id_col>, <name_col>}`. Les unités de travail ouvrent
//! chacune leur connexion: seules des lectures concurrentes sont
//! émises.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use duckdb::{AccessMode, Config, Connection};
use tracing::debug;

use crate::config::MeshDefinition;
use crate::error::PipelineError;

/// Attributs d'une commune pour un maillage donné
#[derive(Debug, Clone)]
pub struct MeshAttributes {
    pub key: Option<String>,
    pub name: Option<String>,
}

/// Source attributaire (chemin d'une base DuckDB)
#[derive(Debug, Clone)]
pub struct AttributeStore {
    db_path: PathBuf,
}

impl AttributeStore {
    /// Référence une base existante; échoue si le fichier est absent
    pub fn open(db_path: &Path) -> Result<Self, PipelineError> {
        if !db_path.is_file() {
            return Err(PipelineError::SourceUnavailable {
                path: db_path.to_path_buf(),
            });
        }
        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }

    /// Exécute la requête d'un maillage et retourne la correspondance
    /// com_insee -> (clé de maille, nom)
    pub fn fetch(
        &self,
        mesh: &MeshDefinition,
    ) -> Result<HashMap<String, MeshAttributes>, PipelineError> {
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(&self.db_path, config)?;

        let mut stmt = conn.prepare(mesh.query)?;
        let mut mapping = HashMap::new();

        // Les maillages identité (sans dissolution) sélectionnent 2
        // colonnes: le code est sa propre clé. Un maillage dissous
        // joint sur le code lirait bien ses 3 colonnes.
        let is_identity = !mesh.dissolve;
        let rows = stmt.query_map([], |row| {
            let com: String = row.get(0)?;
            if is_identity {
                let name: Option<String> = row.get(1)?;
                Ok((com.clone(), Some(com), name))
            } else {
                let key: Option<String> = row.get(1)?;
                let name: Option<String> = row.get(2)?;
                Ok((com, key, name))
            }
        })?;

        for row in rows {
            let (com, key, name) = row?;
            mapping.insert(com, MeshAttributes { key, name });
        }

        debug!(level = mesh.level, rows = mapping.len(), "Fetched mesh attributes");
        Ok(mapping)
    }
}
