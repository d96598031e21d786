//! Configuration du pipeline: territoires, placement compact, maillages

use geo::{coord, Coord};
use serde::{Deserialize, Serialize};

/// Projection cible de la disposition naturelle (Mercator monde)
pub const NATURAL_EPSG: u32 = 3395;

/// Projection cible de la disposition compacte (Lambert-93)
pub const COMPACT_EPSG: u32 = 2154;

/// Territoire de la couverture nationale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Territory {
    /// France métropolitaine (territoire d'ancrage)
    Fra,
    /// Guadeloupe
    Glp,
    /// Martinique
    Mtq,
    /// Guyane
    Guf,
    /// La Réunion
    Reu,
    /// Mayotte
    Myt,
}

impl Territory {
    /// Tous les territoires, métropole en tête puis DROM dans l'ordre
    /// de placement compact
    pub const ALL: [Territory; 6] = [
        Territory::Fra,
        Territory::Glp,
        Territory::Mtq,
        Territory::Guf,
        Territory::Reu,
        Territory::Myt,
    ];

    /// Territoires d'outre-mer, dans l'ordre de placement
    pub const DROMS: [Territory; 5] = [
        Territory::Glp,
        Territory::Mtq,
        Territory::Guf,
        Territory::Reu,
        Territory::Myt,
    ];

    /// Code court en minuscules utilisé dans les noms de fichiers
    pub fn code(&self) -> &'static str {
        match self {
            Territory::Fra => "fra",
            Territory::Glp => "glp",
            Territory::Mtq => "mtq",
            Territory::Guf => "guf",
            Territory::Reu => "reu",
            Territory::Myt => "myt",
        }
    }

    /// CRS planaire natif du territoire
    pub fn epsg(&self) -> u32 {
        match self {
            Territory::Fra => 2154, // Lambert-93
            Territory::Glp => 5490, // RGAF09 / UTM 20N
            Territory::Mtq => 5490,
            Territory::Guf => 2972, // RGFG95 / UTM 22N
            Territory::Reu => 2975, // RGR92 / UTM 40S
            Territory::Myt => 4471, // RGM04 / UTM 38S
        }
    }

    /// Le territoire d'ancrage de la disposition compacte
    pub fn is_anchor(&self) -> bool {
        matches!(self, Territory::Fra)
    }
}

/// Configuration du placement compact des DROM
///
/// Les boîtes cibles forment une pile verticale au sud-ouest de
/// l'ancrage métropolitain, avec une colonne latérale de débordement
/// après quatre rangées. Les constantes sont regroupées ici pour que
/// la politique de placement puisse être ajustée sans toucher à
/// l'algorithme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Taille maximale (côté) de la boîte cible de chaque DROM
    pub side_max_box: f64,

    /// Espace entre deux boîtes successives
    pub space_between_box: f64,

    /// Coin de départ de la pile (x, y) dans le CRS compact
    pub origin_x: f64,
    pub origin_y: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            side_max_box: 100_000.0,
            space_between_box: 40_000.0,
            origin_x: 120_000.0,
            origin_y: 6_500_000.0,
        }
    }
}

impl PlacementConfig {
    /// Centre cible de la i-ème boîte.
    ///
    /// Quatre boîtes empilées verticalement, puis débordement latéral
    /// sur la rangée du bas. Les centres fixes garantissent par
    /// construction l'absence de chevauchement entre territoires.
    pub fn target_center(&self, index: usize) -> Coord {
        let step = self.side_max_box + self.space_between_box;
        if index < 4 {
            coord! {
                x: self.origin_x,
                y: self.origin_y - index as f64 * step,
            }
        } else {
            coord! {
                x: self.origin_x + (index - 3) as f64 * step,
                y: self.origin_y - 3.0 * step,
            }
        }
    }
}

/// Définition d'un maillage administratif cible
#[derive(Debug, Clone)]
pub struct MeshDefinition {
    /// Tag du niveau (dep, reg, arr, epci, ept, epciept, com)
    pub level: &'static str,

    /// Colonne de jointure cible dans le référentiel
    pub id_col: &'static str,

    /// Colonne du nom de l'unité
    pub name_col: &'static str,

    /// Requête de sélection dans le référentiel attributaire
    pub query: &'static str,

    /// Maillage applicable uniquement à la couverture nationale
    /// (fra, frdrom), pas aux territoires d'outre-mer isolés
    pub national_only: bool,

    /// Dissolution par id_col; false pour le maillage communal qui est
    /// une copie identité de la table d'entrée
    pub dissolve: bool,
}

/// Catalogue des maillages produits par le pipeline
pub fn mesh_catalog() -> Vec<MeshDefinition> {
    vec![
        MeshDefinition {
            level: "dep",
            id_col: "dep_insee",
            name_col: "dep_nom",
            query: "SELECT com_insee, dep_insee, dep_nom FROM ngeofr",
            national_only: false,
            dissolve: true,
        },
        MeshDefinition {
            level: "reg",
            id_col: "reg_insee",
            name_col: "reg_nom",
            query: "SELECT com_insee, reg_insee, reg_nom FROM ngeofr",
            national_only: false,
            dissolve: true,
        },
        MeshDefinition {
            level: "arr",
            id_col: "arr_insee",
            name_col: "arr_nom",
            query: "SELECT com_insee, arr_insee, arr_nom FROM ngeofr",
            national_only: false,
            dissolve: true,
        },
        MeshDefinition {
            level: "epci",
            id_col: "epci_siren",
            name_col: "epci_nom",
            query: "SELECT com_insee, epci_siren, epci_nom FROM ngeofr",
            national_only: true,
            dissolve: true,
        },
        MeshDefinition {
            level: "ept",
            id_col: "ept_siren",
            name_col: "ept_nom",
            query: "SELECT com_insee, ept_siren, ept_nom FROM ngeofr",
            national_only: true,
            dissolve: true,
        },
        MeshDefinition {
            // EPCI avec substitution des EPT (Grand Paris)
            level: "epciept",
            id_col: "epci_siren",
            name_col: "epci_nom",
            query: "SELECT com_insee, coalesce(ept_siren, epci_siren) AS epci_siren, \
                    coalesce(ept_nom, epci_nom) AS epci_nom FROM ngeofr",
            national_only: true,
            dissolve: true,
        },
        MeshDefinition {
            level: "com",
            id_col: "com_insee",
            name_col: "com_nom",
            query: "SELECT com_insee, com_nom FROM ngeofr",
            national_only: false,
            dissolve: false,
        },
    ]
}
