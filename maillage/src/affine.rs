//! Placement affine des territoires pour la disposition compacte
//!
//! Chaque territoire d'outre-mer est ramené près de la métropole par
//! une transformation affine: échelle uniforme (origine au point
//! origine du CRS) puis translation vers un centre cible fixe. Pas de
//! rotation ni de cisaillement: la forme relative est préservée.

use geo::{AffineOps, AffineTransform, Coord, Rect};

use crate::types::GeoTable;
use crate::MaillageError;

/// Paramètres d'un placement affine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Facteur d'échelle uniforme (> 0)
    pub scale: f64,

    /// Translation appliquée après l'échelle
    pub translation: Coord,
}

impl Placement {
    /// Calcule le placement amenant une emprise dans une boîte cible.
    ///
    /// `scale = target_box_size / max(largeur, hauteur)`, puis
    /// `translation = target_center - centre_emprise * scale`. Après
    /// transformation, le centre de l'emprise coïncide exactement avec
    /// le centre cible.
    pub fn fit(
        extent: Rect,
        target_box_size: f64,
        target_center: Coord,
        entity_id: &str,
    ) -> Result<Self, MaillageError> {
        let current_extent = extent.width().max(extent.height());
        if !current_extent.is_finite() || current_extent <= 0.0 {
            return Err(MaillageError::DegenerateExtent {
                entity_id: entity_id.to_string(),
                reason: format!("extent {current_extent} is not positive"),
            });
        }

        let scale = target_box_size / current_extent;
        let center = extent.center();
        let translation = Coord {
            x: target_center.x - center.x * scale,
            y: target_center.y - center.y * scale,
        };

        Ok(Self { scale, translation })
    }

    /// Matrice affine correspondante: x' = s.x + tx, y' = s.y + ty
    pub fn transform(&self) -> AffineTransform {
        AffineTransform::new(
            self.scale,
            0.0,
            self.translation.x,
            0.0,
            self.scale,
            self.translation.y,
        )
    }
}

/// Applique un placement à toutes les lignes d'une table.
///
/// Le CRS déclaré de la table de sortie est celui passé en argument:
/// après placement, les coordonnées vivent dans le repère plan partagé
/// de la disposition compacte, pas dans le CRS natif du territoire.
pub fn apply_placement(table: &GeoTable, placement: &Placement, target_epsg: u32) -> GeoTable {
    let transform = placement.transform();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut out = row.clone();
            out.geometry = row.geometry.affine_transform(&transform);
            out
        })
        .collect();

    GeoTable {
        epsg: target_epsg,
        rows,
    }
}
