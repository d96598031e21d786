//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.
//! La disposition compacte n'en a pas besoin (transformations affines
//! pures); la disposition naturelle reprojette tout en Mercator.

#[cfg(feature = "reproject")]
use geo::{Coord, LineString, MultiPolygon, Polygon};
#[cfg(feature = "reproject")]
use proj::Proj;

use crate::types::GeoTable;
use crate::MaillageError;

/// Reprojection de tables communales entre deux systèmes de coordonnées
#[cfg(feature = "reproject")]
pub struct Reprojector {
    proj: Proj,
    source_epsg: u32,
    target_epsg: u32,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    /// Crée un reprojector entre deux codes EPSG
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, MaillageError> {
        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);

        let proj = Proj::new_known_crs(&source, &target, None).map_err(|e| {
            MaillageError::Projection(format!(
                "Failed to create projection from {} to {}: {}",
                source, target, e
            ))
        })?;

        Ok(Self {
            proj,
            source_epsg,
            target_epsg,
        })
    }

    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Reprojette une table entière dans le CRS cible
    pub fn transform_table(&self, table: &GeoTable) -> Result<GeoTable, MaillageError> {
        if self.source_epsg == self.target_epsg {
            return Ok(table.clone());
        }

        let mut rows = Vec::with_capacity(table.len());
        for row in &table.rows {
            let mut out = row.clone();
            out.geometry = self.transform_multipolygon(&row.geometry)?;
            rows.push(out);
        }

        Ok(GeoTable {
            epsg: self.target_epsg,
            rows,
        })
    }

    /// Reprojette un MultiPolygon
    pub fn transform_multipolygon(
        &self,
        mp: &MultiPolygon,
    ) -> Result<MultiPolygon, MaillageError> {
        let polys: Result<Vec<Polygon>, MaillageError> =
            mp.0.iter().map(|p| self.transform_polygon(p)).collect();
        Ok(MultiPolygon::new(polys?))
    }

    fn transform_polygon(&self, p: &Polygon) -> Result<Polygon, MaillageError> {
        let exterior = self.transform_linestring(p.exterior())?;
        let interiors: Result<Vec<LineString>, MaillageError> = p
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect();
        Ok(Polygon::new(exterior, interiors?))
    }

    /// Transformation batch d'un ring, beaucoup plus rapide que point
    /// par point
    fn transform_linestring(&self, ls: &LineString) -> Result<LineString, MaillageError> {
        let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

        self.proj.convert_array(&mut coords).map_err(|e| {
            MaillageError::Projection(format!("Batch coordinate transformation failed: {}", e))
        })?;

        let result: Vec<Coord> = coords.into_iter().map(|(x, y)| Coord { x, y }).collect();
        Ok(LineString::new(result))
    }
}

// Implémentation factice quand le feature reproject est désactivé
/// Reprojector factice - pas de reprojection disponible
#[cfg(not(feature = "reproject"))]
pub struct Reprojector {
    source_epsg: u32,
    target_epsg: u32,
}

#[cfg(not(feature = "reproject"))]
impl Reprojector {
    /// Tente de créer un reprojector - échoue sauf transformation identité
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, MaillageError> {
        if source_epsg == target_epsg {
            Ok(Self {
                source_epsg,
                target_epsg,
            })
        } else {
            Err(MaillageError::Projection(format!(
                "Reprojection from EPSG:{} to EPSG:{} requires the 'reproject' feature. \
                 Build with: cargo build --features reproject",
                source_epsg, target_epsg
            )))
        }
    }

    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Retourne la table inchangée (transformation identité uniquement)
    pub fn transform_table(&self, table: &GeoTable) -> Result<GeoTable, MaillageError> {
        Ok(table.clone())
    }
}
