//! Dissolution géométrique et représentations dérivées
//!
//! La dissolution unit toutes les surfaces partageant une clé de
//! regroupement en un seul MultiPolygon par clé. C'est l'opération
//! centrale de l'agrégation en maillages administratifs.

use std::collections::BTreeMap;

use geo::{BooleanOps, Centroid, Contains, InteriorPoint, LineString, MultiLineString,
          MultiPolygon, Point};

use crate::repair;

/// Ligne d'entrée d'une dissolution: clé de maille, nom, surface.
///
/// Une clé None correspond à une commune sans correspondance dans le
/// référentiel attributaire; elle est conservée (et regroupée sous la
/// clé nulle) plutôt que silencieusement supprimée.
#[derive(Debug, Clone)]
pub struct MeshRow {
    pub key: Option<String>,
    pub name: Option<String>,
    pub geometry: MultiPolygon,
}

/// Unité de maille produite par la dissolution
#[derive(Debug, Clone)]
pub struct MeshUnit {
    pub key: Option<String>,
    pub name: Option<String>,
    pub surface: MultiPolygon,
}

/// Union de plusieurs MultiPolygons
pub fn union_all(parts: &[MultiPolygon]) -> MultiPolygon {
    let mut iter = parts.iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(Vec::new());
    };
    iter.fold(first.clone(), |acc, mp| acc.union(mp))
}

/// Dissout les lignes par clé.
///
/// Le nom retenu par groupe est le premier rencontré. Le résultat est
/// trié par clé (clé nulle en tête) pour un ordre reproductible.
/// Dissoudre une table déjà dissoute (une ligne par clé) est un no-op
/// géométrique.
pub fn dissolve(rows: Vec<MeshRow>) -> Vec<MeshUnit> {
    let mut groups: BTreeMap<Option<String>, (Option<String>, Vec<MultiPolygon>)> =
        BTreeMap::new();

    for row in rows {
        let entry = groups.entry(row.key).or_insert_with(|| (row.name.clone(), Vec::new()));
        if entry.0.is_none() {
            entry.0 = row.name;
        }
        entry.1.push(row.geometry);
    }

    groups
        .into_iter()
        .map(|(key, (name, parts))| {
            let surface = if parts.len() == 1 {
                parts.into_iter().next().expect("single part")
            } else {
                let merged = union_all(&parts);
                let id = key.as_deref().unwrap_or("<null>");
                repair::repair(&merged, id)
            };
            MeshUnit { key, name, surface }
        })
        .collect()
}

/// Point représentatif d'une surface: son centroïde s'il est contenu
/// dans la surface, sinon un point intérieur garanti.
///
/// Le centroïde d'une unité concave ou multi-parties tombe souvent
/// hors de la surface; la substitution est systématique dans ce cas.
pub fn representative_point(surface: &MultiPolygon) -> Option<Point> {
    let centroid = surface.centroid()?;
    if surface.contains(&centroid) {
        Some(centroid)
    } else {
        surface.interior_point()
    }
}

/// Frontière topologique d'une surface: tous ses rings en lignes
pub fn boundary(surface: &MultiPolygon) -> MultiLineString {
    let mut lines: Vec<LineString> = Vec::new();
    for poly in &surface.0 {
        lines.push(poly.exterior().clone());
        lines.extend(poly.interiors().iter().cloned());
    }
    MultiLineString::new(lines)
}
