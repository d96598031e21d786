//! Simplification des géométries pour l'affichage à petite échelle

use geo::Simplify;
use tracing::debug;

use crate::repair;
use crate::types::GeoTable;

/// Tolérance de simplification par défaut (unités du CRS planaire)
pub const DEFAULT_TOLERANCE: f64 = 200.0;

/// Simplifie toutes les géométries d'une table avec une tolérance de
/// distance (Douglas-Peucker), puis répare les géométries que la
/// simplification aurait invalidées.
///
/// Garanties: le nombre de lignes, les codes et les types de
/// géométries sont inchangés. La table doit être dans un CRS projeté;
/// la reprojection préalable est à la charge de l'appelant.
pub fn simplify_table(table: &GeoTable, tolerance: f64) -> GeoTable {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let simplified = row.geometry.simplify(&tolerance);
            let mut out = row.clone();
            out.geometry = repair::repair(&simplified, row.insee.as_str());
            out
        })
        .collect();

    debug!(
        rows = table.len(),
        tolerance = tolerance,
        "Simplified geometry table"
    );

    GeoTable {
        epsg: table.epsg,
        rows,
    }
}

/// Indique si un code EPSG désigne un CRS géographique (angulaire).
///
/// Seuls les CRS rencontrés dans la chaîne sont listés; tout le reste
/// est supposé projeté.
pub fn is_geographic(epsg: u32) -> bool {
    matches!(epsg, 4326 | 4171 | 4258)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodeInsee, CommuneRecord};
    use geo::{Area, MultiPolygon, Polygon};

    fn noisy_square(insee: &str) -> CommuneRecord {
        // Carré 1000x1000 avec des points intermédiaires quasi alignés
        let mut coords = Vec::new();
        for i in 0..=10 {
            coords.push(geo::Coord {
                x: i as f64 * 100.0,
                y: (i % 2) as f64 * 0.5,
            });
        }
        coords.push(geo::Coord { x: 1000.0, y: 1000.0 });
        coords.push(geo::Coord { x: 0.0, y: 1000.0 });
        coords.push(coords[0]);

        CommuneRecord {
            insee: CodeInsee::parse(insee).unwrap(),
            nom: "Test".into(),
            geometry: MultiPolygon::new(vec![Polygon::new(
                geo::LineString::new(coords),
                vec![],
            )]),
        }
    }

    #[test]
    fn test_simplify_preserves_rows_and_types() {
        let mut table = GeoTable::new(2154);
        table.rows.push(noisy_square("00001"));
        table.rows.push(noisy_square("00002"));

        let out = simplify_table(&table, 200.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out.epsg, 2154);
        assert_eq!(out.rows[0].insee.as_str(), "00001");
        // Toujours un MultiPolygon à un élément
        assert_eq!(out.rows[0].geometry.0.len(), 1);
    }

    #[test]
    fn test_simplify_reduces_vertices() {
        let mut table = GeoTable::new(2154);
        table.rows.push(noisy_square("00001"));

        let before = table.rows[0].geometry.0[0].exterior().0.len();
        let out = simplify_table(&table, 200.0);
        let after = out.rows[0].geometry.0[0].exterior().0.len();
        assert!(after < before, "expected fewer vertices ({after} < {before})");
    }

    #[test]
    fn test_simplify_area_bounded() {
        // L'aire ne doit pas dériver au-delà de tolérance x périmètre
        let mut table = GeoTable::new(2154);
        table.rows.push(noisy_square("00001"));

        let area_before = table.rows[0].geometry.unsigned_area();
        let out = simplify_table(&table, 200.0);
        let area_after = out.rows[0].geometry.unsigned_area();

        let perimeter = 4000.0;
        let bound = 200.0 * perimeter;
        assert!((area_after - area_before).abs() <= bound);
    }

    #[test]
    fn test_is_geographic() {
        assert!(is_geographic(4326));
        assert!(!is_geographic(2154));
        assert!(!is_geographic(4471));
    }
}
