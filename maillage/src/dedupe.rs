//! Déduplication des fragments de communes
//!
//! L'extraction source livre parfois une même commune éclatée en
//! plusieurs lignes: le vrai polygone plus un ou plusieurs slivers
//! résiduels. On élimine les fragments sous un seuil de surface quand
//! la commune est dupliquée, puis on dissout le reste en une ligne par
//! commune.

use std::collections::BTreeMap;

use geo::Area;
use tracing::debug;

use crate::dissolve::union_all;
use crate::repair;
use crate::types::{CodeInsee, CommuneRecord, GeoTable};

/// Seuil de surface par défaut sous lequel un fragment dupliqué est
/// considéré comme un sliver (unités de surface du CRS planaire)
pub const DEFAULT_SURFACE_THRESHOLD: f64 = 100_000.0;

/// Déduplique et dissout une table communale.
///
/// Groupe par (code, nom); dans les groupes de plus d'une ligne, les
/// fragments d'aire individuelle inférieure au seuil sont écartés. Si
/// tous les fragments d'un groupe passent sous le seuil, le plus grand
/// est conservé: une commune dupliquée ne disparaît jamais entièrement.
/// Les lignes restantes de chaque groupe sont unies en un seul
/// MultiPolygon, revalidé après dissolution. Résultat trié par code.
///
/// Le seuil est une heuristique de taille, pas une preuve de
/// correction: deux vraies exclaves partageant un code dont la plus
/// petite passe sous le seuil seraient écartées à tort.
pub fn dedupe_and_dissolve(table: &GeoTable, surface_threshold: f64) -> GeoTable {
    let mut groups: BTreeMap<(CodeInsee, String), Vec<&CommuneRecord>> = BTreeMap::new();
    for row in &table.rows {
        groups
            .entry((row.insee.clone(), row.nom.clone()))
            .or_default()
            .push(row);
    }

    let mut rows = Vec::with_capacity(groups.len());
    let mut dropped_slivers = 0usize;

    for ((insee, nom), members) in groups {
        let kept: Vec<&CommuneRecord> = if members.len() > 1 {
            let mut filtered: Vec<&CommuneRecord> = members
                .iter()
                .copied()
                .filter(|r| r.geometry.unsigned_area() >= surface_threshold)
                .collect();
            if filtered.is_empty() {
                // Tous sous le seuil: garder le plus grand fragment
                let largest = members
                    .iter()
                    .copied()
                    .max_by(|a, b| {
                        a.geometry
                            .unsigned_area()
                            .total_cmp(&b.geometry.unsigned_area())
                    })
                    .expect("non-empty group");
                debug!(insee = %insee, "All duplicated fragments below threshold, keeping largest");
                filtered.push(largest);
            }
            dropped_slivers += members.len() - filtered.len();
            filtered
        } else {
            members
        };

        let geometry = if kept.len() == 1 {
            kept[0].geometry.clone()
        } else {
            let parts: Vec<_> = kept.iter().map(|r| r.geometry.clone()).collect();
            repair::repair(&union_all(&parts), insee.as_str())
        };

        rows.push(CommuneRecord {
            insee,
            nom,
            geometry,
        });
    }

    if dropped_slivers > 0 {
        debug!(dropped = dropped_slivers, "Dropped sliver fragments");
    }

    let mut out = GeoTable {
        epsg: table.epsg,
        rows,
    };
    out.sort_by_code();
    out
}
