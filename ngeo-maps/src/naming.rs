//! Nommage canonique des artefacts
//!
//! Les noms de fichiers sont une interface consommée par le système de
//! cartes aval: ils doivent rester bit-compatibles.
//!
//! - Géométries communales: `com-{terr}-{année}[-simplified-{tol}m][-gen].parquet`
//! - Couverture nationale: `com-frdrom[-compact]-{année}[-gen].parquet`
//! - Maillages: `{niveau}-{terr}[-compact]-{année}-{kind}[-gen].parquet`
//!   dans le dossier `{terr}[-compact]/`

use std::path::{Path, PathBuf};

/// Tier de précision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Précision standard (géométries source)
    Standard,
    /// Précision généralisée (simplifiées/dédupliquées)
    Generalized,
}

impl Tier {
    /// Suffixe de nom de fichier ("" ou "-gen")
    pub fn suffix(&self) -> &'static str {
        match self {
            Tier::Standard => "",
            Tier::Generalized => "-gen",
        }
    }

    /// Sous-dossier des tables composites du tier
    pub fn dir_name(&self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Generalized => "gen",
        }
    }
}

/// Disposition cartographique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Position géographique vraie
    Natural,
    /// DROM repositionnés près de la métropole
    Compact,
}

impl Style {
    /// Segment de nom de fichier ("" ou "-compact")
    pub fn segment(&self) -> &'static str {
        match self {
            Style::Natural => "",
            Style::Compact => "-compact",
        }
    }
}

/// Représentation géométrique dérivée d'une unité de maille
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Surface,
    Centroid,
    Boundary,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 3] = [
        GeometryKind::Surface,
        GeometryKind::Centroid,
        GeometryKind::Boundary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Surface => "surface",
            GeometryKind::Centroid => "centroid",
            GeometryKind::Boundary => "boundary",
        }
    }
}

/// Nom du fichier communal d'un territoire
pub fn territory_file(terr_code: &str, year: &str, tier: Tier) -> String {
    format!("com-{}-{}{}.parquet", terr_code, year, tier.suffix())
}

/// Nom du fichier communal simplifié intermédiaire
pub fn simplified_file(terr_code: &str, year: &str, tolerance: f64) -> String {
    format!(
        "com-{}-{}-simplified-{}m.parquet",
        terr_code, year, tolerance as i64
    )
}

/// Nom du fichier de couverture nationale
pub fn composite_file(style: Style, year: &str, tier: Tier) -> String {
    format!(
        "com-frdrom{}-{}{}.parquet",
        style.segment(),
        year,
        tier.suffix()
    )
}

/// Nom d'un artefact de maillage
pub fn mesh_file(
    level: &str,
    scope: &str,
    style: Style,
    year: &str,
    kind: GeometryKind,
    tier: Tier,
) -> String {
    format!(
        "{}-{}{}-{}-{}{}.parquet",
        level,
        scope,
        style.segment(),
        year,
        kind.as_str(),
        tier.suffix()
    )
}

/// Dossier de sortie des maillages pour un périmètre et un style
pub fn mesh_dir(output: &Path, scope: &str, style: Style) -> PathBuf {
    output.join(format!("{}{}", scope, style.segment()))
}

/// Métadonnées extraites du nom d'un fichier de géométries communales
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometrySource {
    /// Périmètre: code territoire ou "frdrom"
    pub scope: String,
    pub style: Style,
    pub tier: Tier,
}

/// Analyse le nom d'un fichier `com-*.parquet`.
///
/// Retourne None pour tout fichier hors convention, y compris les
/// intermédiaires `-simplified-`.
pub fn parse_geometry_file(file_name: &str) -> Option<GeometrySource> {
    let stem = file_name.strip_suffix(".parquet")?;
    let mut parts = stem.split('-');
    if parts.next()? != "com" {
        return None;
    }
    let scope = parts.next()?.to_string();
    if stem.contains("-simplified-") {
        return None;
    }

    let style = if stem.contains("-compact-") {
        Style::Compact
    } else {
        Style::Natural
    };
    let tier = if stem.ends_with("-gen") {
        Tier::Generalized
    } else {
        Tier::Standard
    };

    Some(GeometrySource { scope, style, tier })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_territory_names() {
        assert_eq!(territory_file("fra", "2025", Tier::Standard), "com-fra-2025.parquet");
        assert_eq!(
            territory_file("glp", "2025", Tier::Generalized),
            "com-glp-2025-gen.parquet"
        );
        assert_eq!(
            simplified_file("fra", "2025", 200.0),
            "com-fra-2025-simplified-200m.parquet"
        );
    }

    #[test]
    fn test_composite_names() {
        assert_eq!(
            composite_file(Style::Natural, "2025", Tier::Standard),
            "com-frdrom-2025.parquet"
        );
        assert_eq!(
            composite_file(Style::Compact, "2025", Tier::Generalized),
            "com-frdrom-compact-2025-gen.parquet"
        );
    }

    #[test]
    fn test_mesh_names() {
        assert_eq!(
            mesh_file("dep", "frdrom", Style::Natural, "2025", GeometryKind::Surface, Tier::Standard),
            "dep-frdrom-2025-surface.parquet"
        );
        assert_eq!(
            mesh_file(
                "epci",
                "frdrom",
                Style::Compact,
                "2025",
                GeometryKind::Boundary,
                Tier::Generalized
            ),
            "epci-frdrom-compact-2025-boundary-gen.parquet"
        );
    }

    #[test]
    fn test_mesh_dir() {
        let dir = mesh_dir(Path::new("/out"), "frdrom", Style::Compact);
        assert_eq!(dir, PathBuf::from("/out/frdrom-compact"));
    }

    #[test]
    fn test_parse_geometry_file() {
        let parsed = parse_geometry_file("com-frdrom-compact-2025-gen.parquet").unwrap();
        assert_eq!(parsed.scope, "frdrom");
        assert_eq!(parsed.style, Style::Compact);
        assert_eq!(parsed.tier, Tier::Generalized);

        let parsed = parse_geometry_file("com-fra-2025.parquet").unwrap();
        assert_eq!(parsed.scope, "fra");
        assert_eq!(parsed.style, Style::Natural);
        assert_eq!(parsed.tier, Tier::Standard);

        assert!(parse_geometry_file("com-fra-2025-simplified-200m.parquet").is_none());
        assert!(parse_geometry_file("dep-frdrom-2025-surface.parquet").is_none());
        assert!(parse_geometry_file("notes.txt").is_none());
    }
}
