//! Types de données pour le crate maillage

use std::fmt;

use geo::{BoundingRect, Geometry, MultiPolygon, Rect};

use crate::MaillageError;

/// Code INSEE de commune: exactement 5 caractères numériques après
/// complétion par des zéros en tête.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeInsee(String);

impl CodeInsee {
    /// Valide et normalise un code INSEE brut.
    ///
    /// Les codes courts numériques sont complétés par des zéros en tête
    /// ("1234" -> "01234"). Un code non numérique ou de plus de 5
    /// caractères est rejeté.
    pub fn parse(raw: &str) -> Result<Self, MaillageError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > 5
            || !trimmed.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MaillageError::InvalidCode(raw.to_string()));
        }
        Ok(Self(format!("{:0>5}", trimmed)))
    }

    /// Retourne le code sous forme de chaîne (5 caractères)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeInsee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Une commune avec son code, son nom et sa géométrie surfacique
///
/// Les géométries sont normalisées en MultiPolygon dès le chargement:
/// un Polygon simple est enveloppé dans un MultiPolygon à un élément.
#[derive(Debug, Clone)]
pub struct CommuneRecord {
    /// Code INSEE (5 caractères numériques)
    pub insee: CodeInsee,

    /// Nom de la commune
    pub nom: String,

    /// Géométrie surfacique dans le CRS de la table
    pub geometry: MultiPolygon,
}

/// Table de géométries communales dans un CRS unique
#[derive(Debug, Clone)]
pub struct GeoTable {
    /// Code EPSG du CRS de toutes les lignes
    pub epsg: u32,

    /// Lignes de la table
    pub rows: Vec<CommuneRecord>,
}

impl GeoTable {
    /// Crée une table vide dans le CRS donné
    pub fn new(epsg: u32) -> Self {
        Self {
            epsg,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Trie les lignes par code INSEE pour un ordre reproductible
    pub fn sort_by_code(&mut self) {
        self.rows.sort_by(|a, b| a.insee.cmp(&b.insee));
    }

    /// Emprise englobante de toute la table
    pub fn bounding_rect(&self) -> Option<Rect> {
        let mut merged: Option<Rect> = None;
        for row in &self.rows {
            if let Some(r) = row.geometry.bounding_rect() {
                merged = Some(match merged {
                    None => r,
                    Some(m) => Rect::new(
                        geo::coord! { x: m.min().x.min(r.min().x), y: m.min().y.min(r.min().y) },
                        geo::coord! { x: m.max().x.max(r.max().x), y: m.max().y.max(r.max().y) },
                    ),
                });
            }
        }
        merged
    }

    /// Concatène plusieurs tables dans un CRS commun, triée par code.
    ///
    /// Les CRS des tables sources ne sont pas vérifiés: l'appelant doit
    /// avoir reprojeté (ou transformé) les lignes au préalable.
    pub fn concat(epsg: u32, tables: Vec<GeoTable>) -> Self {
        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.len()).sum());
        for table in tables {
            rows.extend(table.rows);
        }
        let mut out = Self { epsg, rows };
        out.sort_by_code();
        out
    }
}

/// Normalise une géométrie quelconque en MultiPolygon.
///
/// Retourne None pour les géométries non surfaciques (points, lignes).
pub fn to_multipolygon(geometry: Geometry) -> Option<MultiPolygon> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::GeometryCollection(gc) => {
            let polys: Vec<_> = gc
                .into_iter()
                .filter_map(|g| to_multipolygon(g))
                .flat_map(|mp| mp.0)
                .collect();
            if polys.is_empty() {
                None
            } else {
                Some(MultiPolygon::new(polys))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_code_insee_zfill() {
        assert_eq!(CodeInsee::parse("1234").unwrap().as_str(), "01234");
        assert_eq!(CodeInsee::parse("97101").unwrap().as_str(), "97101");
        assert_eq!(CodeInsee::parse("1").unwrap().as_str(), "00001");
    }

    #[test]
    fn test_code_insee_invalid() {
        assert!(CodeInsee::parse("").is_err());
        assert!(CodeInsee::parse("123456").is_err());
        assert!(CodeInsee::parse("2A004").is_err());
        assert!(CodeInsee::parse("abcde").is_err());
    }

    #[test]
    fn test_to_multipolygon() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let mp = to_multipolygon(Geometry::Polygon(poly)).unwrap();
        assert_eq!(mp.0.len(), 1);

        let pt = Geometry::Point(geo::Point::new(0.0, 0.0));
        assert!(to_multipolygon(pt).is_none());
    }

    #[test]
    fn test_concat_sorts_by_code() {
        let rect = |x0: f64| {
            MultiPolygon::new(vec![geo::Rect::new(
                geo::coord! { x: x0, y: 0.0 },
                geo::coord! { x: x0 + 1.0, y: 1.0 },
            )
            .to_polygon()])
        };
        let mut a = GeoTable::new(2154);
        a.rows.push(CommuneRecord {
            insee: CodeInsee::parse("00002").unwrap(),
            nom: "B".into(),
            geometry: rect(0.0),
        });
        let mut b = GeoTable::new(2154);
        b.rows.push(CommuneRecord {
            insee: CodeInsee::parse("00001").unwrap(),
            nom: "A".into(),
            geometry: rect(2.0),
        });

        let merged = GeoTable::concat(2154, vec![a, b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.rows[0].insee.as_str(), "00001");
    }
}
