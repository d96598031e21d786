//! Validation et réparation des géométries surfaciques
//!
//! Les données sources produisent parfois des rings non fermés, des
//! rings dégénérés ou des auto-intersections. La réparation est
//! idempotente: appliquée à une géométrie déjà valide, elle ne change
//! rien.

use geo::orient::{Direction, Orient};
use geo::{ConvexHull, Coord, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use tracing::warn;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};

/// Vérifie la validité d'un MultiPolygon.
///
/// Critères: chaque ring est fermé, compte au moins 4 points et ne
/// s'auto-intersecte pas. Les contacts ponctuels entre segments non
/// adjacents sont tolérés (fréquents dans les données réelles).
pub fn is_valid(mp: &MultiPolygon) -> bool {
    mp.0.iter().all(polygon_is_valid)
}

fn polygon_is_valid(poly: &Polygon) -> bool {
    ring_is_valid(poly.exterior()) && poly.interiors().iter().all(ring_is_valid)
}

fn ring_is_valid(ring: &LineString) -> bool {
    ring.0.len() >= 4 && ring.is_closed() && !ring_self_intersects(ring)
}

/// Détecte les auto-intersections franches d'un ring (O(n²))
fn ring_self_intersects(ring: &LineString) -> bool {
    let segments: Vec<_> = ring.lines().collect();
    let n = segments.len();
    for i in 0..n {
        for j in (i + 1)..n {
            // Segments adjacents (y compris premier/dernier): le point
            // partagé n'est pas une intersection
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            match line_intersection(segments[i], segments[j]) {
                Some(LineIntersection::SinglePoint { is_proper, .. }) if is_proper => {
                    return true;
                }
                Some(LineIntersection::Collinear { .. }) => return true,
                _ => {}
            }
        }
    }
    false
}

/// Répare un MultiPolygon invalide.
///
/// Étapes: fermeture des rings ouverts, suppression des rings
/// dégénérés (<4 points), réorientation des windings. Si un ring
/// s'auto-intersecte encore après ces étapes, le polygone est remplacé
/// par son enveloppe convexe (même fallback que la reconstruction
/// EDIGEO du cadastre) avec un warning.
pub fn repair(mp: &MultiPolygon, entity_id: &str) -> MultiPolygon {
    if is_valid(mp) {
        return mp.orient(Direction::Default);
    }

    let mut repaired = Vec::with_capacity(mp.0.len());
    for poly in &mp.0 {
        let Some(exterior) = clean_ring(poly.exterior()) else {
            warn!(entity_id = %entity_id, "Dropping polygon with degenerate exterior ring");
            continue;
        };

        let interiors: Vec<LineString> =
            poly.interiors().iter().filter_map(clean_ring).collect();

        let candidate = Polygon::new(exterior, interiors).orient(Direction::Default);

        if polygon_is_valid(&candidate) {
            repaired.push(candidate);
        } else {
            // Fallback: enveloppe convexe du ring extérieur
            warn!(entity_id = %entity_id, "Self-intersecting ring, using convex hull");
            match convex_hull_fallback(candidate.exterior()) {
                Some(hull) => repaired.push(hull),
                None => {
                    warn!(entity_id = %entity_id, "Convex hull fallback failed, dropping polygon");
                }
            }
        }
    }

    MultiPolygon::new(repaired)
}

/// Ferme un ring ouvert et élimine les doublons consécutifs.
///
/// Retourne None si le ring est dégénéré (moins de 3 points distincts).
fn clean_ring(ring: &LineString) -> Option<LineString> {
    let mut coords: Vec<Coord> = Vec::with_capacity(ring.0.len() + 1);
    for &c in &ring.0 {
        if coords.last().map_or(true, |&prev| !coords_equal(prev, c)) {
            coords.push(c);
        }
    }

    // Retirer la fermeture pour compter les points distincts
    if coords.len() > 1 && coords_equal(coords[0], coords[coords.len() - 1]) {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }

    let first = coords[0];
    coords.push(first);
    Some(LineString::new(coords))
}

fn convex_hull_fallback(ring: &LineString) -> Option<Polygon> {
    let points: Vec<Point> = ring.0.iter().map(|c| Point::new(c.x, c.y)).collect();
    if points.len() < 3 {
        return None;
    }
    Some(MultiPoint::new(points).convex_hull())
}

fn coords_equal(a: Coord, b: Coord) -> bool {
    const TOLERANCE: f64 = 1e-9;
    (a.x - b.x).abs() < TOLERANCE && (a.y - b.y).abs() < TOLERANCE
}
