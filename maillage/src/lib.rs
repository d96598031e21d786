//! # maillage
//!
//! Moteur géométrique pour la fabrication des maillages administratifs
//! français: simplification, déduplication, dissolution, placement
//! affine des territoires d'outre-mer et représentations dérivées
//! (surface, point représentatif, frontière).
//!
//! ## Features
//!
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//! - Réparation idempotente des géométries invalides
//! - Reprojection PROJ derrière le feature `reproject` (activé par défaut)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maillage::{dedupe_and_dissolve, simplify_table, GeoTable};
//!
//! let cleaned = dedupe_and_dissolve(&table, 100_000.0);
//! let generalized = simplify_table(&cleaned, 200.0);
//! ```

pub mod affine;
pub mod dedupe;
pub mod dissolve;
pub mod error;
pub mod repair;
pub mod reproject;
pub mod simplify;
pub mod types;

pub use affine::{apply_placement, Placement};
pub use dedupe::{dedupe_and_dissolve, DEFAULT_SURFACE_THRESHOLD};
pub use dissolve::{boundary, dissolve, representative_point, MeshRow, MeshUnit};
pub use error::MaillageError;
pub use reproject::Reprojector;
pub use simplify::{is_geographic, simplify_table, DEFAULT_TOLERANCE};
pub use types::{to_multipolygon, CodeInsee, CommuneRecord, GeoTable};
