//! Tests d'intégration du pipeline sur des fixtures synthétiques
//!
//! Les fixtures sont de petites tables communales carrées écrites en
//! GeoParquet dans un répertoire temporaire, plus un référentiel
//! attributaire DuckDB minimal.

use std::path::Path;

use duckdb::Connection;
use geo::{polygon, BoundingRect};

use maillage::{CodeInsee, CommuneRecord, GeoTable};
use ngeo_maps::config::{PlacementConfig, Territory};
use ngeo_maps::naming::{self, GeometryKind, Style, Tier};
use ngeo_maps::pipeline::{compose, generalize, mesh, PipelineContext};
use ngeo_maps::report::SharedReport;
use ngeo_maps::store::geoparquet;

/// Carré de 10 km de côté, assez grand pour survivre à la
/// simplification à 200 m
fn commune(insee: &str, nom: &str, x0: f64, y0: f64) -> CommuneRecord {
    let side = 10_000.0;
    CommuneRecord {
        insee: CodeInsee::parse(insee).unwrap(),
        nom: nom.into(),
        geometry: geo::MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + side, y: y0),
            (x: x0 + side, y: y0 + side),
            (x: x0, y: y0 + side),
        ]]),
    }
}

fn table(epsg: u32, rows: Vec<CommuneRecord>) -> GeoTable {
    let mut table = GeoTable::new(epsg);
    table.rows = rows;
    table
}

fn context(root: &Path) -> PipelineContext {
    PipelineContext {
        input: root.join("input"),
        output: root.join("output"),
        db: root.join("ngeo.duckdb"),
        year: "2025".into(),
        tolerance: 200.0,
        threshold: 100_000.0,
        placement: PlacementConfig::default(),
    }
}

fn write_input(ctx: &PipelineContext, territory: Territory, table: &GeoTable) {
    std::fs::create_dir_all(&ctx.input).unwrap();
    let path = ctx.input.join(naming::territory_file(
        territory.code(),
        &ctx.year,
        Tier::Standard,
    ));
    geoparquet::write_commune_table(&path, table).unwrap();
}

fn sample_db(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE ngeofr (
             com_insee VARCHAR, com_nom VARCHAR,
             arr_insee VARCHAR, arr_nom VARCHAR,
             dep_insee VARCHAR, dep_nom VARCHAR,
             reg_insee VARCHAR, reg_nom VARCHAR,
             epci_siren VARCHAR, epci_nom VARCHAR,
             ept_siren VARCHAR, ept_nom VARCHAR
         );
         INSERT INTO ngeofr VALUES
           ('00001', 'Alpha', '111', 'Arr A', '11', 'Dep A', '1', 'Reg A',
            '200000001', 'CC Alpha', NULL, NULL),
           ('00002', 'Beta', '111', 'Arr A', '11', 'Dep A', '1', 'Reg A',
            '200000001', 'CC Alpha', NULL, NULL);",
    )
    .unwrap();
}

fn count_rows(path: &Path, predicate: &str) -> i64 {
    let conn = Connection::open_in_memory().unwrap();
    conn.query_row(
        &format!(
            "SELECT count(*) FROM read_parquet('{}') WHERE {}",
            path.to_string_lossy().replace('\'', "''"),
            predicate
        ),
        [],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn test_generalize_produces_three_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    write_input(
        &ctx,
        Territory::Fra,
        &table(2154, vec![commune("00001", "Alpha", 0.0, 0.0)]),
    );

    let report = SharedReport::new(&ctx.year);
    generalize::run(&ctx, &report);
    let report = report.into_inner();

    let stats = report.stages["generalize"];
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
    // Les cinq DROM absents dégradent gracieusement
    assert_eq!(report.warnings.len(), 5);

    let standard = ctx.output.join("standard/com-fra-2025.parquet");
    let simplified = ctx.output.join("gen/com-fra-2025-simplified-200m.parquet");
    let generalized = ctx.output.join("gen/com-fra-2025-gen.parquet");
    assert!(standard.is_file());
    assert!(simplified.is_file());
    assert!(generalized.is_file());

    let back = geoparquet::read_commune_table(&generalized).unwrap();
    assert_eq!(back.epsg, 2154);
    assert_eq!(back.len(), 1);
}

#[test]
fn test_generalize_missing_anchor_is_failure() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    std::fs::create_dir_all(&ctx.input).unwrap();

    let report = SharedReport::new(&ctx.year);
    generalize::run(&ctx, &report);
    let report = report.into_inner();

    // La métropole est obligatoire, les DROM sont optionnels
    let stats = report.stages["generalize"];
    assert_eq!(stats.failed, 1);
    assert_eq!(report.failures[0].unit, "fra-2025");
    assert_eq!(report.warnings.len(), 5);
}

#[test]
fn test_generalize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    write_input(
        &ctx,
        Territory::Fra,
        &table(2154, vec![commune("00001", "Alpha", 0.0, 0.0)]),
    );

    let first = SharedReport::new(&ctx.year);
    generalize::run(&ctx, &first);
    assert_eq!(first.into_inner().stages["generalize"].completed, 1);

    // Seconde passe: tout est en cache, aucune écriture
    let second = SharedReport::new(&ctx.year);
    generalize::run(&ctx, &second);
    let stats = second.into_inner().stages["generalize"];
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.skipped, 1);
}

/// Dépose directement les tables par territoire aux deux tiers, comme
/// les produirait l'étape de généralisation
fn seed_territories(ctx: &PipelineContext) {
    let standard_dir = ctx.output.join(Tier::Standard.dir_name());
    let gen_dir = ctx.output.join(Tier::Generalized.dir_name());
    std::fs::create_dir_all(&standard_dir).unwrap();
    std::fs::create_dir_all(&gen_dir).unwrap();

    // Métropole en Lambert-93, Guadeloupe dans son CRS natif
    let fra = table(2154, vec![commune("00001", "Alpha", 650_000.0, 6_860_000.0)]);
    let glp = table(5490, vec![commune("97101", "Abymes", 650_000.0, 1_790_000.0)]);

    for (territory, t) in [(Territory::Fra, &fra), (Territory::Glp, &glp)] {
        for (dir, tier) in [(&standard_dir, Tier::Standard), (&gen_dir, Tier::Generalized)] {
            let path = dir.join(naming::territory_file(territory.code(), &ctx.year, tier));
            geoparquet::write_commune_table(&path, t).unwrap();
        }
    }
}

#[test]
fn test_compose_compact_places_droms() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    seed_territories(&ctx);

    let report = SharedReport::new(&ctx.year);
    compose::run(&ctx, &report);
    let report = report.into_inner();

    let compact_standard = ctx.output.join("standard/com-frdrom-compact-2025.parquet");
    let compact_gen = ctx.output.join("gen/com-frdrom-compact-2025-gen.parquet");
    assert!(compact_standard.is_file());
    assert!(compact_gen.is_file());
    // 4 territoires manquants x 2 styles x 2 tiers
    assert!(!report.warnings.is_empty());

    let composite = geoparquet::read_commune_table(&compact_standard).unwrap();
    assert_eq!(composite.epsg, 2154);
    assert_eq!(composite.len(), 2);

    // La Guadeloupe occupe la première boîte de la pile
    let glp = composite
        .rows
        .iter()
        .find(|r| r.insee.as_str() == "97101")
        .unwrap();
    let rect = glp.geometry.bounding_rect().unwrap();
    let center = rect.center();
    assert!((center.x - 120_000.0).abs() < 1.0, "x = {}", center.x);
    assert!((center.y - 6_500_000.0).abs() < 1.0, "y = {}", center.y);
    // Le côté du carré placé vaut la taille de boîte
    assert!((rect.width() - 100_000.0).abs() < 1.0);

    // La métropole reste en place
    let fra = composite
        .rows
        .iter()
        .find(|r| r.insee.as_str() == "00001")
        .unwrap();
    let fra_rect = fra.geometry.bounding_rect().unwrap();
    assert!((fra_rect.min().x - 650_000.0).abs() < 1.0);
}

#[cfg(feature = "reproject")]
#[test]
fn test_compose_natural_reprojects_to_mercator() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    seed_territories(&ctx);

    let report = SharedReport::new(&ctx.year);
    compose::run(&ctx, &report);
    let report = report.into_inner();
    assert_eq!(report.stages["compose"].failed, 0);

    let natural = ctx.output.join("standard/com-frdrom-2025.parquet");
    let composite = geoparquet::read_commune_table(&natural).unwrap();
    assert_eq!(composite.epsg, 3395);
    assert_eq!(composite.len(), 2);

    // En Mercator monde, la Guadeloupe est loin à l'ouest (x négatif)
    let glp = composite
        .rows
        .iter()
        .find(|r| r.insee.as_str() == "97101")
        .unwrap();
    let rect = glp.geometry.bounding_rect().unwrap();
    assert!(rect.max().x < 0.0, "x = {}", rect.max().x);
}

#[test]
fn test_compose_missing_anchor_fails_unit() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    std::fs::create_dir_all(ctx.output.join("standard")).unwrap();
    std::fs::create_dir_all(ctx.output.join("gen")).unwrap();

    let report = SharedReport::new(&ctx.year);
    compose::run(&ctx, &report);
    let report = report.into_inner();

    // Sans métropole, les quatre composites échouent
    assert_eq!(report.stages["compose"].failed, 4);
}

#[test]
fn test_mesh_retains_unmatched_commune() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    sample_db(&ctx.db);

    // Deux communes du même département plus une inconnue du référentiel
    let standard_dir = ctx.output.join("standard");
    std::fs::create_dir_all(&standard_dir).unwrap();
    let t = table(
        2154,
        vec![
            commune("00001", "Alpha", 0.0, 0.0),
            commune("00002", "Beta", 10_000.0, 0.0),
            commune("00003", "Gamma", 40_000.0, 0.0),
        ],
    );
    geoparquet::write_commune_table(&standard_dir.join("com-fra-2025.parquet"), &t).unwrap();

    let report = SharedReport::new(&ctx.year);
    mesh::run(&ctx, &report);
    let report = report.into_inner();
    assert_eq!(report.stages["mesh"].failed, 0);

    let dep_surface = ctx.output.join("fra/dep-fra-2025-surface.parquet");
    assert!(dep_surface.is_file());
    // Dep A dissous plus la commune sans correspondance sous clé nulle
    assert_eq!(count_rows(&dep_surface, "dep_insee = '11'"), 1);
    assert_eq!(count_rows(&dep_surface, "dep_insee IS NULL"), 1);

    // Les trois représentations sont produites
    for kind in GeometryKind::ALL {
        let path = ctx.output.join("fra").join(naming::mesh_file(
            "dep",
            "fra",
            Style::Natural,
            &ctx.year,
            kind,
            Tier::Standard,
        ));
        assert!(path.is_file(), "missing {}", path.display());
    }

    // Le maillage communal est une copie identité
    let com_surface = ctx.output.join("fra/com-fra-2025-surface.parquet");
    assert_eq!(count_rows(&com_surface, "true"), 3);
    assert_eq!(count_rows(&com_surface, "com_insee = '00003'"), 1);
}

#[test]
fn test_mesh_all_empty_geometries_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    sample_db(&ctx.db);

    // Une seule commune dont la géométrie est un MultiPolygon vide
    let standard_dir = ctx.output.join("standard");
    std::fs::create_dir_all(&standard_dir).unwrap();
    let mut t = GeoTable::new(2154);
    t.rows.push(CommuneRecord {
        insee: CodeInsee::parse("00001").unwrap(),
        nom: "Alpha".into(),
        geometry: geo::MultiPolygon::new(vec![]),
    });
    geoparquet::write_commune_table(&standard_dir.join("com-fra-2025.parquet"), &t).unwrap();

    let report = SharedReport::new(&ctx.year);
    mesh::run(&ctx, &report);
    let report = report.into_inner();

    // Toutes les unités échouent, aucun artefact partiel n'est écrit
    assert_eq!(report.stages["mesh"].completed, 0);
    assert!(report.stages["mesh"].failed > 0);
    let mesh_dir = ctx.output.join("fra");
    if mesh_dir.is_dir() {
        assert_eq!(std::fs::read_dir(&mesh_dir).unwrap().count(), 0);
    }
}

#[test]
fn test_mesh_missing_db_aborts_stage() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    std::fs::create_dir_all(ctx.output.join("standard")).unwrap();

    let report = SharedReport::new(&ctx.year);
    mesh::run(&ctx, &report);
    let report = report.into_inner();

    assert_eq!(report.stages["mesh"].failed, 1);
    assert_eq!(report.failures[0].unit, "attribute-store");
}

#[test]
fn test_mesh_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    sample_db(&ctx.db);

    let standard_dir = ctx.output.join("standard");
    std::fs::create_dir_all(&standard_dir).unwrap();
    let t = table(2154, vec![commune("00001", "Alpha", 0.0, 0.0)]);
    geoparquet::write_commune_table(&standard_dir.join("com-fra-2025.parquet"), &t).unwrap();

    let first = SharedReport::new(&ctx.year);
    mesh::run(&ctx, &first);
    let first = first.into_inner();
    assert!(first.stages["mesh"].completed > 0);
    assert_eq!(first.stages["mesh"].skipped, 0);

    let second = SharedReport::new(&ctx.year);
    mesh::run(&ctx, &second);
    let second = second.into_inner();
    assert_eq!(second.stages["mesh"].completed, 0);
    assert_eq!(
        second.stages["mesh"].skipped,
        first.stages["mesh"].completed
    );
}
