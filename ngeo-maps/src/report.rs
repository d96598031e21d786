//! Rapport d'exécution du pipeline avec graceful degradation
//!
//! Chaque unité de travail (territoire x tier, composite, maille x
//! périmètre x style x tier) termine en succès, en cache (sorties déjà
//! présentes) ou en échec. Le rapport agrège ces issues par étape.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Toutes les unités ont réussi
    Success,
    /// Des unités ont échoué mais d'autres ont produit des artefacts
    PartialSuccess,
    /// Aucune unité n'a produit d'artefact
    Failed,
}

/// Issue d'une unité de travail
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    /// Étape (generalize, compose, mesh)
    pub stage: String,
    /// Contexte de l'unité: (territoire, style, tier, maille)
    pub unit: String,
    /// Message d'erreur
    pub message: String,
}

/// Compteurs d'une étape
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageStats {
    /// Unités ayant produit leurs artefacts
    pub completed: usize,
    /// Unités sautées (sorties déjà présentes)
    pub skipped: usize,
    /// Unités en échec
    pub failed: usize,
}

impl StageStats {
    pub fn total(&self) -> usize {
        self.completed + self.skipped + self.failed
    }
}

/// Rapport complet d'une exécution
#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    /// Millésime traité
    pub millesime: String,
    /// Durée totale
    pub duration_secs: f64,
    /// Statut final
    pub status: Option<RunStatus>,
    /// Compteurs par étape
    pub stages: HashMap<String, StageStats>,
    /// Échecs détaillés
    pub failures: Vec<UnitFailure>,
    /// Avertissements (territoires manquants, fallbacks)
    pub warnings: Vec<String>,
}

impl PipelineReport {
    pub fn new(millesime: &str) -> Self {
        Self {
            millesime: millesime.to_string(),
            ..Default::default()
        }
    }

    pub fn record_completed(&mut self, stage: &str) {
        self.stages.entry(stage.to_string()).or_default().completed += 1;
    }

    pub fn record_skipped(&mut self, stage: &str) {
        self.stages.entry(stage.to_string()).or_default().skipped += 1;
    }

    pub fn record_failure(&mut self, stage: &str, unit: &str, message: String) {
        self.stages.entry(stage.to_string()).or_default().failed += 1;
        self.failures.push(UnitFailure {
            stage: stage.to_string(),
            unit: unit.to_string(),
            message,
        });
    }

    pub fn record_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final à partir des compteurs
    pub fn finalize(&mut self) {
        let completed: usize = self.stages.values().map(|s| s.completed + s.skipped).sum();
        let failed: usize = self.stages.values().map(|s| s.failed).sum();

        self.status = Some(if failed == 0 {
            RunStatus::Success
        } else if completed > 0 {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Failed
        });
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("PIPELINE REPORT - Millésime {}", self.millesime);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- STAGES ---");
        let mut stages: Vec<_> = self.stages.iter().collect();
        stages.sort_by_key(|(k, _)| k.as_str());
        for (stage, stats) in stages {
            println!(
                "  {}: {} completed, {} skipped (cache), {} failed",
                stage, stats.completed, stats.skipped, stats.failed
            );
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(10) {
                println!("  {}", w);
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        if !self.failures.is_empty() {
            println!("\n--- FAILURES ({}) ---", self.failures.len());
            for f in self.failures.iter().take(20) {
                println!("  [{}] {}: {}", f.stage, f.unit, f.message);
            }
            if self.failures.len() > 20 {
                println!("  ... and {} more", self.failures.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Rapport partageable entre workers rayon
#[derive(Debug)]
pub struct SharedReport(Mutex<PipelineReport>);

impl SharedReport {
    pub fn new(millesime: &str) -> Self {
        Self(Mutex::new(PipelineReport::new(millesime)))
    }

    pub fn completed(&self, stage: &str) {
        self.0.lock().expect("report lock").record_completed(stage);
    }

    pub fn skipped(&self, stage: &str) {
        self.0.lock().expect("report lock").record_skipped(stage);
    }

    pub fn failure(&self, stage: &str, unit: &str, message: String) {
        self.0
            .lock()
            .expect("report lock")
            .record_failure(stage, unit, message);
    }

    pub fn warning(&self, message: String) {
        self.0.lock().expect("report lock").record_warning(message);
    }

    /// Consomme le rapport partagé
    pub fn into_inner(self) -> PipelineReport {
        self.0.into_inner().expect("report lock")
    }
}
