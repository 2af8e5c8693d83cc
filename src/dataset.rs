use crate::error::{DashboardError, DashboardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// One sale from the DVF extract, already reduced to a price per m².
/// Columns beyond these four are ignored by the loader.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Transaction {
    pub nom_commune: String,

    /// "Appartement" or "Maison"; other values load fine but belong to neither split.
    #[serde(rename = "type")]
    pub property_type: String,

    pub annee: i32,

    pub prixm2: f64,
}

impl Transaction {
    pub fn new(nom_commune: &str, property_type: &str, annee: i32, prixm2: f64) -> Self {
        Transaction {
            nom_commune: nom_commune.to_string(),
            property_type: property_type.to_string(),
            annee,
            prixm2,
        }
    }

    pub fn is(&self, kind: PropertyType) -> bool {
        self.property_type == kind.as_str()
    }
}

// ============================================================================
// PROPERTY TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Appartement,
    Maison,
}

impl PropertyType {
    pub const ALL: [PropertyType; 2] = [PropertyType::Appartement, PropertyType::Maison];

    /// Exact label used in the `type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Appartement => "Appartement",
            PropertyType::Maison => "Maison",
        }
    }

    /// Plural label used on metric widgets and chart titles
    pub fn display_label(&self) -> &'static str {
        match self {
            PropertyType::Appartement => "Appartements",
            PropertyType::Maison => "Maisons",
        }
    }
}

// ============================================================================
// CSV LOADING
// ============================================================================

pub fn load_csv(csv_path: &Path) -> DashboardResult<Vec<Transaction>> {
    if !csv_path.exists() {
        return Err(DashboardError::DataFileMissing(csv_path.to_path_buf()));
    }

    let file = File::open(csv_path).map_err(|source| DashboardError::Io {
        path: csv_path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(file));

    let mut transactions = Vec::new();

    for result in rdr.deserialize() {
        let transaction: Transaction =
            result.map_err(|e| DashboardError::from_csv(csv_path, e))?;
        transactions.push(transaction);
    }

    Ok(transactions)
}

// ============================================================================
// DATASET
// ============================================================================

/// The full transaction table. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Transaction>,
    communes: Vec<String>,
    source: Option<PathBuf>,
    loaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn load(path: &Path) -> DashboardResult<Self> {
        let started = Instant::now();
        let records = load_csv(path)?;

        let mut dataset = Dataset::from_records(records);
        dataset.source = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            rows = dataset.len(),
            communes = dataset.communes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dataset loaded"
        );

        Ok(dataset)
    }

    pub fn from_records(records: Vec<Transaction>) -> Self {
        let communes = distinct_communes(&records);
        Dataset {
            records,
            communes,
            source: None,
            loaded_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct commune names in the order they first appear in the file
    pub fn communes(&self) -> &[String] {
        &self.communes
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Rows whose `nom_commune` equals `commune` exactly (case-sensitive).
    pub fn rows_for(&self, commune: &str) -> Vec<&Transaction> {
        let rows: Vec<&Transaction> = self
            .records
            .iter()
            .filter(|tx| tx.nom_commune == commune)
            .collect();
        debug!(commune, rows = rows.len(), "filtered rows");
        rows
    }
}

fn distinct_communes(records: &[Transaction]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut communes = Vec::new();

    for tx in records {
        if seen.insert(tx.nom_commune.as_str()) {
            communes.push(tx.nom_commune.clone());
        }
    }

    communes
}
