// Yearly price-per-m² aggregation for one commune.
//
// filter by commune -> split by property type -> group by year -> mean,
// then latest value and change against the previous year.

use crate::dataset::{Dataset, PropertyType, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Mean price per m² for one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlyMean {
    pub annee: i32,
    pub prixm2: f64,
}

/// Yearly means of one property type, ascending by year, plus the two headline figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTrend {
    pub property_type: PropertyType,
    pub yearly: Vec<YearlyMean>,
    /// Mean of the most recent year; `None` when there are no rows.
    pub latest: Option<f64>,
    /// Percent change of the last year against the one before it.
    /// `None` with fewer than two years, or when the previous mean is zero.
    pub pct_change: Option<f64>,
}

impl PriceTrend {
    pub fn from_means(property_type: PropertyType, yearly: Vec<YearlyMean>) -> Self {
        let latest = yearly.last().map(|m| m.prixm2);
        let pct_change = percent_change(&yearly);
        PriceTrend {
            property_type,
            yearly,
            latest,
            pct_change,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.yearly.is_empty()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.yearly.first().map(|m| m.annee)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.yearly.last().map(|m| m.annee)
    }

    /// (min, max) of the finite yearly means
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        let mut values = self.yearly.iter().map(|m| m.prixm2).filter(|v| v.is_finite());
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuneReport {
    pub commune: String,
    /// Rows matched for the commune, all property types included
    pub rows: usize,
    pub appartement: PriceTrend,
    pub maison: PriceTrend,
}

impl CommuneReport {
    pub fn trend(&self, kind: PropertyType) -> &PriceTrend {
        match kind {
            PropertyType::Appartement => &self.appartement,
            PropertyType::Maison => &self.maison,
        }
    }
}

/// Outcome of selecting a commune.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Selection {
    NoData { commune: String },
    Report(CommuneReport),
}

impl Selection {
    pub fn report(&self) -> Option<&CommuneReport> {
        match self {
            Selection::Report(report) => Some(report),
            Selection::NoData { .. } => None,
        }
    }
}

/// Run the whole aggregation for one commune.
///
/// An unknown commune short-circuits to `Selection::NoData` before any grouping.
pub fn select_commune(dataset: &Dataset, commune: &str) -> Selection {
    let rows = dataset.rows_for(commune);

    if rows.is_empty() {
        debug!(commune, "no rows for commune");
        return Selection::NoData {
            commune: commune.to_string(),
        };
    }

    let appartement = trend_for(&rows, PropertyType::Appartement);
    let maison = trend_for(&rows, PropertyType::Maison);

    debug!(
        commune,
        rows = rows.len(),
        appartement_years = appartement.yearly.len(),
        maison_years = maison.yearly.len(),
        "commune aggregated"
    );

    Selection::Report(CommuneReport {
        commune: commune.to_string(),
        rows: rows.len(),
        appartement,
        maison,
    })
}

fn trend_for(rows: &[&Transaction], kind: PropertyType) -> PriceTrend {
    let subset: Vec<&Transaction> = rows.iter().copied().filter(|tx| tx.is(kind)).collect();
    PriceTrend::from_means(kind, yearly_means(&subset))
}

/// Group rows by `annee` and average `prixm2`. One entry per distinct year, ascending.
pub fn yearly_means(rows: &[&Transaction]) -> Vec<YearlyMean> {
    let mut groups: BTreeMap<i32, (f64, usize)> = BTreeMap::new();

    for tx in rows {
        let entry = groups.entry(tx.annee).or_insert((0.0, 0));
        entry.0 += tx.prixm2;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(annee, (sum, count))| YearlyMean {
            annee,
            prixm2: sum / count as f64,
        })
        .collect()
}

/// `(latest - previous) / previous * 100` over the last two entries.
pub fn percent_change(yearly: &[YearlyMean]) -> Option<f64> {
    match yearly {
        [.., previous, latest] if previous.prixm2 != 0.0 => {
            Some((latest.prixm2 - previous.prixm2) / previous.prixm2 * 100.0)
        }
        _ => None,
    }
}
