// View model shared by the terminal dashboard, the web page and the CLI report.
// Everything here is display text and axis geometry; no widget code.

use crate::aggregate::{PriceTrend, Selection};
use crate::dataset::PropertyType;
use serde::Serialize;

pub const PAGE_TITLE: &str = "Évolution du Prix au m² en France";
pub const SELECT_PROMPT: &str = "Sélectionnez une commune :";
pub const NO_DATA_MESSAGE: &str = "Aucune donnée disponible pour cette commune.";
pub const NOT_AVAILABLE: &str = "N/A";
pub const X_AXIS_LABEL: &str = "Année";
pub const Y_AXIS_LABEL: &str = "Prix au m² (€)";

/// Padding applied below the minimum and above the maximum of the y axis
pub const Y_PADDING: f64 = 0.05;

/// Most x-axis ticks a chart gets; longer spans are labelled every n years
pub const MAX_X_TICKS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricView {
    pub label: String,
    pub value: String,
    pub delta: String,
    pub direction: Option<Direction>,
}

impl MetricView {
    pub fn from_trend(trend: &PriceTrend) -> Self {
        let kind = trend.property_type;
        MetricView {
            label: format!("{} - Prix au m² moyen", kind.display_label()),
            value: trend
                .latest
                .map(format_price)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            delta: trend
                .pct_change
                .map(format_delta)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            direction: trend.pct_change.map(direction_of),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub points: Vec<(i32, f64)>,
    /// Evenly spaced years starting at the first year: every year when the
    /// span fits in `MAX_X_TICKS`, otherwise a wider step. The last tick is
    /// always at or after the last year.
    pub x_ticks: Vec<i32>,
    /// Min and max padded outward by 5%; `None` for an empty or all-NaN series
    pub y_range: Option<(f64, f64)>,
}

impl ChartSpec {
    pub fn from_trend(trend: &PriceTrend) -> Self {
        let x_ticks = match (trend.first_year(), trend.last_year()) {
            (Some(first), Some(last)) => year_ticks(first, last),
            _ => Vec::new(),
        };

        ChartSpec {
            title: format!("{} - Prix au m²", trend.property_type.display_label()),
            x_label: X_AXIS_LABEL,
            y_label: Y_AXIS_LABEL,
            points: trend.yearly.iter().map(|m| (m.annee, m.prixm2)).collect(),
            x_ticks,
            y_range: trend.price_bounds().map(padded_range),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub property_type: PropertyType,
    pub metric: MetricView,
    pub chart: ChartSpec,
}

impl PanelView {
    pub fn from_trend(trend: &PriceTrend) -> Self {
        PanelView {
            property_type: trend.property_type,
            metric: MetricView::from_trend(trend),
            chart: ChartSpec::from_trend(trend),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardView {
    NoData {
        commune: String,
        message: String,
    },
    Report {
        commune: String,
        heading: String,
        rows: usize,
        /// Apartments first, houses second
        panels: Vec<PanelView>,
    },
}

impl DashboardView {
    pub fn from_selection(selection: &Selection) -> Self {
        match selection {
            Selection::NoData { commune } => DashboardView::NoData {
                commune: commune.clone(),
                message: NO_DATA_MESSAGE.to_string(),
            },
            Selection::Report(report) => DashboardView::Report {
                commune: report.commune.clone(),
                heading: format!("Évolution du prix au m² pour : {}", report.commune),
                rows: report.rows,
                panels: PropertyType::ALL
                    .iter()
                    .map(|kind| PanelView::from_trend(report.trend(*kind)))
                    .collect(),
            },
        }
    }

    pub fn commune(&self) -> &str {
        match self {
            DashboardView::NoData { commune, .. } | DashboardView::Report { commune, .. } => {
                commune
            }
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, DashboardView::NoData { .. })
    }
}

/// "9,500€/m²"
pub fn format_price(value: f64) -> String {
    format!("{}€/m²", format_thousands(value))
}

/// "5.56% depuis 12 mois"
pub fn format_delta(pct: f64) -> String {
    format!("{:.2}% depuis 12 mois", pct)
}

/// Round to a whole number and group digits by three with commas.
pub fn format_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if value < 0.0 && digits != "0" {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Pad by 5% of each bound's magnitude so a negative minimum still moves down.
pub fn padded_range((min, max): (f64, f64)) -> (f64, f64) {
    (min - min.abs() * Y_PADDING, max + max.abs() * Y_PADDING)
}

/// `first, first + step, ...` up to the first tick >= `last`, at most `MAX_X_TICKS` long.
pub fn year_ticks(first: i32, last: i32) -> Vec<i32> {
    let span = (i64::from(last) - i64::from(first)).max(0);
    let max_steps = (MAX_X_TICKS - 1) as i64;
    let step = ((span + max_steps - 1) / max_steps).max(1);
    let steps = (span + step - 1) / step;

    (0..=steps)
        .map(|k| (i64::from(first) + k * step) as i32)
        .collect()
}

fn direction_of(pct: f64) -> Direction {
    if pct > 0.0 {
        Direction::Up
    } else if pct < 0.0 {
        Direction::Down
    } else {
        Direction::Flat
    }
}
