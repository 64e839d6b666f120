//! Table and chart shapes for display
//!
//! Everything here is reshaping only: values from the merged forecast are
//! copied through untouched.

use crate::data::HistoricalSeries;
use crate::error::{DashboardError, Result};
use crate::merge::MergedForecastTable;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Date layout used in the table view
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Label attached to the forecast-origin marker
pub const ORIGIN_LABEL: &str = "Last observation";

/// Stroke colour of the forecast-origin marker
pub const ORIGIN_COLOR: &str = "gray";

/// Display-ready forecast table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    /// Column headers, date first
    pub columns: Vec<String>,
    /// One row per merged period
    pub rows: Vec<TableRow>,
}

/// One table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Date formatted as `YYYY-MM-DD`
    pub date: String,
    /// Point, low and high for model A, then for model B
    pub values: [f64; 6],
}

impl TableView {
    /// Build the table from a merged forecast
    pub fn from_merged(merged: &MergedForecastTable) -> Self {
        let (a, b) = (&merged.model_a, &merged.model_b);
        let columns = vec![
            "Date".to_string(),
            a.clone(),
            format!("{}_low", a),
            format!("{}_high", a),
            b.clone(),
            format!("{}_low", b),
            format!("{}_high", b),
        ];

        let rows = merged
            .rows
            .iter()
            .map(|r| TableRow {
                date: r.date.format(DATE_FORMAT).to_string(),
                values: [
                    r.point_a, r.lower_a, r.upper_a, r.point_b, r.lower_b, r.upper_b,
                ],
            })
            .collect();

        Self { columns, rows }
    }

    /// Render the table as CSV text
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            let mut record = vec![row.date.clone()];
            record.extend(row.values.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DashboardError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| DashboardError::DataError(e.to_string()))
    }
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .columns
            .iter()
            .map(|c| c.len())
            .max()
            .unwrap_or(0)
            .max(10);

        for column in &self.columns {
            write!(f, "{:>width$} ", column, width = width)?;
        }
        writeln!(f)?;

        for row in &self.rows {
            write!(f, "{:>width$} ", row.date, width = width)?;
            for value in &row.values {
                write!(f, "{:>width$.4} ", value, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A point on the chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Date axis
    pub x: NaiveDate,
    /// Rate axis
    pub y: f64,
}

/// How a trace is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// Open polyline
    Line,
    /// Closed, filled polygon
    Band,
}

/// One layer of the chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartTrace {
    /// Legend entry
    pub name: String,
    /// Drawing style
    pub kind: TraceKind,
    /// Points in drawing order
    pub points: Vec<ChartPoint>,
}

/// Vertical marker at the forecast origin, spanning the full plot height
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginMarker {
    /// Marker position on the date axis
    pub date: NaiveDate,
    /// Bottom of the marker, as a fraction of the plot height
    pub y_from: f64,
    /// Top of the marker, as a fraction of the plot height
    pub y_to: f64,
    /// Text shown next to the marker
    pub label: String,
    /// Stroke colour
    pub color: String,
    /// Drawn dashed, unlike the data traces
    pub dashed: bool,
}

/// Layered chart: history, forecast lines, interval bands and origin marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    /// Chart title
    pub title: String,
    /// Date axis title
    pub x_title: String,
    /// Value axis title
    pub y_title: String,
    /// Traces in drawing order
    pub traces: Vec<ChartTrace>,
    /// Forecast-origin marker
    pub marker: OriginMarker,
}

impl ChartView {
    /// Find a trace by its legend name
    pub fn trace(&self, name: &str) -> Option<&ChartTrace> {
        self.traces.iter().find(|t| t.name == name)
    }
}

impl fmt::Display for ChartView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for trace in &self.traces {
            let kind = match trace.kind {
                TraceKind::Line => "line",
                TraceKind::Band => "band",
            };
            write!(f, "  {:<28} {:<4} {:>5} points", trace.name, kind, trace.points.len())?;
            if let (Some(first), Some(last)) = (trace.points.first(), trace.points.last()) {
                write!(f, "  {} .. {}", first.x, last.x)?;
            }
            writeln!(f)?;
        }
        let stroke = if self.marker.dashed { "dashed" } else { "solid" };
        writeln!(
            f,
            "  | {} at {} ({} {})",
            self.marker.label, self.marker.date, stroke, self.marker.color
        )
    }
}

/// Closed polygon for an interval band: forward along `upper`, then back
/// along `lower`. Always `2 * dates.len()` points.
pub fn band_polygon(dates: &[NaiveDate], lower: &[f64], upper: &[f64]) -> Result<Vec<ChartPoint>> {
    if lower.len() != dates.len() || upper.len() != dates.len() {
        return Err(DashboardError::InvalidParameter(format!(
            "Band needs equal lengths, got {} dates, {} lower, {} upper",
            dates.len(),
            lower.len(),
            upper.len()
        )));
    }

    let forward = dates.iter().zip(upper).map(|(&x, &y)| ChartPoint { x, y });
    let backward = dates
        .iter()
        .zip(lower)
        .rev()
        .map(|(&x, &y)| ChartPoint { x, y });

    Ok(forward.chain(backward).collect())
}

/// Interval widths of the two models, used in legend names
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalWidths {
    /// Model A nominal width
    pub a: f64,
    /// Model B nominal width
    pub b: f64,
}

/// Build the chart from the history and the merged forecast
pub fn assemble_chart(
    history: &HistoricalSeries,
    merged: &MergedForecastTable,
    widths: IntervalWidths,
) -> Result<ChartView> {
    let dates = merged.dates();
    let column = |f: fn(&crate::merge::MergedRow) -> f64| -> Vec<f64> {
        merged.rows.iter().map(f).collect()
    };
    let line = |name: &str, values: Vec<f64>| ChartTrace {
        name: name.to_string(),
        kind: TraceKind::Line,
        points: dates
            .iter()
            .zip(values)
            .map(|(&x, y)| ChartPoint { x, y })
            .collect(),
    };

    let historical = ChartTrace {
        name: "Historical".to_string(),
        kind: TraceKind::Line,
        points: history
            .observations()
            .iter()
            .map(|o| ChartPoint { x: o.date, y: o.value })
            .collect(),
    };

    let band_a = ChartTrace {
        name: band_name(&merged.model_a, widths.a),
        kind: TraceKind::Band,
        points: band_polygon(&dates, &column(|r| r.lower_a), &column(|r| r.upper_a))?,
    };
    let band_b = ChartTrace {
        name: band_name(&merged.model_b, widths.b),
        kind: TraceKind::Band,
        points: band_polygon(&dates, &column(|r| r.lower_b), &column(|r| r.upper_b))?,
    };

    Ok(ChartView {
        title: "US Unemployment Rate Forecast".to_string(),
        x_title: "Date".to_string(),
        y_title: "Rate (%)".to_string(),
        traces: vec![
            historical,
            line(merged.model_a.as_str(), column(|r| r.point_a)),
            band_a,
            line(merged.model_b.as_str(), column(|r| r.point_b)),
            band_b,
        ],
        marker: OriginMarker {
            date: merged.origin,
            y_from: 0.0,
            y_to: 1.0,
            label: ORIGIN_LABEL.to_string(),
            color: ORIGIN_COLOR.to_string(),
            dashed: true,
        },
    })
}

fn band_name(model: &str, width: f64) -> String {
    format!("{} interval ({:.0}%)", model, width * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_band_polygon_order() {
        let d = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        let polygon = band_polygon(&[d(1), d(2), d(3)], &[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();

        let ys: Vec<f64> = polygon.iter().map(|p| p.y).collect();
        let xs: Vec<NaiveDate> = polygon.iter().map(|p| p.x).collect();
        assert_eq!(ys, vec![4.0, 5.0, 6.0, 3.0, 2.0, 1.0]);
        assert_eq!(xs, vec![d(1), d(2), d(3), d(3), d(2), d(1)]);
    }

    #[test]
    fn test_band_polygon_empty_and_mismatched() {
        assert!(band_polygon(&[], &[], &[]).unwrap().is_empty());

        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(band_polygon(&[d], &[1.0, 2.0], &[3.0]).is_err());
    }

    #[test]
    fn test_band_name() {
        assert_eq!(band_name("ARIMA", 0.8), "ARIMA interval (80%)");
    }
}
