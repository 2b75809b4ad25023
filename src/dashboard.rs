//! Static HTML dashboards
//!
//! Each chart becomes a titled panel holding the data table of the columns
//! it plots. Rendering needs no scripts or network access.

use crate::error::{PlatformError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Pie,
}

impl ChartKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_lowercase().as_str() {
            "bar" => Some(ChartKind::Bar),
            "line" => Some(ChartKind::Line),
            "scatter" => Some(ChartKind::Scatter),
            "pie" => Some(ChartKind::Pie),
            _ => None,
        }
    }
}

/// One chart request. Bar, line and scatter charts plot `y` against `x`;
/// pie charts plot `values` by `names`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub values: Option<String>,
    pub names: Option<String>,
}

impl ChartSpec {
    pub fn xy(kind: &str, title: &str, x: &str, y: &str) -> Self {
        Self {
            kind: kind.to_string(),
            title: title.to_string(),
            x: Some(x.to_string()),
            y: Some(y.to_string()),
            ..Self::default()
        }
    }

    /// Columns the chart reads, in display order
    fn columns(&self, kind: ChartKind) -> Vec<&str> {
        let primary = match kind {
            ChartKind::Pie => [self.names.as_deref(), self.values.as_deref()],
            _ => [self.x.as_deref(), self.y.as_deref()],
        };
        let extra = match kind {
            ChartKind::Scatter => [self.color.as_deref(), self.size.as_deref()],
            ChartKind::Pie => [None, None],
            _ => [self.color.as_deref(), None],
        };
        let mut columns: Vec<&str> = Vec::new();
        for name in primary.into_iter().chain(extra).flatten() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        columns
    }
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub kind: ChartKind,
    pub title: String,
    pub table: DataFrame,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub title: String,
    pub panels: Vec<Panel>,
}

impl Dashboard {
    /// Build panels for the recognised chart kinds; unknown kinds are
    /// skipped. Missing columns fail the whole dashboard.
    pub fn build(df: &DataFrame, charts: &[ChartSpec], title: &str) -> Result<Self> {
        let mut panels = Vec::with_capacity(charts.len());
        for chart in charts {
            let Some(kind) = ChartKind::parse(&chart.kind) else {
                warn!("Skipping chart {:?} of unknown type {}", chart.title, chart.kind);
                continue;
            };
            let columns = chart.columns(kind);
            if columns.is_empty() {
                return Err(PlatformError::Validation(format!(
                    "Chart {:?} names no columns",
                    chart.title
                )));
            }
            let table = df.select(&columns).map_err(|_| {
                PlatformError::Validation(format!(
                    "Chart {:?} uses columns missing from the data: {}",
                    chart.title,
                    columns.join(", ")
                ))
            })?;
            panels.push(Panel {
                kind,
                title: chart.title.clone(),
                table,
            });
        }

        Ok(Self {
            title: title.to_string(),
            panels,
        })
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let _ = writeln!(html, "<!DOCTYPE html>");
        let _ = writeln!(html, "<html lang=\"en\">");
        let _ = writeln!(html, "<head>");
        let _ = writeln!(html, "<meta charset=\"utf-8\">");
        let _ = writeln!(html, "<title>{}</title>", escape(&self.title));
        let _ = writeln!(html, "<style>{}</style>", STYLE);
        let _ = writeln!(html, "</head>");
        let _ = writeln!(html, "<body>");
        let _ = writeln!(html, "<h1>{}</h1>", escape(&self.title));

        for panel in &self.panels {
            let kind = match panel.kind {
                ChartKind::Bar => "bar",
                ChartKind::Line => "line",
                ChartKind::Scatter => "scatter",
                ChartKind::Pie => "pie",
            };
            let _ = writeln!(html, "<section class=\"panel {}\">", kind);
            let _ = writeln!(html, "<h2>{}</h2>", escape(&panel.title));
            write_table(&mut html, &panel.table);
            let _ = writeln!(html, "</section>");
        }

        let _ = writeln!(html, "</body>");
        let _ = writeln!(html, "</html>");
        html
    }

    pub fn write_html<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_html())?;
        info!("Dashboard written to {}", path.display());
        Ok(())
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse}\
td,th{border:1px solid #ccc;padding:4px 8px}\
th{background:#f0f0f0}\
.panel{margin-bottom:2em}";

fn write_table(html: &mut String, table: &DataFrame) {
    let _ = writeln!(html, "<table>");
    let _ = write!(html, "<tr>");
    for name in table.get_column_names() {
        let _ = write!(html, "<th>{}</th>", escape(name));
    }
    let _ = writeln!(html, "</tr>");

    for row in 0..table.height() {
        let _ = write!(html, "<tr>");
        for series in table.get_columns() {
            let cell = match series.get(row) {
                Ok(AnyValue::Null) | Err(_) => String::new(),
                Ok(AnyValue::Utf8(s)) => s.to_string(),
                Ok(value) => value.to_string(),
            };
            let _ = write!(html, "<td>{}</td>", escape(&cell));
        }
        let _ = writeln!(html, "</tr>");
    }
    let _ = writeln!(html, "</table>");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> DataFrame {
        df!(
            "region" => &["north", "south"],
            "sales" => &[10.5, 20.0],
            "share" => &[0.4, 0.6]
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_kinds_are_skipped() {
        let charts = vec![
            ChartSpec::xy("bar", "Sales", "region", "sales"),
            ChartSpec::xy("heatmap", "Heat", "region", "sales"),
            ChartSpec {
                kind: "pie".to_string(),
                title: "Share".to_string(),
                names: Some("region".to_string()),
                values: Some("share".to_string()),
                ..ChartSpec::default()
            },
        ];
        let dashboard = Dashboard::build(&data(), &charts, "Regional").unwrap();

        assert_eq!(dashboard.panels.len(), 2);
        assert_eq!(dashboard.panels[1].kind, ChartKind::Pie);
        assert_eq!(
            dashboard.panels[1].table.get_column_names(),
            vec!["region", "share"]
        );
    }

    #[test]
    fn test_missing_column() {
        let charts = vec![ChartSpec::xy("line", "Trend", "month", "sales")];
        assert!(matches!(
            Dashboard::build(&data(), &charts, "Broken"),
            Err(PlatformError::Validation(_))
        ));
    }

    #[test]
    fn test_html_is_escaped() {
        let charts = vec![ChartSpec::xy("bar", "Sales <2024>", "region", "sales")];
        let html = Dashboard::build(&data(), &charts, "Q&A")
            .unwrap()
            .to_html();

        assert!(html.contains("<title>Q&amp;A</title>"));
        assert!(html.contains("<h2>Sales &lt;2024&gt;</h2>"));
        assert!(html.contains("<td>north</td>"));
        assert!(html.contains("<td>10.5</td>"));
    }
}
