//! # BI Platform
//!
//! One entry point over the analysis crates: workbook inspection, pivot
//! tables, static dashboards, KPIs, trend analysis and forecasting.
//!
//! ## Example
//!
//! ```no_run
//! use bi_platform::{DataAnalystPlatform, ModelParams, PlatformConfig};
//! use bi_analytics::DataLoader;
//!
//! let platform = DataAnalystPlatform::new(PlatformConfig::default());
//! let data = DataLoader::load("sales.csv", None, None)?;
//! let params = ModelParams::default();
//! let forecast = platform.forecast(&data, "date", "revenue", 12, "arima", &params)?;
//! println!("{:?}", forecast.values);
//! # Ok::<(), bi_platform::PlatformError>(())
//! ```

pub mod config;
pub mod dashboard;
pub mod error;
pub mod kpi;

pub use crate::config::{AnalysisDefaults, DatabaseConfig, PlatformConfig, ReportConfig};
pub use crate::dashboard::{ChartKind, ChartSpec, Dashboard};
pub use crate::error::{PlatformError, Result};
pub use crate::kpi::{KpiKind, KpiSpec};

use bi_analytics::{
    AnalyticsError, DataQualityChecker, Dataset, Forecast, ForecastEngine, KpiCalculator,
    ModelSpec, QualityReport, SeasonalOrder, TrendAnalyzer, TrendConfig, TrendReport,
};
use bi_excel::{AggFunc, ExcelAnalyzer, PivotGenerator, SheetAnalysis};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Sheet names and per-sheet profiles of a workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcelReport {
    pub file: PathBuf,
    pub sheet_names: Vec<String>,
    pub defined_names: BTreeMap<String, String>,
    pub sheet_analyses: BTreeMap<String, SheetAnalysis>,
}

/// Optional model parameters for [`DataAnalystPlatform::forecast`]. Unset
/// orders fall back to the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub order: Option<(usize, usize, usize)>,
    pub seasonal_order: Option<SeasonalOrder>,
    pub features: Option<Vec<String>>,
}

/// Facade composing the analysis components. Each call builds the
/// component it needs, so calls are independent.
#[derive(Debug, Clone, Default)]
pub struct DataAnalystPlatform {
    config: PlatformConfig,
}

impl DataAnalystPlatform {
    pub fn new(config: PlatformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn analyze_excel<P: AsRef<Path>>(&self, path: P) -> Result<ExcelReport> {
        let path = path.as_ref();
        let analysis = ExcelAnalyzer::open(path)?.analyze_workbook()?;
        info!(
            "Analyzed {} sheets of {}",
            analysis.sheet_names.len(),
            path.display()
        );

        Ok(ExcelReport {
            file: path.to_path_buf(),
            sheet_names: analysis.sheet_names,
            defined_names: analysis.defined_names,
            sheet_analyses: analysis
                .sheets
                .into_iter()
                .map(|sheet| (sheet.sheet_name.clone(), sheet))
                .collect(),
        })
    }

    pub fn create_pivot(
        &self,
        data: &Dataset,
        index: &str,
        columns: Option<&str>,
        values: &[&str],
        aggfunc: &str,
    ) -> Result<DataFrame> {
        let aggfunc: AggFunc = aggfunc.parse()?;
        let pivot =
            PivotGenerator::new(data.frame().clone()).create_pivot(index, columns, values, aggfunc)?;
        info!(
            "Pivot of {} by {} has {} rows",
            values.join(", "),
            index,
            pivot.height()
        );
        Ok(pivot)
    }

    /// Write a pivot table to `.xlsx` or `.csv` under the report directory.
    /// A path without an extension is written as `.xlsx`.
    pub fn export_pivot<P: AsRef<Path>>(&self, pivot: &DataFrame, path: P) -> Result<PathBuf> {
        let mut path = path.as_ref().to_path_buf();
        if path.extension().is_none() {
            path.set_extension("xlsx");
        }
        let (path, format) = self.config.reports.report_path(&path)?;
        if format != "excel" && format != "csv" {
            return Err(PlatformError::Validation(format!(
                "Pivot tables export to .xlsx or .csv, not {}",
                format
            )));
        }
        create_parent_dir(&path)?;
        bi_excel::export(pivot, &path, &self.config.reports.pivot_sheet)?;
        Ok(path)
    }

    /// Write a dashboard as HTML under the report directory
    pub fn export_dashboard<P: AsRef<Path>>(
        &self,
        dashboard: &Dashboard,
        path: P,
    ) -> Result<PathBuf> {
        let (path, format) = self.config.reports.report_path(path.as_ref())?;
        if format != "html" {
            return Err(PlatformError::Validation(format!(
                "Dashboards export to .html, not {}",
                format
            )));
        }
        create_parent_dir(&path)?;
        dashboard.write_html(&path)?;
        Ok(path)
    }

    /// Static dashboard; the configured title is used when `title` is `None`
    pub fn create_dashboard(
        &self,
        data: &Dataset,
        charts: &[ChartSpec],
        title: Option<&str>,
    ) -> Result<Dashboard> {
        let title = title.unwrap_or(&self.config.reports.title);
        Dashboard::build(data.frame(), charts, title)
    }

    /// Evaluate each KPI, keyed by its name
    pub fn calculate_kpis(
        &self,
        data: &Dataset,
        kpis: &[KpiSpec],
    ) -> Result<BTreeMap<String, DataFrame>> {
        let calculator = KpiCalculator::new(Some(data.clone()));
        let clv_period_days = self.config.analysis.clv_period_days;
        kpis.iter()
            .map(|kpi| Ok((kpi.name.clone(), kpi.evaluate(&calculator, clv_period_days)?)))
            .collect()
    }

    /// Trend analysis of `value_col` indexed by `date_col`. Without a
    /// configuration every analysis runs with the configured defaults.
    pub fn analyze_trends(
        &self,
        data: &Dataset,
        date_col: &str,
        value_col: &str,
        config: Option<&TrendConfig>,
    ) -> Result<TrendReport> {
        let defaults;
        let config = match config {
            Some(config) => config,
            None => {
                defaults = self.config.analysis.trend_config();
                &defaults
            }
        };

        let mut analyzer = TrendAnalyzer::default();
        analyzer.load(data.clone(), Some(date_col), Some(value_col))?;
        Ok(analyzer.analyze(Some(value_col), config)?)
    }

    /// Train `model_type` (`arima`, `sarima` or `linear`) on `value_col` and
    /// forecast `steps` periods
    pub fn forecast(
        &self,
        data: &Dataset,
        date_col: &str,
        value_col: &str,
        steps: usize,
        model_type: &str,
        params: &ModelParams,
    ) -> Result<Forecast> {
        let defaults = &self.config.analysis;
        let column = Some(value_col.to_string());
        let spec = match model_type.trim().to_lowercase().as_str() {
            "arima" => ModelSpec::Arima {
                column,
                order: params.order.unwrap_or(defaults.arima_order),
            },
            "sarima" => ModelSpec::Sarima {
                column,
                order: params.order.unwrap_or(defaults.arima_order),
                seasonal_order: params.seasonal_order.unwrap_or(defaults.seasonal_order),
            },
            "linear" => ModelSpec::Linear {
                column,
                features: params.features.clone(),
            },
            other => {
                return Err(AnalyticsError::UnsupportedConfiguration(format!(
                    "Unsupported model type: {}",
                    other
                ))
                .into())
            }
        };

        // Linear models keep every column as a candidate feature
        let value_filter = match spec {
            ModelSpec::Linear { .. } => None,
            _ => Some(value_col),
        };

        let mut engine = ForecastEngine::new();
        engine.load(data.clone(), Some(date_col), value_filter)?;
        engine.train(spec)?;
        Ok(engine.forecast(steps, Some(value_col))?.clone())
    }

    pub fn check_quality(&self, data: &Dataset, rules: &[&str]) -> Result<QualityReport> {
        Ok(DataQualityChecker::validate(data, rules)?)
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
