//! Platform configuration
//!
//! Every section has defaults, so a JSON file only needs the keys it
//! changes. `BI_*` environment variables override file values.

use crate::error::{PlatformError, Result};
use bi_analytics::kpi::DEFAULT_CLV_PERIOD_DAYS;
use bi_analytics::trend::{
    DecompositionModel, DEFAULT_ES_ALPHA, DEFAULT_MA_WINDOW, DEFAULT_OUTLIER_THRESHOLD,
};
use bi_analytics::{AnalyticsError, SeasonalOrder, TrendConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_DASHBOARD_TITLE: &str = "IBM Data Analyst Dashboard";
pub const DEFAULT_FORECAST_STEPS: usize = 10;

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// `postgresql`, `sqlserver` or `sqlite`
    pub driver: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "analytics_dev".to_string(),
            username: "analyst".to_string(),
            password: String::new(),
            driver: "postgresql".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Connection URL for the configured driver
    pub fn connection_string(&self) -> Result<String> {
        match self.driver.as_str() {
            "postgresql" => Ok(format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database
            )),
            "sqlserver" => Ok(format!(
                "mssql+pyodbc://{}:{}@{}:{}/{}?driver=ODBC+Driver+17+for+SQL+Server",
                self.username, self.password, self.host, self.port, self.database
            )),
            "sqlite" => Ok(format!("sqlite:///{}", self.database)),
            other => Err(AnalyticsError::UnsupportedConfiguration(format!(
                "Unsupported database driver: {}",
                other
            ))
            .into()),
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub output_dir: String,
    pub default_format: String,
    pub supported_formats: Vec<String>,
    /// Sheet name used when exporting pivot tables
    pub pivot_sheet: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_DASHBOARD_TITLE.to_string(),
            output_dir: "reports".to_string(),
            default_format: "html".to_string(),
            supported_formats: ["html", "pdf", "excel", "csv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            pivot_sheet: bi_excel::DEFAULT_PIVOT_SHEET.to_string(),
        }
    }
}

impl ReportConfig {
    /// Output format named by a file extension
    pub fn format_of(extension: &str) -> Option<&'static str> {
        match extension.to_lowercase().as_str() {
            "html" | "htm" => Some("html"),
            "pdf" => Some("pdf"),
            "xlsx" => Some("excel"),
            "csv" => Some("csv"),
            _ => None,
        }
    }

    fn extension_of(format: &str) -> Option<&'static str> {
        match format {
            "html" => Some("html"),
            "pdf" => Some("pdf"),
            "excel" => Some("xlsx"),
            "csv" => Some("csv"),
            _ => None,
        }
    }

    /// Where a report named `path` is written, and in which format.
    ///
    /// Relative paths land in `output_dir`. A path without an extension gets
    /// the extension of `default_format`. The format must be listed in
    /// `supported_formats`.
    pub fn report_path(&self, path: &Path) -> Result<(PathBuf, String)> {
        let mut resolved = if path.is_relative() {
            Path::new(&self.output_dir).join(path)
        } else {
            path.to_path_buf()
        };

        let format = match resolved.extension().and_then(|e| e.to_str()) {
            Some(extension) => Self::format_of(extension).ok_or_else(|| {
                PlatformError::Validation(format!("Unknown report extension: .{}", extension))
            })?,
            None => {
                let extension = Self::extension_of(&self.default_format).ok_or_else(|| {
                    PlatformError::Config(format!(
                        "Unknown default report format: {}",
                        self.default_format
                    ))
                })?;
                resolved.set_extension(extension);
                Self::format_of(extension).unwrap_or("html")
            }
        };

        if !self.supported_formats.iter().any(|f| f == format) {
            return Err(PlatformError::Validation(format!(
                "Report format {} is not enabled (supported: {})",
                format,
                self.supported_formats.join(", ")
            )));
        }
        Ok((resolved, format.to_string()))
    }
}

/// Defaults for analyses when the caller does not give parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    pub ma_window: usize,
    pub es_alpha: f64,
    pub outlier_method: String,
    pub outlier_threshold: f64,
    pub decomposition_model: DecompositionModel,
    pub forecast_steps: usize,
    pub arima_order: (usize, usize, usize),
    pub seasonal_order: SeasonalOrder,
    pub clv_period_days: u32,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            ma_window: DEFAULT_MA_WINDOW,
            es_alpha: DEFAULT_ES_ALPHA,
            outlier_method: "zscore".to_string(),
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            decomposition_model: DecompositionModel::Additive,
            forecast_steps: DEFAULT_FORECAST_STEPS,
            arima_order: (1, 1, 1),
            seasonal_order: SeasonalOrder::default(),
            clv_period_days: DEFAULT_CLV_PERIOD_DAYS,
        }
    }
}

impl AnalysisDefaults {
    /// Trend configuration with every analysis enabled
    pub fn trend_config(&self) -> TrendConfig {
        TrendConfig {
            model: self.decomposition_model,
            ma_window: self.ma_window,
            es_alpha: self.es_alpha,
            outlier_method: self.outlier_method.clone(),
            outlier_threshold: self.outlier_threshold,
            ..TrendConfig::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub database: DatabaseConfig,
    pub reports: ReportConfig,
    pub analysis: AnalysisDefaults,
}

impl PlatformConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlatformError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// File settings (or defaults) with environment overrides applied
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BI_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BI_DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("BI_DB_PORT") {
            self.database.port = parse_override("BI_DB_PORT", &v)?;
        }
        if let Some(v) = lookup("BI_DB_NAME") {
            self.database.database = v;
        }
        if let Some(v) = lookup("BI_DB_USER") {
            self.database.username = v;
        }
        if let Some(v) = lookup("BI_DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("BI_DB_DRIVER") {
            self.database.driver = v;
        }
        if let Some(v) = lookup("BI_REPORT_TITLE") {
            self.reports.title = v;
        }
        if let Some(v) = lookup("BI_REPORT_DIR") {
            self.reports.output_dir = v;
        }
        if let Some(v) = lookup("BI_FORECAST_STEPS") {
            self.analysis.forecast_steps = parse_override("BI_FORECAST_STEPS", &v)?;
        }
        if let Some(v) = lookup("BI_MA_WINDOW") {
            self.analysis.ma_window = parse_override("BI_MA_WINDOW", &v)?;
        }
        Ok(())
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| PlatformError::Config(format!("Invalid {} value {:?}: {}", key, value, e)))
}
