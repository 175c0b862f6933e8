// ⚙️ Configuration
// defaults → TOML file (regstats.toml or --config) → REGSTATS_* env → validate()

use crate::facade::AnalyticsOptions;
use crate::insights::InsightThresholds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File picked up from the working directory when no --config is given
pub const DEFAULT_CONFIG_FILE: &str = "regstats.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub analytics: AnalyticsConfig,
    pub insights: InsightThresholds,
    pub generator: GeneratorConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the fact store
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("vehicle_data.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub leaderboard_size: usize,
    pub min_leaderboard_registrations: u64,
    /// Window used when a request names no dates (trailing months of data)
    pub default_window_months: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let options = AnalyticsOptions::default();
        AnalyticsConfig {
            leaderboard_size: options.leaderboard_size,
            min_leaderboard_registrations: options.min_leaderboard_registrations,
            default_window_months: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub start_year: i32,
    pub end_year: i32,
    /// Compound growth per year, as a fraction
    pub annual_growth: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            seed: 42,
            start_year: 2020,
            end_year: 2024,
            annual_growth: 0.08,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive (trace, debug, info, warn, error, or per-target)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl AppConfig {
    /// Full load: explicit file (must exist) or ./regstats.toml when present,
    /// then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Values that fail to parse are ignored, keeping the previous layer
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        if let Some(path) = lookup("REGSTATS_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(size) = parsed(lookup("REGSTATS_LEADERBOARD_SIZE")) {
            self.analytics.leaderboard_size = size;
        }
        if let Some(floor) = parsed(lookup("REGSTATS_MIN_LEADERBOARD_REGISTRATIONS")) {
            self.analytics.min_leaderboard_registrations = floor;
        }
        if let Some(months) = parsed(lookup("REGSTATS_WINDOW_MONTHS")) {
            self.analytics.default_window_months = months;
        }
        if let Some(seed) = parsed(lookup("REGSTATS_SEED")) {
            self.generator.seed = seed;
        }
        if let Some(level) = lookup("REGSTATS_LOG_LEVEL") {
            self.logging.level = level;
        }
        match lookup("REGSTATS_LOG_FORMAT").map(|f| f.to_ascii_lowercase()).as_deref() {
            Some("json") => self.logging.format = LogFormat::Json,
            Some("text") => self.logging.format = LogFormat::Text,
            _ => {}
        }
        if let Some(host) = lookup("REGSTATS_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parsed(lookup("REGSTATS_PORT")) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            anyhow::bail!("database.path must not be empty");
        }

        if self.analytics.default_window_months == 0 {
            anyhow::bail!("analytics.default_window_months must be greater than 0");
        }

        if self.generator.start_year > self.generator.end_year {
            anyhow::bail!(
                "generator.start_year {} is after end_year {}",
                self.generator.start_year,
                self.generator.end_year
            );
        }

        if !self.generator.annual_growth.is_finite() || self.generator.annual_growth <= -1.0 {
            anyhow::bail!("generator.annual_growth must be a finite fraction above -1");
        }

        self.analytics_options()
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid analytics settings: {}", e))?;

        Ok(())
    }

    pub fn analytics_options(&self) -> AnalyticsOptions {
        AnalyticsOptions {
            leaderboard_size: self.analytics.leaderboard_size,
            min_leaderboard_registrations: self.analytics.min_leaderboard_registrations,
            insights: self.insights.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analytics.min_leaderboard_registrations, 1000);
        assert_eq!(config.analytics_options(), AnalyticsOptions::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
path = "/tmp/regs.db"

[insights]
high_growth_pct = 35.0

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/regs.db"));
        assert_eq!(config.insights.high_growth_pct, 35.0);
        assert_eq!(config.insights.decline_pct, -10.0);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.analytics.leaderboard_size, 10);
    }

    #[test]
    fn test_missing_or_broken_file_is_an_error() {
        assert!(AppConfig::from_file(Path::new("/nonexistent/regstats.toml")).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analytics\nleaderboard_size = ").unwrap();
        assert!(AppConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("REGSTATS_DB_PATH", "env.db"),
            ("REGSTATS_LEADERBOARD_SIZE", "5"),
            ("REGSTATS_SEED", "not-a-number"),
            ("REGSTATS_LOG_FORMAT", "JSON"),
            ("REGSTATS_PORT", "8080"),
        ]);

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("env.db"));
        assert_eq!(config.analytics.leaderboard_size, 5);
        assert_eq!(config.generator.seed, 42, "unparsable value is ignored");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.generator.start_year = 2025;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analytics.leaderboard_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.insights.leader_share = f64::NAN;
        assert!(config.validate().is_err());
    }
}
