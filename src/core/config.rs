use crate::core::analytics::ENGLISH_MONTH_NAMES;
use crate::core::ledger::Month;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenExchangeConfig {
    pub base_url: String,
    #[serde(default)]
    pub app_id: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub open_exchange: Option<OpenExchangeConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            open_exchange: Some(OpenExchangeConfig {
                base_url: "https://openexchangerates.org".to_string(),
                app_id: String::new(),
            }),
        }
    }
}

fn default_base_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Currency every figure is reported in.
    pub currency: String,
    /// Currency all stored rates are relative to.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
    pub month_names: Option<Vec<String>>,
    /// Price months without any resolvable rates at rate 1.0 instead of failing.
    #[serde(default)]
    pub allow_default_rates: bool,
    #[serde(default)]
    pub months: Vec<Month>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "fxbudget", "fxbudget")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "fxbudget", "fxbudget")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            bail!("Target currency must not be empty");
        }
        if let Some(names) = &self.month_names {
            if names.len() != 12 {
                bail!("month_names must list 12 names, found {}", names.len());
            }
        }

        let mut seen = HashSet::new();
        for month in &self.months {
            if month.month > 11 {
                bail!(
                    "Month index {} in year {} is out of range (0-11)",
                    month.month,
                    month.year
                );
            }
            if !seen.insert(month.id()) {
                bail!("Month {} is listed more than once", month.id());
            }
        }
        Ok(())
    }

    /// Localized month labels, English unless configured.
    pub fn month_labels(&self) -> Vec<String> {
        match &self.month_names {
            Some(names) => names.clone(),
            None => ENGLISH_MONTH_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }
}
