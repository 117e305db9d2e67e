// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Layered configuration: compiled defaults, then an optional TOML file,
//! then `EASEL_*` / `OLLAMA_*` environment variables.

use crate::error::{ConfigError, ConfigResult};
use llm_contracts::{GenerationOptions, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EaselConfig {
    pub llm: LlmConfig,
    pub charts: ChartsConfig,
    pub sandbox: SandboxConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub provider: ProviderSettings,
    pub options: GenerationOptions,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: ProviderSettings::default(),
            options: GenerationOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub height: u32,
    pub template: String,
    pub color_scale: String,
    pub diverging_scale: String,
    pub histogram_bins: u32,
    pub heatmap_max_columns: usize,
    pub kpi_default_metric: String,
    pub fallback_rows: usize,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            height: 400,
            template: "plotly_dark".to_string(),
            color_scale: "Viridis".to_string(),
            diverging_scale: "RdBu_r".to_string(),
            histogram_bins: 30,
            heatmap_max_columns: 4,
            kpi_default_metric: "Response".to_string(),
            fallback_rows: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub max_duration_ms: u64,
    pub max_rows: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: 2_000,
            max_rows: 5_000_000,
        }
    }
}

impl SandboxConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub fuzzy_cutoff: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { fuzzy_cutoff: 0.6 }
    }
}

impl EaselConfig {
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigFileError {
                path: path.display().to_string(),
                source,
            })?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&content)
    }

    /// Defaults, optional file, then process environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a key lookup; the lookup is injectable so tests
    /// never touch the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OLLAMA_BASE_URL").or_else(|| lookup("EASEL_LLM_URL")) {
            self.llm.provider.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL").or_else(|| lookup("EASEL_LLM_MODEL")) {
            self.llm.provider.model = model;
        }
        if let Some(value) = lookup("EASEL_LLM_ENABLED") {
            self.llm.enabled = parse_value("EASEL_LLM_ENABLED", &value)?;
        }
        if let Some(value) = lookup("EASEL_LLM_TIMEOUT_SECONDS") {
            self.llm.provider.timeout_seconds = parse_value("EASEL_LLM_TIMEOUT_SECONDS", &value)?;
        }
        if let Some(value) = lookup("EASEL_LLM_TEMPERATURE") {
            self.llm.options.temperature = parse_value("EASEL_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("EASEL_CHART_HEIGHT") {
            self.charts.height = parse_value("EASEL_CHART_HEIGHT", &value)?;
        }
        if let Some(value) = lookup("EASEL_CHART_TEMPLATE") {
            self.charts.template = value;
        }
        if let Some(value) = lookup("EASEL_SANDBOX_MAX_DURATION_MS") {
            self.sandbox.max_duration_ms = parse_value("EASEL_SANDBOX_MAX_DURATION_MS", &value)?;
        }
        if let Some(value) = lookup("EASEL_SANDBOX_MAX_ROWS") {
            self.sandbox.max_rows = parse_value("EASEL_SANDBOX_MAX_ROWS", &value)?;
        }
        if let Some(value) = lookup("EASEL_FUZZY_CUTOFF") {
            self.validation.fuzzy_cutoff = parse_value("EASEL_FUZZY_CUTOFF", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.llm
            .provider
            .validate()
            .and_then(|_| self.llm.options.validate())
            .map_err(|reason| ConfigError::ValidationFailed { reason })?;

        if self.charts.height == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "charts.height must be greater than 0".to_string(),
            });
        }
        if self.charts.histogram_bins == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "charts.histogram_bins must be greater than 0".to_string(),
            });
        }
        if self.charts.heatmap_max_columns < 2 {
            return Err(ConfigError::ValidationFailed {
                reason: "charts.heatmap_max_columns must be at least 2".to_string(),
            });
        }
        if self.sandbox.max_duration_ms == 0 || self.sandbox.max_rows == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "sandbox limits must be greater than 0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.validation.fuzzy_cutoff) {
            return Err(ConfigError::ValidationFailed {
                reason: "validation.fuzzy_cutoff must be between 0.0 and 1.0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}
