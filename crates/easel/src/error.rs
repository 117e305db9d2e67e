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

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EaselError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
    #[error("LLM error: {0}")]
    Llm(#[from] llm_contracts::LLMError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
    #[error("Failed to read data file '{path}': {source}")]
    DataFileError {
        path: String,
        #[source]
        source: polars::error::PolarsError,
    },
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },
    #[error("Empty dataset provided")]
    EmptyDataset,
}

/// Failures raised while interpreting a chart plan against a dataframe.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Column '{column}' not found in dataframe")]
    MissingColumn { column: String },
    #[error("Column '{column}' is not numeric (found {found})")]
    NonNumericColumn { column: String, found: String },
    #[error("Column '{column}' has no usable values")]
    NoUsableValues { column: String },
    #[error("Chart needs {required} columns, dataset has {available}")]
    InsufficientColumns { required: usize, available: usize },
    #[error("Dataframe has {rows} rows, limit is {limit}")]
    RowLimitExceeded { rows: usize, limit: usize },
    #[error("Rendering exceeded the {0:?} time budget")]
    DeadlineExceeded(Duration),
    #[error("Chart plan is not renderable: {reason}")]
    NotRenderable { reason: String },
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
    #[error("Interpreter panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}

#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    JsonSerialisationError {
        #[from]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, EaselError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type RenderResult<T> = std::result::Result<T, RenderError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl From<serde_json::Error> for EaselError {
    fn from(err: serde_json::Error) -> Self {
        EaselError::Serialisation(SerialisationError::JsonSerialisationError { source: err })
    }
}

impl RenderError {
    /// Remediation text shown under the error message in the placeholder figure.
    pub fn hint(&self) -> &'static str {
        match self {
            RenderError::MissingColumn { .. } | RenderError::NonNumericColumn { .. } => {
                "Check the column names in your prompt against the dataset."
            }
            RenderError::RowLimitExceeded { .. } | RenderError::DeadlineExceeded(_) => {
                "Try filtering the dataset or asking for an aggregated chart."
            }
            _ => "Try rephrasing your prompt or use a different chart type.",
        }
    }
}
