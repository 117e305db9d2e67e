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

use crate::chart::Aggregation;
use crate::error::{DataError, DataResult};
use crate::frame::aggregate;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::{CsvReadOptions, DataFrame, DataType as PlDataType, SerReader, Series};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const TEMPORAL_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
];
const TYPE_CONFIDENCE_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Temporal,
    BinaryFlag,
}

impl ColumnKind {
    /// 0/1 flags count as numeric for axis selection, as dataframe libraries do.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Numeric | ColumnKind::BinaryFlag)
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Temporal => "temporal",
            ColumnKind::BinaryFlag => "binary flag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered column names and kinds of one dataframe. Derived once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatasetSchema {
    columns: Vec<ColumnSchema>,
}

impl DatasetSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnKind)>,
        S: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, kind)| ColumnSchema {
                    name: name.into(),
                    kind,
                })
                .collect(),
        }
    }

    pub fn from_dataframe(df: &DataFrame) -> DataResult<Self> {
        let columns = df
            .get_columns()
            .iter()
            .map(|column| {
                let series = column.as_materialized_series();
                Ok(ColumnSchema {
                    name: series.name().to_string(),
                    kind: detect_kind(series)?,
                })
            })
            .collect::<DataResult<Vec<_>>>()?;
        debug!(columns = columns.len(), "derived dataset schema");
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.kind_of(name).is_some_and(ColumnKind::is_numeric)
    }

    pub fn column_at(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }

    pub fn numeric(&self) -> Vec<&str> {
        self.select(ColumnKind::is_numeric)
    }

    pub fn categorical(&self) -> Vec<&str> {
        self.select(|k| k == ColumnKind::Categorical)
    }

    pub fn temporal(&self) -> Vec<&str> {
        self.select(|k| k == ColumnKind::Temporal)
    }

    pub fn flags(&self) -> Vec<&str> {
        self.select(|k| k == ColumnKind::BinaryFlag)
    }

    fn select(&self, keep: impl Fn(ColumnKind) -> bool) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| keep(c.kind))
            .map(|c| c.name.as_str())
            .collect()
    }
}

fn is_integer_or_float(dtype: &PlDataType) -> bool {
    matches!(
        dtype,
        PlDataType::Float64
            | PlDataType::Float32
            | PlDataType::Int64
            | PlDataType::Int32
            | PlDataType::UInt64
            | PlDataType::UInt32
    )
}

fn detect_kind(series: &Series) -> DataResult<ColumnKind> {
    let dtype = series.dtype();
    if matches!(dtype, PlDataType::Boolean) {
        return Ok(ColumnKind::BinaryFlag);
    }
    if matches!(dtype, PlDataType::Date | PlDataType::Datetime(_, _)) {
        return Ok(ColumnKind::Temporal);
    }
    let non_null = series.len() - series.null_count();
    if non_null == 0 {
        return Ok(ColumnKind::Categorical);
    }
    if is_integer_or_float(dtype) {
        return Ok(if is_binary_flag(series)? {
            ColumnKind::BinaryFlag
        } else {
            ColumnKind::Numeric
        });
    }
    if matches!(dtype, PlDataType::String) {
        let values: Vec<&str> = series.str()?.into_iter().flatten().collect();
        if temporal_confidence(&values) >= TYPE_CONFIDENCE_THRESHOLD {
            return Ok(ColumnKind::Temporal);
        }
        return Ok(ColumnKind::Categorical);
    }
    // Remaining dtypes count as numeric only if they cast cleanly.
    if let Ok(as_float) = series.cast(&PlDataType::Float64) {
        let converted = as_float.len() - as_float.null_count();
        if converted as f64 / non_null as f64 >= TYPE_CONFIDENCE_THRESHOLD {
            return Ok(ColumnKind::Numeric);
        }
    }
    Ok(ColumnKind::Categorical)
}

fn is_binary_flag(series: &Series) -> DataResult<bool> {
    let as_float = series.cast(&PlDataType::Float64)?;
    let mut seen_any = false;
    for value in as_float.f64()?.into_iter().flatten() {
        if value != 0.0 && value != 1.0 {
            return Ok(false);
        }
        seen_any = true;
    }
    Ok(seen_any)
}

pub(crate) fn parse_temporal(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TEMPORAL_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    })
}

fn temporal_confidence(values: &[&str]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let parsed = values.iter().filter(|v| parse_temporal(v).is_some()).count();
    parsed as f64 / values.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null: usize,
    pub null_count: usize,
    pub distinct: usize,
    pub mean: Option<f64>,
}

/// Schema plus the per-column statistics the synthesizer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub schema: DatasetSchema,
    pub row_count: usize,
    pub stats: Vec<ColumnStats>,
}

impl DatasetProfile {
    pub fn from_dataframe(df: &DataFrame) -> DataResult<Self> {
        let schema = DatasetSchema::from_dataframe(df)?;
        let stats = df
            .get_columns()
            .par_iter()
            .zip(schema.columns().par_iter())
            .map(|(column, col_schema)| {
                column_stats(column.as_materialized_series(), col_schema)
            })
            .collect::<DataResult<Vec<_>>>()?;
        Ok(Self {
            schema,
            row_count: df.height(),
            stats,
        })
    }

    /// A profile carrying only a schema, for callers that never touch data.
    pub fn from_schema(schema: DatasetSchema) -> Self {
        Self {
            schema,
            row_count: 0,
            stats: Vec::new(),
        }
    }

    pub fn stats_for(&self, name: &str) -> Option<&ColumnStats> {
        self.stats.iter().find(|s| s.name == name)
    }

    pub fn mean(&self, name: &str) -> Option<f64> {
        self.stats_for(name).and_then(|s| s.mean)
    }

    pub fn summary(&self) -> DatasetSummary {
        let count = |kind: ColumnKind| {
            self.schema
                .columns()
                .iter()
                .filter(|c| c.kind == kind)
                .count()
        };
        DatasetSummary {
            total_columns: self.schema.len(),
            row_count: self.row_count,
            numeric_count: count(ColumnKind::Numeric),
            categorical_count: count(ColumnKind::Categorical),
            temporal_count: count(ColumnKind::Temporal),
            flag_count: count(ColumnKind::BinaryFlag),
            total_nulls: self.stats.iter().map(|s| s.null_count).sum(),
        }
    }
}

fn column_stats(series: &Series, col_schema: &ColumnSchema) -> DataResult<ColumnStats> {
    let null_count = series.null_count();
    let mean = if col_schema.kind.is_numeric() {
        let values: Vec<f64> = series
            .cast(&PlDataType::Float64)?
            .f64()?
            .into_iter()
            .flatten()
            .collect();
        aggregate(&values, Aggregation::Mean)
    } else {
        None
    };
    Ok(ColumnStats {
        name: col_schema.name.clone(),
        kind: col_schema.kind,
        non_null: series.len() - null_count,
        null_count,
        distinct: series.n_unique()?,
        mean,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_columns: usize,
    pub row_count: usize,
    pub numeric_count: usize,
    pub categorical_count: usize,
    pub temporal_count: usize,
    pub flag_count: usize,
    pub total_nulls: usize,
}

impl DatasetSummary {
    pub fn report(&self) -> String {
        let mut report = String::new();
        report.push_str("Dataset Summary\n===============\n");
        report.push_str(&format!("Rows: {}\n", self.row_count));
        report.push_str(&format!("Columns: {}\n", self.total_columns));
        report.push_str(&format!("  - Numeric: {}\n", self.numeric_count));
        report.push_str(&format!("  - Categorical: {}\n", self.categorical_count));
        report.push_str(&format!("  - Temporal: {}\n", self.temporal_count));
        report.push_str(&format!("  - Binary flags: {}\n", self.flag_count));
        report.push_str(&format!("Missing values: {}\n", self.total_nulls));
        report
    }
}

impl std::fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Dataset: {} rows x {} columns ({} numeric, {} categorical, {} temporal, {} flags)",
            self.row_count,
            self.total_columns,
            self.numeric_count,
            self.categorical_count,
            self.temporal_count,
            self.flag_count
        )
    }
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> DataResult<DataFrame> {
    let path = path.as_ref();
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|source| DataError::DataFileError {
            path: path.display().to_string(),
            source,
        })
}
