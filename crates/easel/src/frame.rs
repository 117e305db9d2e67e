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

//! Read-only column access and group-by arithmetic over a dataframe, with a
//! wall-clock budget checked inside every row loop.

use crate::chart::{Aggregation, SortOrder};
use crate::error::{RenderError, RenderResult};
use crate::schema::parse_temporal;
use chrono::NaiveDateTime;
use polars::prelude::{
    ChunkAgg, ChunkQuantile, DataFrame, DataType as PlDataType, Float64Chunked, NewChunkedArray,
    PlSmallStr, Series,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const DEADLINE_STRIDE: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn check(&self) -> RenderResult<()> {
        if self.started.elapsed() > self.budget {
            return Err(RenderError::DeadlineExceeded(self.budget));
        }
        Ok(())
    }

    /// Checks the clock every `DEADLINE_STRIDE` rows.
    fn tick(&self, row: usize) -> RenderResult<()> {
        if row % DEADLINE_STRIDE == 0 {
            self.check()?;
        }
        Ok(())
    }
}

/// One aggregated group: display label and value (absent when undefined).
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub label: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum GroupKey {
    Number(f64),
    Time(NaiveDateTime),
    Text(String),
}

impl GroupKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Time(a), GroupKey::Time(b)) => a.cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            (GroupKey::Number(_), _) => Ordering::Less,
            (_, GroupKey::Number(_)) => Ordering::Greater,
            (GroupKey::Time(_), _) => Ordering::Less,
            (_, GroupKey::Time(_)) => Ordering::Greater,
        }
    }
}

pub struct FrameView<'a> {
    df: &'a DataFrame,
    deadline: Deadline,
}

impl<'a> FrameView<'a> {
    pub fn new(df: &'a DataFrame, deadline: Deadline) -> Self {
        Self { df, deadline }
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    fn series(&self, name: &str) -> RenderResult<&'a Series> {
        self.df
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| RenderError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn is_numeric(&self, name: &str) -> RenderResult<bool> {
        Ok(numeric_dtype(self.series(name)?))
    }

    /// Column as floats; fails for text and date columns.
    pub fn numbers(&self, name: &str) -> RenderResult<Vec<Option<f64>>> {
        let series = self.series(name)?;
        if !numeric_dtype(series) {
            return Err(RenderError::NonNumericColumn {
                column: name.to_string(),
                found: series.dtype().to_string(),
            });
        }
        let cast = series.cast(&PlDataType::Float64)?;
        let mut out = Vec::with_capacity(cast.len());
        for (row, value) in cast.f64()?.into_iter().enumerate() {
            self.deadline.tick(row)?;
            out.push(value.filter(|v| v.is_finite()));
        }
        Ok(out)
    }

    /// Non-null floats only.
    pub fn present_numbers(&self, name: &str) -> RenderResult<Vec<f64>> {
        let values: Vec<f64> = self.numbers(name)?.into_iter().flatten().collect();
        if values.is_empty() {
            return Err(RenderError::NoUsableValues {
                column: name.to_string(),
            });
        }
        Ok(values)
    }

    pub fn labels(&self, name: &str) -> RenderResult<Vec<Option<String>>> {
        let series = self.series(name)?;
        if numeric_dtype(series) && !matches!(series.dtype(), PlDataType::Boolean) {
            return Ok(self
                .numbers(name)?
                .into_iter()
                .map(|v| v.map(format_number))
                .collect());
        }
        let cast = series.cast(&PlDataType::String)?;
        let mut out = Vec::with_capacity(cast.len());
        for (row, value) in cast.str()?.into_iter().enumerate() {
            self.deadline.tick(row)?;
            out.push(value.map(str::to_string));
        }
        Ok(out)
    }

    pub fn mean(&self, name: &str) -> RenderResult<f64> {
        aggregate(&self.present_numbers(name)?, Aggregation::Mean).ok_or_else(|| {
            RenderError::NoUsableValues {
                column: name.to_string(),
            }
        })
    }

    fn keys(&self, name: &str) -> RenderResult<Vec<Option<GroupKey>>> {
        let series = self.series(name)?;
        if numeric_dtype(series) && !matches!(series.dtype(), PlDataType::Boolean) {
            return Ok(self
                .numbers(name)?
                .into_iter()
                .map(|v| v.map(GroupKey::Number))
                .collect());
        }
        let labels = self.labels(name)?;
        let temporal = labels
            .iter()
            .flatten()
            .all(|label| parse_temporal(label).is_some());
        Ok(labels
            .into_iter()
            .map(|label| {
                label.map(|text| match parse_temporal(&text).filter(|_| temporal) {
                    Some(time) => GroupKey::Time(time),
                    None => GroupKey::Text(text),
                })
            })
            .collect())
    }

    /// Group `value` by `key`. Null keys are dropped. Groups come back in key
    /// order unless `sort` asks for value order.
    pub fn group_aggregate(
        &self,
        key: &str,
        value: &str,
        aggregation: Aggregation,
        sort: SortOrder,
    ) -> RenderResult<Vec<Group>> {
        let keys = self.keys(key)?;
        let values = self.numbers(value)?;

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<(GroupKey, String, Vec<f64>)> = Vec::new();
        for (row, (k, v)) in keys.into_iter().zip(values).enumerate() {
            self.deadline.tick(row)?;
            let Some(k) = k else { continue };
            let label = key_label(&k);
            let slot = match index.get(&label) {
                Some(slot) => *slot,
                None => {
                    index.insert(label.clone(), buckets.len());
                    buckets.push((k, label, Vec::new()));
                    buckets.len() - 1
                }
            };
            if let Some(v) = v {
                buckets[slot].2.push(v);
            }
        }

        buckets.sort_by(|a, b| a.0.compare(&b.0));
        let mut groups: Vec<Group> = buckets
            .into_iter()
            .map(|(_, label, values)| Group {
                value: aggregate(&values, aggregation),
                label,
            })
            .collect();

        match sort {
            SortOrder::None => {}
            SortOrder::Ascending => groups.sort_by(|a, b| compare_values(a.value, b.value)),
            SortOrder::Descending => groups.sort_by(|a, b| compare_values(b.value, a.value)),
        }
        Ok(groups)
    }

    /// Pairwise-complete Pearson correlation; undefined cells are `None`.
    pub fn correlation_matrix(&self, columns: &[String]) -> RenderResult<Vec<Vec<Option<f64>>>> {
        let data: Vec<Option<Vec<Option<f64>>>> = columns
            .iter()
            .map(|c| match self.numbers(c) {
                Ok(values) => Ok(Some(values)),
                Err(RenderError::NonNumericColumn { .. }) => Ok(None),
                Err(other) => Err(other),
            })
            .collect::<RenderResult<_>>()?;

        let mut matrix = vec![vec![None; columns.len()]; columns.len()];
        for i in 0..columns.len() {
            for j in i..columns.len() {
                self.deadline.check()?;
                let cell = match (&data[i], &data[j]) {
                    (Some(a), Some(b)) => pearson(a, b),
                    _ => None,
                };
                matrix[i][j] = cell;
                matrix[j][i] = cell;
            }
        }
        Ok(matrix)
    }
}

fn numeric_dtype(series: &Series) -> bool {
    match series.dtype() {
        PlDataType::String | PlDataType::Date | PlDataType::Datetime(_, _) => false,
        PlDataType::Boolean
        | PlDataType::Float64
        | PlDataType::Float32
        | PlDataType::Int64
        | PlDataType::Int32
        | PlDataType::UInt64
        | PlDataType::UInt32 => true,
        _ => series
            .cast(&PlDataType::Float64)
            .is_ok_and(|cast| cast.null_count() == series.null_count()),
    }
}

fn key_label(key: &GroupKey) -> String {
    match key {
        GroupKey::Number(n) => format_number(*n),
        GroupKey::Time(t) => t.format("%Y-%m-%d %H:%M:%S").to_string().replace(" 00:00:00", ""),
        GroupKey::Text(s) => s.clone(),
    }
}

/// Integral floats print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn compare_values(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Aggregates the finite values only; non-finite inputs are skipped.
pub fn aggregate(values: &[f64], aggregation: Aggregation) -> Option<f64> {
    let finite = Float64Chunked::from_iter_values(
        PlSmallStr::EMPTY,
        values.iter().copied().filter(|v| v.is_finite()),
    );
    match aggregation {
        Aggregation::Count => Some(finite.len() as f64),
        Aggregation::Sum => Some(finite.sum().unwrap_or(0.0)),
        Aggregation::Mean => finite.mean(),
        Aggregation::Median => finite.median(),
    }
}

pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
