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

//! Declarative chart descriptions shared by the rule-based and LLM paths.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Kpi,
    #[default]
    Bar,
    Scatter,
    Heatmap,
    Treemap,
    Line,
    Box,
    Histogram,
    Pie,
    Area,
}

impl ChartKind {
    pub const ALL: [ChartKind; 10] = [
        ChartKind::Kpi,
        ChartKind::Bar,
        ChartKind::Scatter,
        ChartKind::Heatmap,
        ChartKind::Treemap,
        ChartKind::Line,
        ChartKind::Box,
        ChartKind::Histogram,
        ChartKind::Pie,
        ChartKind::Area,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Kpi => "kpi",
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Treemap => "treemap",
            ChartKind::Line => "line",
            ChartKind::Box => "box",
            ChartKind::Histogram => "histogram",
            ChartKind::Pie => "pie",
            ChartKind::Area => "area",
        }
    }

    /// Lenient name lookup used for LLM drafts.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        let name = name
            .strip_suffix(" chart")
            .or_else(|| name.strip_suffix("_chart"))
            .unwrap_or(&name);
        match name {
            "kpi" | "indicator" | "card" | "metric" => Some(ChartKind::Kpi),
            "bar" => Some(ChartKind::Bar),
            "scatter" => Some(ChartKind::Scatter),
            "heatmap" | "heat map" | "correlation" => Some(ChartKind::Heatmap),
            "treemap" | "tree map" => Some(ChartKind::Treemap),
            "line" => Some(ChartKind::Line),
            "box" | "box plot" | "boxplot" => Some(ChartKind::Box),
            "histogram" => Some(ChartKind::Histogram),
            "pie" | "donut" => Some(ChartKind::Pie),
            "area" => Some(ChartKind::Area),
            _ => None,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
    Count,
    Median,
}

impl Aggregation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mean" | "average" | "avg" => Some(Aggregation::Mean),
            "sum" | "total" => Some(Aggregation::Sum),
            "count" => Some(Aggregation::Count),
            "median" => Some(Aggregation::Median),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Aggregation::Mean => "Mean",
            Aggregation::Sum => "Sum",
            Aggregation::Count => "Count",
            Aggregation::Median => "Median",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" | "" => Some(SortOrder::None),
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Lt,
    Gt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorCondition {
    pub operator: ComparisonOp,
    pub threshold: f64,
    pub color: String,
}

impl ColorCondition {
    pub fn holds(&self, value: f64) -> bool {
        match self.operator {
            ComparisonOp::Lt => value < self.threshold,
            ComparisonOp::Gt => value > self.threshold,
        }
    }
}

pub const KPI_DEFAULT_COLOR: &str = "green";

/// Display color of a KPI value; the condition is tested against the shown value.
pub fn kpi_color(value: f64, condition: Option<&ColorCondition>) -> &str {
    match condition {
        Some(condition) if condition.holds(value) => &condition.color,
        _ => KPI_DEFAULT_COLOR,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiDisplay {
    #[default]
    Plain,
    /// Mean of a 0/1 flag shown as a percentage.
    Percent,
}

impl KpiDisplay {
    pub fn scale(self, value: f64) -> f64 {
        match self {
            KpiDisplay::Plain => value,
            KpiDisplay::Percent => value * 100.0,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            KpiDisplay::Plain => "",
            KpiDisplay::Percent => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Kpi {
        metric: String,
        value: Option<f64>,
        display: KpiDisplay,
        condition: Option<ColorCondition>,
    },
    Bar {
        x: String,
        y: String,
        aggregation: Aggregation,
        sort: SortOrder,
    },
    Scatter {
        x: String,
        y: String,
        color: Option<String>,
    },
    Heatmap {
        columns: Vec<String>,
    },
    Treemap {
        group: String,
        values: String,
    },
    Line {
        x: String,
        y: String,
        aggregation: Aggregation,
    },
    Area {
        x: String,
        y: String,
        aggregation: Aggregation,
    },
    Box {
        y: String,
        group: Option<String>,
    },
    Histogram {
        x: String,
        bins: u32,
    },
    Pie {
        names: String,
        values: String,
    },
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartSpec::Kpi { .. } => ChartKind::Kpi,
            ChartSpec::Bar { .. } => ChartKind::Bar,
            ChartSpec::Scatter { .. } => ChartKind::Scatter,
            ChartSpec::Heatmap { .. } => ChartKind::Heatmap,
            ChartSpec::Treemap { .. } => ChartKind::Treemap,
            ChartSpec::Line { .. } => ChartKind::Line,
            ChartSpec::Area { .. } => ChartKind::Area,
            ChartSpec::Box { .. } => ChartKind::Box,
            ChartSpec::Histogram { .. } => ChartKind::Histogram,
            ChartSpec::Pie { .. } => ChartKind::Pie,
        }
    }

    pub fn resolved_columns(&self) -> Vec<(ColumnRole, &str)> {
        match self {
            ChartSpec::Kpi { metric, .. } => vec![(ColumnRole::Metric, metric.as_str())],
            ChartSpec::Bar { x, y, .. }
            | ChartSpec::Line { x, y, .. }
            | ChartSpec::Area { x, y, .. } => {
                vec![(ColumnRole::X, x.as_str()), (ColumnRole::Y, y.as_str())]
            }
            ChartSpec::Scatter { x, y, color } => {
                let mut roles = vec![(ColumnRole::X, x.as_str()), (ColumnRole::Y, y.as_str())];
                if let Some(color) = color {
                    roles.push((ColumnRole::Color, color));
                }
                roles
            }
            ChartSpec::Heatmap { columns } => columns
                .iter()
                .map(|c| (ColumnRole::Matrix, c.as_str()))
                .collect(),
            ChartSpec::Treemap { group, values } => {
                vec![(ColumnRole::Group, group.as_str()), (ColumnRole::Values, values.as_str())]
            }
            ChartSpec::Box { y, group } => {
                let mut roles = vec![(ColumnRole::Y, y.as_str())];
                if let Some(group) = group {
                    roles.push((ColumnRole::Group, group));
                }
                roles
            }
            ChartSpec::Histogram { x, .. } => vec![(ColumnRole::X, x.as_str())],
            ChartSpec::Pie { names, values } => {
                vec![(ColumnRole::Group, names.as_str()), (ColumnRole::Values, values.as_str())]
            }
        }
    }

    /// Default human-readable title for this chart.
    pub fn default_title(&self) -> String {
        match self {
            ChartSpec::Kpi { metric, .. } => humanize(metric),
            ChartSpec::Bar {
                x, y, aggregation, ..
            } => format!("{} {} by {}", aggregation.label(), humanize(y), humanize(x)),
            ChartSpec::Scatter { x, y, .. } => format!("{} vs {}", humanize(y), humanize(x)),
            ChartSpec::Heatmap { .. } => "Correlation Heatmap".to_string(),
            ChartSpec::Treemap { group, values } | ChartSpec::Pie { names: group, values } => {
                format!("{} Distribution by {}", humanize(values), humanize(group))
            }
            ChartSpec::Line { x, y, .. } | ChartSpec::Area { x, y, .. } => {
                format!("{} over {}", humanize(y), humanize(x))
            }
            ChartSpec::Box { y, .. } => format!("Box Plot of {}", humanize(y)),
            ChartSpec::Histogram { x, .. } => format!("Distribution of {}", humanize(x)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    X,
    Y,
    Color,
    Values,
    Group,
    Metric,
    Matrix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub title: String,
    pub height: u32,
    pub color_scale: String,
    pub template: String,
}

/// A chart spec plus presentation settings. `renderable == false` marks a
/// degenerate plan the sandbox replaces with its fallback chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPlan {
    pub spec: ChartSpec,
    pub config: ChartConfig,
    pub renderable: bool,
}

impl ChartPlan {
    pub fn resolved_columns(&self) -> Vec<(ColumnRole, &str)> {
        self.spec.resolved_columns()
    }

    pub fn kind(&self) -> ChartKind {
        self.spec.kind()
    }
}

/// `"marital_status"` becomes `"Marital Status"`.
pub fn humanize(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
