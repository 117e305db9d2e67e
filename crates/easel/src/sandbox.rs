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

//! Interprets a [`ChartPlan`] against a dataframe. The interpreter only sees
//! the dataframe and the figure builders; every failure, panics included,
//! comes back as an error placeholder figure.

use crate::chart::{humanize, kpi_color, Aggregation, ChartPlan, ChartSpec, SortOrder};
use crate::config::SandboxConfig;
use crate::error::{RenderError, RenderResult};
use crate::figure::{
    Axis, AxisData, Figure, Font, IndicatorNumber, Layout, Marker, MarkerColor, Title, Trace,
};
use crate::frame::{Deadline, FrameView, Group};
use polars::prelude::DataFrame;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_FALLBACK_ROWS: usize = 100;
const KPI_FONT_SIZE: u32 = 48;
const TITLE_FONT_SIZE: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub max_duration: Duration,
    pub max_rows: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(2),
            max_rows: 5_000_000,
        }
    }
}

impl From<&SandboxConfig> for ExecutionLimits {
    fn from(config: &SandboxConfig) -> Self {
        Self {
            max_duration: config.max_duration(),
            max_rows: config.max_rows,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    limits: ExecutionLimits,
    fallback_rows: usize,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(ExecutionLimits::default())
    }
}

impl Sandbox {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self {
            limits,
            fallback_rows: DEFAULT_FALLBACK_ROWS,
        }
    }

    pub fn with_fallback_rows(mut self, rows: usize) -> Self {
        self.fallback_rows = rows;
        self
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Never fails: execution errors become an error placeholder.
    pub fn execute(&self, plan: &ChartPlan, df: &DataFrame) -> Figure {
        match self.try_execute(plan, df) {
            Ok(figure) => figure,
            Err(err) => {
                warn!(chart = %plan.kind(), error = %err, "chart execution failed");
                Figure::error_placeholder_with_hint(&err.to_string(), err.hint())
            }
        }
    }

    pub fn try_execute(&self, plan: &ChartPlan, df: &DataFrame) -> RenderResult<Figure> {
        if df.height() > self.limits.max_rows {
            return Err(RenderError::RowLimitExceeded {
                rows: df.height(),
                limit: self.limits.max_rows,
            });
        }
        let view = FrameView::new(df, Deadline::start(self.limits.max_duration));
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            if plan.renderable {
                render(&view, plan)
            } else {
                debug!("plan has no renderable output, using fallback scatter");
                fallback_scatter(&view, plan, self.fallback_rows)
            }
        }));
        let figure = outcome.map_err(|payload| RenderError::Panicked(panic_message(&*payload)))??;
        view.deadline().check()?;
        Ok(figure)
    }
}

/// Execution with default limits.
pub fn execute(plan: &ChartPlan, df: &DataFrame) -> Figure {
    Sandbox::default().execute(plan, df)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn base_layout(plan: &ChartPlan) -> Layout {
    let mut layout = Layout::themed(&plan.config.template, plan.config.height);
    layout.title = Some(Title::new(plan.config.title.clone()));
    layout
}

fn scale_marker(values: &[Option<f64>], plan: &ChartPlan) -> Option<Marker> {
    Some(Marker {
        color: Some(MarkerColor::Scale(values.to_vec())),
        colorscale: Some(plan.config.color_scale.clone()),
        ..Default::default()
    })
}

fn split(groups: Vec<Group>) -> (Vec<String>, Vec<Option<f64>>) {
    groups.into_iter().map(|g| (g.label, g.value)).unzip()
}

fn non_empty(groups: Vec<Group>, column: &str) -> RenderResult<Vec<Group>> {
    if groups.is_empty() {
        return Err(RenderError::NoUsableValues {
            column: column.to_string(),
        });
    }
    Ok(groups)
}

fn render(view: &FrameView<'_>, plan: &ChartPlan) -> RenderResult<Figure> {
    let mut layout = base_layout(plan);
    let trace = match &plan.spec {
        ChartSpec::Kpi {
            metric,
            value,
            display,
            condition,
        } => {
            if !view.is_numeric(metric)? {
                return Err(RenderError::NonNumericColumn {
                    column: metric.clone(),
                    found: "non-numeric".to_string(),
                });
            }
            let mean = match value {
                Some(value) => *value,
                None => view.mean(metric)?,
            };
            let shown = display.scale(mean);
            layout.title = None;
            Trace::Indicator {
                mode: "number".to_string(),
                value: shown,
                title: Title {
                    text: humanize(metric),
                    font: Some(Font {
                        size: Some(TITLE_FONT_SIZE),
                        color: None,
                    }),
                },
                number: IndicatorNumber {
                    suffix: display.suffix().to_string(),
                    font: Font {
                        size: Some(KPI_FONT_SIZE),
                        color: Some(kpi_color(shown, condition.as_ref()).to_string()),
                    },
                },
            }
        }
        ChartSpec::Bar {
            x,
            y,
            aggregation,
            sort,
        } => {
            let groups = non_empty(view.group_aggregate(x, y, *aggregation, *sort)?, x)?;
            let (labels, values) = split(groups);
            layout.xaxis = Some(Axis {
                tickangle: Some(-45),
                ..Axis::titled(humanize(x))
            });
            layout.yaxis = Some(Axis::titled(format!(
                "{} {}",
                aggregation.label(),
                humanize(y)
            )));
            layout.showlegend = Some(false);
            Trace::Bar {
                marker: scale_marker(&values, plan),
                x: AxisData::Labels(labels),
                y: values,
            }
        }
        ChartSpec::Scatter { x, y, color } => {
            let color = match color {
                Some(column) if view.is_numeric(column)? => {
                    Some(MarkerColor::Scale(view.numbers(column)?))
                }
                Some(column) => Some(MarkerColor::Categories(
                    view.labels(column)?
                        .into_iter()
                        .map(Option::unwrap_or_default)
                        .collect(),
                )),
                None => None,
            };
            layout.xaxis = Some(Axis::titled(humanize(x)));
            layout.yaxis = Some(Axis::titled(humanize(y)));
            Trace::Scatter {
                x: axis_data(view, x, None)?,
                y: axis_data(view, y, None)?,
                mode: "markers".to_string(),
                fill: None,
                marker: Some(Marker {
                    color,
                    colorscale: Some(plan.config.color_scale.clone()),
                    size: Some(8),
                    opacity: Some(0.7),
                }),
            }
        }
        ChartSpec::Heatmap { columns } => {
            if columns.is_empty() {
                return Err(RenderError::InsufficientColumns {
                    required: 1,
                    available: 0,
                });
            }
            let z = view.correlation_matrix(columns)?;
            layout.xaxis = Some(Axis {
                tickangle: Some(-45),
                ..Default::default()
            });
            Trace::Heatmap {
                z,
                x: columns.clone(),
                y: columns.clone(),
                colorscale: plan.config.color_scale.clone(),
                zmin: -1.0,
                zmax: 1.0,
            }
        }
        ChartSpec::Treemap { group, values } => {
            let groups = non_empty(
                view.group_aggregate(group, values, Aggregation::Sum, SortOrder::None)?,
                group,
            )?;
            let (labels, sums) = split(groups);
            Trace::Treemap {
                marker: scale_marker(&sums, plan),
                parents: vec![String::new(); labels.len()],
                values: sums.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
                labels,
            }
        }
        ChartSpec::Line { x, y, aggregation } | ChartSpec::Area { x, y, aggregation } => {
            let groups = non_empty(
                view.group_aggregate(x, y, *aggregation, SortOrder::None)?,
                x,
            )?;
            let (labels, values) = split(groups);
            let area = matches!(plan.spec, ChartSpec::Area { .. });
            layout.xaxis = Some(Axis::titled(humanize(x)));
            layout.yaxis = Some(Axis::titled(humanize(y)));
            Trace::Scatter {
                x: AxisData::Labels(labels),
                y: AxisData::Numbers(values),
                mode: if area { "lines" } else { "lines+markers" }.to_string(),
                fill: area.then(|| "tozeroy".to_string()),
                marker: None,
            }
        }
        ChartSpec::Box { y, group } => {
            let values = view.numbers(y)?;
            let labels = match group {
                Some(group) => Some(view.labels(group)?),
                None => None,
            };
            let mut ys = Vec::new();
            let mut xs = Vec::new();
            for (row, value) in values.into_iter().enumerate() {
                let Some(value) = value else { continue };
                if let Some(labels) = &labels {
                    let Some(Some(label)) = labels.get(row) else {
                        continue;
                    };
                    xs.push(label.clone());
                }
                ys.push(value);
            }
            if ys.is_empty() {
                return Err(RenderError::NoUsableValues { column: y.clone() });
            }
            layout.yaxis = Some(Axis::titled(humanize(y)));
            if let Some(group) = group {
                layout.xaxis = Some(Axis::titled(humanize(group)));
            }
            Trace::Box {
                y: ys,
                x: labels.map(|_| xs),
            }
        }
        ChartSpec::Histogram { x, bins } => {
            layout.xaxis = Some(Axis::titled(humanize(x)));
            layout.yaxis = Some(Axis::titled("Count"));
            Trace::Histogram {
                x: view.present_numbers(x)?,
                nbinsx: *bins,
            }
        }
        ChartSpec::Pie { names, values } => {
            let groups = non_empty(
                view.group_aggregate(names, values, Aggregation::Sum, SortOrder::None)?,
                names,
            )?;
            let (labels, sums) = split(groups);
            Trace::Pie {
                labels,
                values: sums.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
            }
        }
    };
    debug!(chart = %plan.kind(), "rendered chart");
    Ok(Figure::new(vec![trace], layout))
}

/// Numeric columns stay numeric; anything else becomes text labels.
fn axis_data(view: &FrameView<'_>, column: &str, rows: Option<usize>) -> RenderResult<AxisData> {
    let limit = rows.unwrap_or(usize::MAX);
    if view.is_numeric(column)? {
        let values = view.numbers(column)?.into_iter().take(limit).collect();
        return Ok(AxisData::Numbers(values));
    }
    Ok(AxisData::Labels(
        view.labels(column)?
            .into_iter()
            .take(limit)
            .map(Option::unwrap_or_default)
            .collect(),
    ))
}

/// First two columns, first rows only, as a scatter.
fn fallback_scatter(view: &FrameView<'_>, plan: &ChartPlan, rows: usize) -> RenderResult<Figure> {
    let names = view.column_names();
    if names.len() < 2 {
        return Err(RenderError::InsufficientColumns {
            required: 2,
            available: names.len(),
        });
    }
    let (x, y) = (&names[0], &names[1]);
    let mut layout = Layout::themed(&plan.config.template, plan.config.height);
    layout.title = Some(Title::new(format!("{} vs {}", humanize(y), humanize(x))));
    layout.xaxis = Some(Axis::titled(humanize(x)));
    layout.yaxis = Some(Axis::titled(humanize(y)));
    let trace = Trace::Scatter {
        x: axis_data(view, x, Some(rows))?,
        y: axis_data(view, y, Some(rows))?,
        mode: "markers".to_string(),
        fill: None,
        marker: None,
    };
    Ok(Figure::new(vec![trace], layout))
}
