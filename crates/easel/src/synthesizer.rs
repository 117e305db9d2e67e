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

//! Deterministic column resolution from an [`Intent`] to a [`ChartPlan`].
//!
//! Every column placed in a plan comes from the dataset schema, so plans built
//! here skip the validator.

use crate::chart::{
    Aggregation, ChartConfig, ChartKind, ChartPlan, ChartSpec, KpiDisplay, SortOrder,
};
use crate::config::ChartsConfig;
use crate::intent::Intent;
use crate::schema::{ColumnKind, DatasetProfile, DatasetSchema};
use tracing::{debug, warn};

const KPI_HEIGHT: u32 = 300;

#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: ChartsConfig,
}

impl Synthesizer {
    pub fn new(config: ChartsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChartsConfig {
        &self.config
    }

    pub fn synthesize(&self, intent: &Intent, profile: &DatasetProfile) -> ChartPlan {
        let schema = &profile.schema;
        if schema.is_empty() {
            warn!("empty schema, emitting non-renderable plan");
            return self.degenerate(schema);
        }

        let picker = Picker::new(schema, &intent.candidate_columns);
        let spec = match intent.chart_kind {
            ChartKind::Kpi => self.kpi(&picker, intent, profile),
            ChartKind::Bar => {
                let (x, y) = picker.category_and_value();
                ChartSpec::Bar {
                    x,
                    y,
                    aggregation: intent.aggregation,
                    sort: intent.sort,
                }
            }
            ChartKind::Scatter => picker.scatter(),
            ChartKind::Heatmap => ChartSpec::Heatmap {
                columns: picker.heatmap_columns(self.config.heatmap_max_columns),
            },
            ChartKind::Treemap => {
                let (group, values) = picker.category_and_value();
                ChartSpec::Treemap { group, values }
            }
            ChartKind::Line => {
                let (x, y) = picker.ordered_axis_and_value();
                ChartSpec::Line {
                    x,
                    y,
                    aggregation: intent.aggregation,
                }
            }
            ChartKind::Area => {
                let (x, y) = picker.ordered_axis_and_value();
                ChartSpec::Area {
                    x,
                    y,
                    aggregation: intent.aggregation,
                }
            }
            ChartKind::Box => ChartSpec::Box {
                y: picker.value(None),
                group: picker.candidate(|k| !k.is_numeric(), &[]),
            },
            ChartKind::Histogram => ChartSpec::Histogram {
                x: picker.value(None),
                bins: self.config.histogram_bins,
            },
            ChartKind::Pie => {
                let (names, values) = picker.category_and_value();
                ChartSpec::Pie { names, values }
            }
        };

        let renderable = is_renderable(&spec, schema);
        let plan = self.plan(spec, renderable);
        debug!(
            chart = %plan.kind(),
            columns = ?plan.resolved_columns(),
            renderable,
            "synthesized chart plan"
        );
        plan
    }

    fn kpi(&self, picker: &Picker<'_>, intent: &Intent, profile: &DatasetProfile) -> ChartSpec {
        let schema = picker.schema;
        let metric = picker
            .candidate(ColumnKind::is_numeric, &[])
            .or_else(|| {
                schema
                    .contains(&self.config.kpi_default_metric)
                    .then(|| self.config.kpi_default_metric.clone())
            })
            .or_else(|| schema.numeric().first().map(|s| s.to_string()))
            .unwrap_or_else(|| picker.first_candidate_or_column());
        let display = if schema.kind_of(&metric) == Some(ColumnKind::BinaryFlag) {
            KpiDisplay::Percent
        } else {
            KpiDisplay::Plain
        };
        ChartSpec::Kpi {
            value: profile.mean(&metric),
            metric,
            display,
            condition: intent.color_condition.clone(),
        }
    }

    /// Wraps a spec with presentation settings.
    pub fn plan(&self, spec: ChartSpec, renderable: bool) -> ChartPlan {
        let height = match spec.kind() {
            ChartKind::Kpi => KPI_HEIGHT,
            _ => self.config.height,
        };
        let color_scale = match spec.kind() {
            ChartKind::Heatmap => self.config.diverging_scale.clone(),
            _ => self.config.color_scale.clone(),
        };
        ChartPlan {
            config: ChartConfig {
                title: spec.default_title(),
                height,
                color_scale,
                template: self.config.template.clone(),
            },
            spec,
            renderable,
        }
    }

    fn degenerate(&self, schema: &DatasetSchema) -> ChartPlan {
        let name = schema.column_at(0).unwrap_or_default().to_string();
        self.plan(
            ChartSpec::Bar {
                x: name.clone(),
                y: name,
                aggregation: Aggregation::Mean,
                sort: SortOrder::None,
            },
            false,
        )
    }
}

/// Rule-based synthesis with default chart settings.
pub fn synthesize(intent: &Intent, profile: &DatasetProfile) -> ChartPlan {
    Synthesizer::default().synthesize(intent, profile)
}

/// Single-column charts render from one numeric column; everything else needs two.
fn is_renderable(spec: &ChartSpec, schema: &DatasetSchema) -> bool {
    match spec {
        ChartSpec::Kpi { metric, .. }
        | ChartSpec::Histogram { x: metric, .. }
        | ChartSpec::Box {
            y: metric,
            group: None,
        } => schema.is_numeric(metric),
        _ => schema.len() >= 2,
    }
}

/// Column choices over one schema and one request's candidates.
struct Picker<'a> {
    schema: &'a DatasetSchema,
    candidates: Vec<&'a str>,
}

impl<'a> Picker<'a> {
    fn new(schema: &'a DatasetSchema, candidates: &'a [String]) -> Self {
        Self {
            schema,
            candidates: candidates
                .iter()
                .map(String::as_str)
                .filter(|c| schema.contains(c))
                .collect(),
        }
    }

    fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.schema.kind_of(name)
    }

    fn candidate(&self, keep: impl Fn(ColumnKind) -> bool, exclude: &[&str]) -> Option<String> {
        self.candidates
            .iter()
            .find(|c| !exclude.contains(c) && self.kind(c).is_some_and(&keep))
            .map(|c| c.to_string())
    }

    fn column(&self, keep: impl Fn(ColumnKind) -> bool, exclude: &[&str]) -> Option<String> {
        self.schema
            .columns()
            .iter()
            .find(|c| !exclude.contains(&c.name.as_str()) && keep(c.kind))
            .map(|c| c.name.clone())
    }

    fn first_candidate_or_column(&self) -> String {
        self.candidates
            .first()
            .copied()
            .or_else(|| self.schema.column_at(0))
            .unwrap_or_default()
            .to_string()
    }

    fn default_category(&self) -> String {
        self.column(|k| k == ColumnKind::Categorical, &[])
            .or_else(|| self.column(|k| !k.is_numeric(), &[]))
            .unwrap_or_else(|| self.first_candidate_or_column())
    }

    /// A numeric column other than `exclude` when one exists.
    fn value(&self, exclude: Option<&str>) -> String {
        let exclude: Vec<&str> = exclude.into_iter().collect();
        self.candidate(ColumnKind::is_numeric, &exclude)
            .or_else(|| self.column(ColumnKind::is_numeric, &exclude))
            .or_else(|| self.column(ColumnKind::is_numeric, &[]))
            .or_else(|| self.column(|_| true, &exclude))
            .unwrap_or_else(|| self.first_candidate_or_column())
    }

    /// `(category, value)` for bar, treemap and pie.
    fn category_and_value(&self) -> (String, String) {
        if self.candidates.len() >= 2 {
            let (mut x, mut y) = (self.candidates[0], self.candidates[1]);
            if self.schema.is_numeric(x) && !self.schema.is_numeric(y) {
                std::mem::swap(&mut x, &mut y);
            }
            if !self.schema.is_numeric(y) {
                return (x.to_string(), self.value(Some(x)));
            }
            return (x.to_string(), y.to_string());
        }
        let x = self.default_category();
        let y = self.value(Some(&x));
        (x, y)
    }

    fn scatter(&self) -> ChartSpec {
        let numeric: Vec<&str> = self
            .candidates
            .iter()
            .copied()
            .filter(|c| self.schema.is_numeric(c))
            .collect();
        let (x, y) = if numeric.len() >= 2 {
            (numeric[0].to_string(), numeric[1].to_string())
        } else {
            let schema_numeric = self.schema.numeric();
            if schema_numeric.len() >= 2 {
                (schema_numeric[0].to_string(), schema_numeric[1].to_string())
            } else {
                let first = self.schema.column_at(0).unwrap_or_default().to_string();
                let second = self.schema.column_at(1).unwrap_or_default().to_string();
                (first, second)
            }
        };
        let color = self
            .candidates
            .get(2)
            .filter(|c| **c != x && **c != y)
            .map(|c| c.to_string());
        ChartSpec::Scatter { x, y, color }
    }

    fn heatmap_columns(&self, limit: usize) -> Vec<String> {
        let requested: Vec<String> = self
            .candidates
            .iter()
            .filter(|c| self.schema.is_numeric(c))
            .map(|c| c.to_string())
            .collect();
        if requested.len() >= 2 {
            return requested;
        }
        let numeric = self.schema.numeric();
        let pool: Vec<&str> = if numeric.is_empty() {
            self.schema.names().collect()
        } else {
            numeric
        };
        pool.into_iter().take(limit).map(str::to_string).collect()
    }

    /// `(x, y)` for line and area: x prefers a temporal column.
    fn ordered_axis_and_value(&self) -> (String, String) {
        let x = self
            .candidate(|k| k == ColumnKind::Temporal, &[])
            .or_else(|| self.column(|k| k == ColumnKind::Temporal, &[]))
            .or_else(|| self.candidate(|k| !k.is_numeric(), &[]))
            .or_else(|| self.candidates.first().map(|c| c.to_string()))
            .unwrap_or_else(|| self.default_category());
        let y = self.value(Some(&x));
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent;

    fn profile() -> DatasetProfile {
        DatasetProfile::from_schema(DatasetSchema::new([
            ("education", ColumnKind::Categorical),
            ("Income", ColumnKind::Numeric),
            ("MntWines", ColumnKind::Numeric),
            ("Response", ColumnKind::BinaryFlag),
            ("Dt_Customer", ColumnKind::Temporal),
        ]))
    }

    fn plan_for(request: &str) -> ChartPlan {
        let profile = profile();
        synthesize(&intent::parse(request, &profile.schema), &profile)
    }

    #[test]
    fn bar_swaps_numeric_category_candidates() {
        let profile = DatasetProfile::from_schema(DatasetSchema::new([
            ("Income", ColumnKind::Numeric),
            ("education", ColumnKind::Categorical),
        ]));
        let plan = synthesize(
            &intent::parse("compare Income across education", &profile.schema),
            &profile,
        );
        match plan.spec {
            ChartSpec::Bar { x, y, .. } => {
                assert_eq!(x, "education");
                assert_eq!(y, "Income");
            }
            other => panic!("expected bar, got {other:?}"),
        }
    }

    #[test]
    fn two_categorical_candidates_take_a_numeric_value() {
        let profile = DatasetProfile::from_schema(DatasetSchema::new([
            ("education", ColumnKind::Categorical),
            ("Marital_Status", ColumnKind::Categorical),
            ("Income", ColumnKind::Numeric),
        ]));
        let plan = synthesize(
            &intent::parse("Compare education and Marital_Status", &profile.schema),
            &profile,
        );
        match plan.spec {
            ChartSpec::Bar { x, y, .. } => {
                assert_eq!(x, "education");
                assert_eq!(y, "Income");
            }
            other => panic!("expected bar, got {other:?}"),
        }

        let plan = synthesize(
            &intent::parse("treemap of education and Marital_Status", &profile.schema),
            &profile,
        );
        match plan.spec {
            ChartSpec::Treemap { group, values } => {
                assert_eq!(group, "education");
                assert_eq!(values, "Income");
            }
            other => panic!("expected treemap, got {other:?}"),
        }
    }

    #[test]
    fn bar_without_candidates_uses_schema_defaults() {
        let plan = plan_for("show me something");
        assert_eq!(
            plan.resolved_columns(),
            vec![
                (crate::chart::ColumnRole::X, "education"),
                (crate::chart::ColumnRole::Y, "Income")
            ]
        );
        assert!(plan.renderable);
    }

    #[test]
    fn kpi_defaults_to_response_flag_as_percent() {
        let plan = plan_for("Show me a KPI");
        match plan.spec {
            ChartSpec::Kpi {
                metric, display, ..
            } => {
                assert_eq!(metric, "Response");
                assert_eq!(display, KpiDisplay::Percent);
            }
            other => panic!("expected kpi, got {other:?}"),
        }
        assert_eq!(plan.config.height, KPI_HEIGHT);
    }

    #[test]
    fn heatmap_falls_back_to_first_four_numeric_columns() {
        let plan = plan_for("correlation heatmap of education");
        match plan.spec {
            ChartSpec::Heatmap { columns } => {
                assert_eq!(columns, vec!["Income", "MntWines", "Response"]);
            }
            other => panic!("expected heatmap, got {other:?}"),
        }
    }

    #[test]
    fn line_prefers_temporal_axis() {
        let plan = plan_for("Income trend over time");
        match plan.spec {
            ChartSpec::Line { x, y, .. } => {
                assert_eq!(x, "Dt_Customer");
                assert_eq!(y, "Income");
            }
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn empty_schema_is_not_renderable() {
        let profile = DatasetProfile::from_schema(DatasetSchema::default());
        let plan = synthesize(&Intent::default(), &profile);
        assert!(!plan.renderable);
    }
}
