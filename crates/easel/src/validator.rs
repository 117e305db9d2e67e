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

//! Static checks and column repair for chart drafts produced by a model.
//!
//! Nothing here touches the dataframe; only the schema is consulted.

use crate::chart::{Aggregation, ChartKind, ChartPlan, SortOrder};
use crate::extractor::find_json_object;
use crate::fuzzy::{self, DEFAULT_CUTOFF};
use crate::intent::Intent;
use crate::schema::{DatasetProfile, DatasetSchema};
use crate::synthesizer::Synthesizer;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Role values that are expressions rather than column names.
const DENYLIST: &[&str] = &["df[", "px.", "go.", "lambda", "("];

/// The JSON object a model is asked to return.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmDraft {
    pub chart: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl LlmDraft {
    pub fn parse(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();
        serde_json::from_str(candidate)
            .ok()
            .or_else(|| find_json_object(candidate).and_then(|o| serde_json::from_str(o).ok()))
    }

    pub fn chart_kind(&self) -> ChartKind {
        ChartKind::from_name(&self.chart).unwrap_or_default()
    }

    fn column_refs_mut(&mut self) -> impl Iterator<Item = &mut String> {
        [&mut self.x, &mut self.y, &mut self.color, &mut self.values]
            .into_iter()
            .flatten()
            .chain(self.columns.iter_mut())
    }

    fn role_values(&self) -> impl Iterator<Item = &str> {
        [&self.x, &self.y, &self.color, &self.values, &self.group_by]
            .into_iter()
            .flatten()
            .chain(self.columns.iter())
            .map(String::as_str)
    }

    /// Blank role values count as absent; names lose surrounding whitespace.
    fn normalise(&mut self) {
        for slot in [
            &mut self.x,
            &mut self.y,
            &mut self.color,
            &mut self.values,
            &mut self.group_by,
            &mut self.aggregation,
            &mut self.sort,
            &mut self.title,
        ] {
            *slot = slot
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
        self.columns = std::mem::take(&mut self.columns)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        self.chart = self.chart_kind().as_str().to_string();
        self.aggregation = self
            .aggregation
            .take()
            .and_then(|a| Aggregation::from_name(&a))
            .map(|a| a.label().to_lowercase());
        self.sort = self
            .sort
            .take()
            .and_then(|s| SortOrder::from_name(&s))
            .and_then(|s| match s {
                SortOrder::None => None,
                SortOrder::Ascending => Some("ascending".to_string()),
                SortOrder::Descending => Some("descending".to_string()),
            });
    }
}

#[derive(Debug, Clone)]
pub struct Validator {
    cutoff: f64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF)
    }
}

impl Validator {
    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }

    /// Canonical JSON for a repaired draft, or `None` when no safe draft exists.
    pub fn validate_and_repair(&self, candidate: &str, schema: &DatasetSchema) -> Option<String> {
        let draft = self.validate_draft(candidate, schema)?;
        serde_json::to_string(&draft).ok()
    }

    pub fn validate_draft(&self, candidate: &str, schema: &DatasetSchema) -> Option<LlmDraft> {
        let Some(draft) = LlmDraft::parse(candidate) else {
            warn!("draft is not a parseable chart object");
            return None;
        };
        self.repair(draft, schema)
    }

    pub fn repair(&self, mut draft: LlmDraft, schema: &DatasetSchema) -> Option<LlmDraft> {
        draft.normalise();

        if let Some(bad) = draft.role_values().find(|v| self.is_expression(v, schema)) {
            warn!(value = bad, "draft role holds an expression, rejecting");
            return None;
        }

        let references: Vec<String> = draft.column_refs_mut().map(|r| r.clone()).collect();
        for reference in references {
            let repaired = self.resolve(&reference, schema)?;
            if repaired != reference {
                for slot in draft.column_refs_mut().filter(|r| **r == reference) {
                    *slot = repaired.clone();
                }
            }
        }

        if let Some(group_by) = draft.group_by.take() {
            draft.group_by = Some(self.resolve(&group_by, schema)?);
        }

        debug!(chart = %draft.chart, "validated chart draft");
        Some(draft)
    }

    /// A denylisted token counts only when the matched column name lacks it,
    /// so `income (usd)` still repairs to `Income (USD)`.
    fn is_expression(&self, value: &str, schema: &DatasetSchema) -> bool {
        let lowered = value.to_lowercase();
        let matched =
            fuzzy::closest_match(value, schema.names(), self.cutoff).map(str::to_lowercase);
        DENYLIST.iter().any(|token| {
            lowered.contains(token) && !matched.as_ref().is_some_and(|m| m.contains(token))
        })
    }

    fn resolve(&self, reference: &str, schema: &DatasetSchema) -> Option<String> {
        match fuzzy::closest_match(reference, schema.names(), self.cutoff) {
            Some(name) => {
                if name != reference {
                    debug!(from = reference, to = name, "repaired column reference");
                }
                Some(name.to_string())
            }
            None => {
                warn!(column = reference, "no column close enough, rejecting draft");
                None
            }
        }
    }
}

/// Validation with the default similarity cutoff.
pub fn validate_and_repair(candidate: &str, schema: &DatasetSchema) -> Option<String> {
    Validator::default().validate_and_repair(candidate, schema)
}

/// Turns a validated draft into a plan; absent roles get the rule-based defaults.
pub fn draft_to_plan(
    draft: &LlmDraft,
    profile: &DatasetProfile,
    synthesizer: &Synthesizer,
) -> ChartPlan {
    let kind = draft.chart_kind();
    let first = |a: &Option<String>, b: &Option<String>| a.clone().or_else(|| b.clone());
    let ordered = match kind {
        ChartKind::Bar | ChartKind::Line | ChartKind::Area => vec![
            first(&draft.x, &draft.group_by),
            first(&draft.y, &draft.values),
        ],
        ChartKind::Scatter => vec![draft.x.clone(), draft.y.clone(), draft.color.clone()],
        ChartKind::Heatmap if !draft.columns.is_empty() => {
            draft.columns.iter().cloned().map(Some).collect()
        }
        ChartKind::Heatmap => vec![draft.x.clone(), draft.y.clone()],
        ChartKind::Treemap | ChartKind::Pie => vec![
            first(&draft.group_by, &draft.x),
            first(&draft.values, &draft.y),
        ],
        ChartKind::Box => vec![
            first(&draft.y, &draft.values),
            first(&draft.group_by, &draft.x),
        ],
        ChartKind::Histogram => vec![first(&draft.x, &draft.y)],
        ChartKind::Kpi => vec![first(&draft.y, &draft.values).or_else(|| draft.x.clone())],
    };

    let mut candidate_columns: Vec<String> = Vec::new();
    for column in ordered.into_iter().flatten() {
        if !candidate_columns.contains(&column) {
            candidate_columns.push(column);
        }
    }

    let intent = Intent {
        chart_kind: kind,
        candidate_columns,
        aggregation: draft
            .aggregation
            .as_deref()
            .and_then(Aggregation::from_name)
            .unwrap_or_default(),
        sort: draft
            .sort
            .as_deref()
            .and_then(SortOrder::from_name)
            .unwrap_or_default(),
        color_condition: None,
    };
    let mut plan = synthesizer.synthesize(&intent, profile);
    if let Some(title) = draft.title.as_ref().filter(|t| !t.is_empty()) {
        plan.config.title = title.clone();
    }
    plan
}
