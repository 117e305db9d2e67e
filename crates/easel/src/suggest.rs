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

use crate::schema::DatasetSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub prompt: String,
    pub category: String,
}

impl Suggestion {
    fn new(title: impl Into<String>, prompt: impl Into<String>, category: &str) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            category: category.to_string(),
        }
    }
}

/// Ready-made prompts that fit the columns this dataset actually has.
pub fn suggest_visualizations(schema: &DatasetSchema) -> Vec<Suggestion> {
    let numeric: Vec<&str> = schema
        .numeric()
        .into_iter()
        .filter(|n| !schema.flags().contains(n))
        .collect();
    let categorical = schema.categorical();
    let temporal = schema.temporal();
    let flags = schema.flags();
    let mut suggestions = Vec::new();

    if let Some(flag) = flags.first() {
        suggestions.push(Suggestion::new(
            "Conversion Overview",
            format!("Calculate the conversion rate using the {flag} column and create a KPI card"),
            "KPI",
        ));
    }
    if let (Some(category), Some(value)) = (categorical.first(), numeric.first()) {
        suggestions.push(Suggestion::new(
            format!("{value} by {category}"),
            format!("Compare the average {value} across all {category} categories. Sort descending"),
            "Comparison",
        ));
    }
    if numeric.len() >= 2 {
        suggestions.push(Suggestion::new(
            format!("{} vs {}", numeric[0], numeric[1]),
            format!("Plot {} vs {} with a scatter plot", numeric[0], numeric[1]),
            "Relationship",
        ));
    }
    if numeric.len() >= 3 {
        let picked: Vec<&str> = numeric.iter().take(4).copied().collect();
        suggestions.push(Suggestion::new(
            "Correlation Overview",
            format!("Show a correlation heatmap between {}", join_names(&picked)),
            "Analysis",
        ));
    }
    if let (Some(time), Some(value)) = (temporal.first(), numeric.first()) {
        suggestions.push(Suggestion::new(
            format!("{value} Trend"),
            format!("Show the trend of average {value} over time using {time} as a line chart"),
            "Trend",
        ));
    }
    suggestions
}

fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnKind;

    #[test]
    fn suggestions_follow_available_columns() {
        let schema = DatasetSchema::new([
            ("education", ColumnKind::Categorical),
            ("Income", ColumnKind::Numeric),
            ("MntWines", ColumnKind::Numeric),
            ("Recency", ColumnKind::Numeric),
            ("Response", ColumnKind::BinaryFlag),
        ]);
        let categories: Vec<String> = suggest_visualizations(&schema)
            .into_iter()
            .map(|s| s.category)
            .collect();
        assert_eq!(categories, vec!["KPI", "Comparison", "Relationship", "Analysis"]);
    }

    #[test]
    fn text_only_dataset_gets_no_suggestions() {
        let schema = DatasetSchema::new([("name", ColumnKind::Categorical)]);
        assert!(suggest_visualizations(&schema).is_empty());
    }

    #[test]
    fn heatmap_prompt_lists_columns() {
        assert_eq!(join_names(&["A", "B", "C"]), "A, B, and C");
    }
}
