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

use crate::chart::ChartKind;
use crate::schema::{ColumnKind, DatasetProfile};

const KIND_ORDER: [ColumnKind; 4] = [
    ColumnKind::Numeric,
    ColumnKind::BinaryFlag,
    ColumnKind::Categorical,
    ColumnKind::Temporal,
];

/// Dataset columns grouped by kind, one line per non-empty group.
pub fn columns_context(profile: &DatasetProfile) -> String {
    let mut lines = vec![format!("Rows: {}", profile.row_count)];
    for kind in KIND_ORDER {
        let names: Vec<&str> = profile
            .schema
            .columns()
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect();
        if !names.is_empty() {
            lines.push(format!("{} columns: {}", capitalise(kind.label()), names.join(", ")));
        }
    }
    lines.join("\n")
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Request wrapped with dataset context and the JSON output contract.
pub fn enhanced_prompt(request: &str, profile: &DatasetProfile) -> String {
    let kinds: Vec<&str> = ChartKind::ALL.iter().map(|k| k.as_str()).collect();
    format!(
        r#"You are a Senior Marketing & Financial Analyst creating data visualizations.

DATASET CONTEXT:
{context}

USER REQUEST:
{request}

TASK:
Describe the requested chart as a single JSON object with these keys:
- "chart": one of {kinds}
- "x", "y", "color", "values", "group_by": exact column names from the dataset context, when relevant
- "columns": list of column names (heatmap only)
- "aggregation": one of mean, sum, count, median
- "sort": ascending or descending, when requested
- "title": a short chart title

Use column names exactly as listed. Do not write code or expressions.
Return ONLY the JSON object, no explanations."#,
        context = columns_context(profile),
        request = request.trim(),
        kinds = kinds.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DatasetSchema;

    #[test]
    fn context_groups_columns_by_kind() {
        let profile = DatasetProfile::from_schema(DatasetSchema::new([
            ("education", ColumnKind::Categorical),
            ("Income", ColumnKind::Numeric),
            ("Response", ColumnKind::BinaryFlag),
        ]));
        let context = columns_context(&profile);
        assert!(context.contains("Numeric columns: Income"));
        assert!(context.contains("Binary flag columns: Response"));
        assert!(context.contains("Categorical columns: education"));
        assert!(!context.contains("Temporal"));
    }

    #[test]
    fn prompt_carries_request_and_output_contract() {
        let profile = DatasetProfile::from_schema(DatasetSchema::new([(
            "Income",
            ColumnKind::Numeric,
        )]));
        let prompt = enhanced_prompt("  Show Income  ", &profile);
        assert!(prompt.contains("USER REQUEST:\nShow Income\n"));
        assert!(prompt.contains("\"chart\""));
        assert!(prompt.contains("heatmap"));
    }
}
