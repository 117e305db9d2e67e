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

use easel::intent;
use easel::schema::{ColumnKind, DatasetSchema};
use easel::validator::validate_and_repair;
use easel::{Coordinator, EaselConfig, GenerationMethod, Session};
use polars::prelude::*;
use proptest::prelude::*;
use serde_json::{json, Value};

const WORDS: &[&str] = &[
    "show", "average", "total", "Income", "income", "education", "Response", "MntWines", "by",
    "vs", "heatmap", "kpi", "trend", "pie", "histogram", "box", "area", "treemap", "below", "50",
    "above", "color", "blue", "highest", "lowest", "bogus_col", "%", "<", "df['Income']",
];

fn session() -> Session {
    let df = df!(
        "education" => ["Graduation", "PhD", "Master", "Basic", "Graduation", "PhD"],
        "Income" => [58138.0, 46344.0, 71613.0, 26646.0, 58293.0, 62513.0],
        "MntWines" => [635i64, 11, 426, 11, 173, 520],
        "Response" => [1i64, 0, 0, 0, 1, 0]
    )
    .unwrap();
    Session::new(df).unwrap()
}

fn schema() -> DatasetSchema {
    DatasetSchema::new([
        ("education", ColumnKind::Categorical),
        ("Income", ColumnKind::Numeric),
        ("MntWines", ColumnKind::Numeric),
        ("Response", ColumnKind::BinaryFlag),
    ])
}

fn request() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::collection::vec(prop::sample::select(WORDS), 0..8).prop_map(|w| w.join(" ")),
        "[ -~]{0,60}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_every_request_yields_a_rule_based_figure(request in request()) {
        let session = session();
        let coordinator = Coordinator::new(&EaselConfig::default());
        let result = coordinator.generate_for(&session, &request, true);
        prop_assert_eq!(result.method, GenerationMethod::RuleBased);
        prop_assert!(!result.figure.is_error_placeholder());
        prop_assert!(result.figure.to_json().is_ok());
    }

    #[test]
    fn test_intent_columns_come_from_schema_in_order(request in request()) {
        let schema = schema();
        let parsed = intent::parse(&request, &schema);
        prop_assert_eq!(&parsed, &intent::parse(&request, &schema));

        let positions: Vec<usize> = parsed
            .candidate_columns
            .iter()
            .map(|c| schema.names().position(|n| n == c.as_str()).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_repaired_drafts_reference_schema_and_are_stable(x in "[A-Za-z_ ]{1,12}") {
        let draft = json!({"chart": "bar", "x": x, "y": "Income"}).to_string();
        if let Some(repaired) = validate_and_repair(&draft, &schema()) {
            let value: Value = serde_json::from_str(&repaired).unwrap();
            if let Some(column) = value["x"].as_str() {
                prop_assert!(schema().contains(column));
            }
            prop_assert_eq!(validate_and_repair(&repaired, &schema()), Some(repaired.clone()));
        }
    }
}
