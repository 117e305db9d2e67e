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

use easel::chart::{Aggregation, ChartSpec};
use easel::figure::Trace;
use easel::{Coordinator, EaselConfig, GenerationMethod, Session};
use llm_contracts::{GenerationOptions, LLMError, LLMResult, TextGenerator};
use polars::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn customers() -> DataFrame {
    df!(
        "education" => ["Graduation", "PhD", "Master", "Basic", "Graduation", "PhD"],
        "Income" => [58138i64, 46344, 71613, 26646, 58293, 62513]
    )
    .unwrap()
}

enum Script {
    Reply(&'static str),
    Fail,
}

struct ScriptedGenerator {
    script: Script,
    available: bool,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn replying(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Reply(reply),
            available: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            script: Script::Fail,
            available: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn offline() -> Arc<Self> {
        Arc::new(Self {
            script: Script::Fail,
            available: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate_text(&self, prompt: &str, _options: &GenerationOptions) -> LLMResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(prompt.contains("education"));
        match self.script {
            Script::Reply(reply) => Ok(reply.to_string()),
            Script::Fail => Err(LLMError::Timeout),
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn list_models(&self) -> LLMResult<Vec<String>> {
        Ok(vec!["scripted:1b".to_string()])
    }

    fn model_name(&self) -> &str {
        "scripted:1b"
    }
}

fn coordinator_with(generator: Arc<ScriptedGenerator>) -> Coordinator {
    Coordinator::new(&EaselConfig::default()).with_generator(generator)
}

fn bar_values(figure: &easel::Figure) -> (Vec<String>, Vec<Option<f64>>) {
    match &figure.data[0] {
        Trace::Bar { x, y, .. } => (x.as_labels().unwrap().to_vec(), y.clone()),
        other => panic!("expected a bar trace, got {other:?}"),
    }
}

#[test]
fn test_rule_based_comparison_bar() {
    let coordinator = Coordinator::new(&EaselConfig::default());
    let result = coordinator.generate("Compare average Income by education", &customers(), false);

    assert_eq!(result.method, GenerationMethod::RuleBased);
    assert_eq!(result.figure.title(), Some("Mean Income by Education"));
    let (labels, values) = bar_values(&result.figure);
    assert_eq!(labels, ["Basic", "Graduation", "Master", "PhD"]);
    assert_eq!(
        values,
        vec![Some(26646.0), Some(58215.5), Some(71613.0), Some(54428.5)]
    );
}

#[test]
fn test_two_categorical_columns_render_against_a_numeric_value() {
    let df = df!(
        "education" => ["Graduation", "PhD", "Master", "Graduation"],
        "Marital_Status" => ["Single", "Married", "Single", "Together"],
        "Income" => [58138i64, 46344, 71613, 26646]
    )
    .unwrap();
    let coordinator = Coordinator::new(&EaselConfig::default());

    for request in [
        "Compare education and Marital_Status",
        "treemap of education and Marital_Status",
    ] {
        let result = coordinator.generate(request, &df, false);
        assert!(
            !result.figure.is_error_placeholder(),
            "{request} produced a placeholder"
        );
        let plan = result.plan.unwrap();
        assert_eq!(plan.resolved_columns()[1].1, "Income", "{request}");
    }
}

#[test]
fn test_rule_based_output_is_deterministic() {
    let coordinator = Coordinator::new(&EaselConfig::default());
    let session = Session::new(customers()).unwrap();
    let first = coordinator.generate_for(&session, "histogram of Income", false);
    let second = coordinator.generate_for(&session, "histogram of Income", false);
    assert_eq!(first.figure, second.figure);
    assert_eq!(first.plan, second.plan);
    assert_ne!(first.request_id, second.request_id);
}

#[test]
fn test_model_path_disabled_skips_generator() {
    let generator = ScriptedGenerator::replying("{\"chart\": \"pie\"}");
    let coordinator = coordinator_with(generator.clone());
    let result = coordinator.generate("Compare Income across education", &customers(), false);
    assert_eq!(result.method, GenerationMethod::RuleBased);
    assert_eq!(generator.calls(), 0);
}

#[test]
fn test_model_draft_is_repaired_and_rendered() {
    let generator = ScriptedGenerator::replying(
        "Here you go:\n```json\n{\"chart\": \"bar\", \"x\": \"educaton\", \"y\": \"Income\", \"aggregation\": \"sum\"}\n```",
    );
    let coordinator = coordinator_with(generator.clone());
    let result = coordinator.generate("Total income per education level", &customers(), true);

    assert_eq!(generator.calls(), 1);
    assert_eq!(result.method, GenerationMethod::Llm);
    let plan = result.plan.unwrap();
    assert!(matches!(
        plan.spec,
        ChartSpec::Bar { ref x, aggregation: Aggregation::Sum, .. } if x == "education"
    ));
    let (labels, values) = bar_values(&result.figure);
    assert_eq!(labels, ["Basic", "Graduation", "Master", "PhD"]);
    assert_eq!(
        values,
        vec![Some(26646.0), Some(116431.0), Some(71613.0), Some(108857.0)]
    );
}

#[test]
fn test_unavailable_model_falls_back() {
    let generator = ScriptedGenerator::offline();
    let coordinator = coordinator_with(generator.clone());
    let result = coordinator.generate("Compare Income across education", &customers(), true);
    assert_eq!(result.method, GenerationMethod::RuleBased);
    assert_eq!(generator.calls(), 0);
}

#[test]
fn test_generator_error_falls_back() {
    let generator = ScriptedGenerator::failing();
    let coordinator = coordinator_with(generator.clone());
    let result = coordinator.generate("Compare Income across education", &customers(), true);
    assert_eq!(result.method, GenerationMethod::RuleBased);
    assert_eq!(generator.calls(), 1);
    assert!(!result.figure.is_error_placeholder());
}

#[test]
fn test_unusable_drafts_fall_back_to_rules() {
    for reply in [
        "A bar chart of income by education would work well.",
        "{\"chart\": \"bar\", \"x\": \"bogus_col\", \"y\": \"Income\"}",
        "{\"chart\": \"bar\", \"x\": \"df['education']\", \"y\": \"Income\"}",
    ] {
        let coordinator = coordinator_with(ScriptedGenerator::replying(reply));
        let result = coordinator.generate("Compare Income across education", &customers(), true);
        assert_eq!(result.method, GenerationMethod::RuleBased, "reply: {reply}");
        assert!(!result.figure.is_error_placeholder());
    }
}

#[test]
fn test_empty_dataframe_still_returns_a_figure() {
    let coordinator = Coordinator::new(&EaselConfig::default());
    let result = coordinator.generate("show me anything", &DataFrame::default(), true);
    assert_eq!(result.method, GenerationMethod::RuleBased);
    assert!(result.figure.is_error_placeholder());
}

#[test]
fn test_model_status_reports_generator() {
    let status = Coordinator::new(&EaselConfig::default()).model_status();
    assert!(!status.llm_available);
    assert_eq!(status.model_name, "mistral:7b");
    assert_eq!(status.fallback_mode, "rule-based visualization");

    let status = coordinator_with(ScriptedGenerator::replying("{}")).model_status();
    assert!(status.llm_available);
    assert_eq!(status.model_name, "scripted:1b");
    assert_eq!(status.available_models, vec!["scripted:1b"]);

    let status = coordinator_with(ScriptedGenerator::offline()).model_status();
    assert!(!status.llm_available);
}

#[test]
fn test_strategies_are_ordered_model_first() {
    let coordinator = coordinator_with(ScriptedGenerator::replying("{}"));
    assert_eq!(coordinator.strategy_names(), vec!["llm", "rule-based"]);
    assert_eq!(
        Coordinator::new(&EaselConfig::default()).strategy_names(),
        vec!["rule-based"]
    );
}

#[test]
fn test_session_suggestions_use_schema() {
    let session = Session::new(customers()).unwrap();
    let suggestions = Coordinator::new(&EaselConfig::default()).suggest(session.schema());
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].title, "Income by education");
}
