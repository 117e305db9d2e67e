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

//! Request orchestration: an ordered list of strategies, tried until one
//! produces a figure. The rule-based strategy always produces.

use crate::chart::ChartPlan;
use crate::config::EaselConfig;
use crate::error::Result;
use crate::extractor::extract_code;
use crate::figure::Figure;
use crate::intent;
use crate::prompt::enhanced_prompt;
use crate::sandbox::{ExecutionLimits, Sandbox};
use crate::schema::{DatasetProfile, DatasetSchema};
use crate::suggest::{suggest_visualizations, Suggestion};
use crate::synthesizer::Synthesizer;
use crate::validator::{draft_to_plan, Validator};
use llm_contracts::{GenerationOptions, ModelStatus, TextGenerator};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The output-slot marker a model response must contain.
pub const OUTPUT_MARKER: &str = "\"chart\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationMethod {
    #[serde(rename = "llm")]
    Llm,
    #[serde(rename = "rule-based")]
    RuleBased,
}

impl GenerationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMethod::Llm => "llm",
            GenerationMethod::RuleBased => "rule-based",
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub request_id: Uuid,
    pub figure: Figure,
    pub method: GenerationMethod,
    /// The draft or plan that produced the figure, for display and debugging.
    pub raw: Option<String>,
    pub plan: Option<ChartPlan>,
}

/// A loaded dataframe and the profile derived from it once.
pub struct Session {
    df: DataFrame,
    profile: DatasetProfile,
}

impl Session {
    pub fn new(df: DataFrame) -> Result<Self> {
        let profile = DatasetProfile::from_dataframe(&df)?;
        Ok(Self { df, profile })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn profile(&self) -> &DatasetProfile {
        &self.profile
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.profile.schema
    }
}

/// Everything a strategy may read for one request.
pub struct GenerationContext<'a> {
    pub request: &'a str,
    pub df: &'a DataFrame,
    pub profile: &'a DatasetProfile,
    pub use_llm: bool,
}

/// Shared pipeline stages handed to every strategy.
pub struct Toolkit {
    pub synthesizer: Synthesizer,
    pub validator: Validator,
    pub sandbox: Sandbox,
    pub options: GenerationOptions,
}

impl Toolkit {
    pub fn from_config(config: &EaselConfig) -> Self {
        Self {
            synthesizer: Synthesizer::new(config.charts.clone()),
            validator: Validator::new(config.validation.fuzzy_cutoff),
            sandbox: Sandbox::new(ExecutionLimits::from(&config.sandbox))
                .with_fallback_rows(config.charts.fallback_rows),
            options: config.llm.options.clone(),
        }
    }
}

pub struct Produced {
    pub figure: Figure,
    pub raw: Option<String>,
    pub plan: Option<ChartPlan>,
}

pub enum StrategyOutcome {
    Produced(Produced),
    Declined(String),
}

pub trait GenerationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn method(&self) -> GenerationMethod;

    fn attempt(&self, ctx: &GenerationContext<'_>, toolkit: &Toolkit) -> StrategyOutcome;
}

/// Model-drafted chart, validated against the schema before execution.
pub struct LlmStrategy {
    generator: Arc<dyn TextGenerator>,
}

impl LlmStrategy {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

impl GenerationStrategy for LlmStrategy {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn method(&self) -> GenerationMethod {
        GenerationMethod::Llm
    }

    fn attempt(&self, ctx: &GenerationContext<'_>, toolkit: &Toolkit) -> StrategyOutcome {
        if !ctx.use_llm {
            return StrategyOutcome::Declined("model path disabled for this request".into());
        }
        if !self.generator.is_available() {
            return StrategyOutcome::Declined(format!(
                "model {} unavailable",
                self.generator.model_name()
            ));
        }

        let prompt = enhanced_prompt(ctx.request, ctx.profile);
        let response = match self.generator.generate_text(&prompt, &toolkit.options) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "model generation failed");
                return StrategyOutcome::Declined(format!("generation failed: {e}"));
            }
        };
        let Some(code) = extract_code(&response) else {
            return StrategyOutcome::Declined("empty model response".into());
        };
        if !code.contains(OUTPUT_MARKER) {
            return StrategyOutcome::Declined("response has no chart object".into());
        }
        let Some(draft) = toolkit.validator.validate_draft(&code, &ctx.profile.schema) else {
            return StrategyOutcome::Declined("draft failed validation".into());
        };

        let plan = draft_to_plan(&draft, ctx.profile, &toolkit.synthesizer);
        let figure = toolkit.sandbox.execute(&plan, ctx.df);
        StrategyOutcome::Produced(Produced {
            figure,
            raw: serde_json::to_string(&draft).ok(),
            plan: Some(plan),
        })
    }
}

/// Keyword intent, deterministic synthesis, execution.
pub struct RuleBasedStrategy;

impl GenerationStrategy for RuleBasedStrategy {
    fn name(&self) -> &'static str {
        "rule-based"
    }

    fn method(&self) -> GenerationMethod {
        GenerationMethod::RuleBased
    }

    fn attempt(&self, ctx: &GenerationContext<'_>, toolkit: &Toolkit) -> StrategyOutcome {
        let intent = intent::parse(ctx.request, &ctx.profile.schema);
        let plan = toolkit.synthesizer.synthesize(&intent, ctx.profile);
        let figure = toolkit.sandbox.execute(&plan, ctx.df);
        StrategyOutcome::Produced(Produced {
            figure,
            raw: serde_json::to_string(&plan.spec).ok(),
            plan: Some(plan),
        })
    }
}

pub struct Coordinator {
    strategies: Vec<Box<dyn GenerationStrategy>>,
    toolkit: Toolkit,
    generator: Option<Arc<dyn TextGenerator>>,
    model_name: String,
}

impl Coordinator {
    /// Rule-based only.
    pub fn new(config: &EaselConfig) -> Self {
        Self {
            strategies: vec![Box::new(RuleBasedStrategy)],
            toolkit: Toolkit::from_config(config),
            generator: None,
            model_name: config.llm.provider.model.clone(),
        }
    }

    /// Puts a model-backed strategy ahead of the rule-based one.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.model_name = generator.model_name().to_string();
        self.strategies
            .insert(0, Box::new(LlmStrategy::new(Arc::clone(&generator))));
        self.generator = Some(generator);
        self
    }

    /// Wires the Ollama generator when enabled; a client that cannot be
    /// built leaves the coordinator rule-based.
    #[cfg(feature = "ollama")]
    pub fn from_config(config: &EaselConfig) -> Self {
        let coordinator = Self::new(config);
        if !config.llm.enabled {
            return coordinator;
        }
        match crate::llm::OllamaGenerator::new(&config.llm.provider) {
            Ok(generator) => coordinator.with_generator(Arc::new(generator)),
            Err(e) => {
                warn!(error = %e, "model client unavailable, using rule-based generation");
                coordinator
            }
        }
    }

    #[cfg(not(feature = "ollama"))]
    pub fn from_config(config: &EaselConfig) -> Self {
        Self::new(config)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Derives the profile from `df` for this call only.
    pub fn generate(&self, request: &str, df: &DataFrame, use_llm: bool) -> GenerationResult {
        let profile = DatasetProfile::from_dataframe(df).unwrap_or_else(|e| {
            warn!(error = %e, "profiling failed, continuing without a schema");
            DatasetProfile::from_schema(DatasetSchema::default())
        });
        self.generate_with_profile(request, df, &profile, use_llm)
    }

    pub fn generate_for(&self, session: &Session, request: &str, use_llm: bool) -> GenerationResult {
        self.generate_with_profile(request, session.dataframe(), session.profile(), use_llm)
    }

    pub fn generate_with_profile(
        &self,
        request: &str,
        df: &DataFrame,
        profile: &DatasetProfile,
        use_llm: bool,
    ) -> GenerationResult {
        let request_id = Uuid::new_v4();
        let ctx = GenerationContext {
            request,
            df,
            profile,
            use_llm,
        };

        for strategy in &self.strategies {
            match strategy.attempt(&ctx, &self.toolkit) {
                StrategyOutcome::Produced(produced) => {
                    info!(
                        %request_id,
                        method = %strategy.method(),
                        placeholder = produced.figure.is_error_placeholder(),
                        "generated visualization"
                    );
                    return GenerationResult {
                        request_id,
                        figure: produced.figure,
                        method: strategy.method(),
                        raw: produced.raw,
                        plan: produced.plan,
                    };
                }
                StrategyOutcome::Declined(reason) => {
                    debug!(%request_id, strategy = strategy.name(), %reason, "strategy declined");
                }
            }
        }

        warn!(%request_id, "no strategy produced a figure");
        GenerationResult {
            request_id,
            figure: Figure::error_placeholder("No generation strategy produced a chart."),
            method: GenerationMethod::RuleBased,
            raw: None,
            plan: None,
        }
    }

    pub fn model_status(&self) -> ModelStatus {
        let Some(generator) = &self.generator else {
            return ModelStatus::unavailable(self.model_name.clone());
        };
        if !generator.is_available() {
            return ModelStatus::unavailable(self.model_name.clone());
        }
        let mut status = ModelStatus::unavailable(self.model_name.clone());
        status.llm_available = true;
        status.available_models = generator.list_models().unwrap_or_default();
        status
    }

    pub fn suggest(&self, schema: &DatasetSchema) -> Vec<Suggestion> {
        suggest_visualizations(schema)
    }
}
