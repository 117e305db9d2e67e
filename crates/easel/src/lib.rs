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

pub mod chart;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod figure;
pub mod frame;
pub mod fuzzy;
pub mod intent;
pub mod llm;
pub mod prompt;
pub mod sandbox;
pub mod schema;
pub mod suggest;
pub mod synthesizer;
pub mod validator;

pub use chart::{
    Aggregation, ChartConfig, ChartKind, ChartPlan, ChartSpec, ColorCondition, ColumnRole,
    ComparisonOp, KpiDisplay, SortOrder,
};
pub use config::EaselConfig;
pub use coordinator::{
    Coordinator, GenerationContext, GenerationMethod, GenerationResult, GenerationStrategy,
    Session, StrategyOutcome,
};
pub use error::{ConfigError, DataError, EaselError, RenderError, Result};
pub use extractor::extract_code;
pub use figure::Figure;
pub use intent::Intent;
pub use sandbox::{ExecutionLimits, Sandbox};
pub use schema::{ColumnKind, DatasetProfile, DatasetSchema, DatasetSummary};
pub use suggest::Suggestion;
pub use synthesizer::Synthesizer;
pub use validator::{draft_to_plan, validate_and_repair, LlmDraft, Validator};
