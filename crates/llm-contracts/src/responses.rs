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

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelStatus {
    pub llm_available: bool,
    pub model_name: String,
    pub fallback_mode: String,
    #[serde(default)]
    pub available_models: Vec<String>,
}

impl ModelStatus {
    pub fn unavailable(model_name: impl Into<String>) -> Self {
        Self {
            llm_available: false,
            model_name: model_name.into(),
            fallback_mode: "rule-based visualization".to_string(),
            available_models: Vec::new(),
        }
    }
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.llm_available {
            write!(
                f,
                "{} available ({} models installed)",
                self.model_name,
                self.available_models.len()
            )
        } else {
            write!(
                f,
                "{} unavailable, using {}",
                self.model_name, self.fallback_mode
            )
        }
    }
}
