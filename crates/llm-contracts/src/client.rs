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

use crate::requests::GenerationOptions;
use crate::types::LLMResult;

/// A blocking free-text generator.
///
/// Implementations own their transport, timeout and retry policy. Callers
/// only see text, an error, or a call that takes as long as the
/// implementation allows.
pub trait TextGenerator: Send + Sync {
    fn generate_text(&self, prompt: &str, options: &GenerationOptions) -> LLMResult<String>;

    fn is_available(&self) -> bool;

    /// Installed model names. Used for status reporting only.
    fn list_models(&self) -> LLMResult<Vec<String>>;

    fn model_name(&self) -> &str;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate_text(&self, prompt: &str, options: &GenerationOptions) -> LLMResult<String> {
        (**self).generate_text(prompt, options)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn list_models(&self) -> LLMResult<Vec<String>> {
        (**self).list_models()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
