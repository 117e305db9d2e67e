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

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const CODE_INDICATORS: &[&str] = &["{", "\"chart\"", "fig =", "px.", "go.", "df[", "import"];

static INLINE_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("inline span pattern is valid"));

/// Pulls the chart draft out of raw model output.
///
/// Order: fenced block with a language tag, plain fenced block, inline
/// backtick span, then a line scan starting at the first code-looking line.
/// Text without any of those is returned trimmed; only blank input yields `None`.
pub fn extract_code(response: &str) -> Option<String> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return None;
    }

    let blocks = extract_code_blocks(response);
    let tagged = blocks
        .iter()
        .find(|(language, code)| language.is_some() && !code.trim().is_empty());
    let generic = || {
        blocks
            .iter()
            .find(|(language, code)| language.is_none() && !code.trim().is_empty())
    };
    if let Some((language, code)) = tagged.or_else(generic) {
        debug!(language = ?language, "extracted fenced block");
        return Some(code.trim().to_string());
    }

    if let Some(span) = INLINE_SPAN_RE.captures(response) {
        debug!("extracted inline code span");
        return Some(span[1].trim().to_string());
    }

    if let Some(code) = scan_code_lines(response) {
        debug!("extracted code by line scan");
        return Some(code);
    }

    Some(trimmed.to_string())
}

/// Fenced blocks as `(language, body)` pairs; an unclosed fence runs to the end.
pub fn extract_code_blocks(text: &str) -> Vec<(Option<String>, String)> {
    let mut code_blocks = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let Some(tag) = line.trim().strip_prefix("```") else {
            continue;
        };
        let language = match tag.trim() {
            "" => None,
            lang => Some(lang.to_lowercase()),
        };

        let mut code_content = String::new();
        for code_line in lines.by_ref() {
            if code_line.trim().starts_with("```") {
                break;
            }
            if !code_content.is_empty() {
                code_content.push('\n');
            }
            code_content.push_str(code_line);
        }
        code_blocks.push((language, code_content));
    }
    code_blocks
}

fn scan_code_lines(text: &str) -> Option<String> {
    let mut in_code = false;
    let mut kept = Vec::new();
    for line in text.lines() {
        if !in_code && CODE_INDICATORS.iter().any(|marker| line.contains(marker)) {
            in_code = true;
        }
        if in_code {
            kept.push(line);
        }
    }
    let code = kept.join("\n");
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_string())
}

/// First balanced `{...}` span in `text`.
pub fn find_json_object(text: &str) -> Option<&str> {
    let mut balance = 0usize;
    let mut start_index = None;

    for (i, ch) in text.char_indices() {
        match ch {
            '{' => {
                if balance == 0 {
                    start_index = Some(i);
                }
                balance += 1;
            }
            '}' if balance > 0 => {
                balance -= 1;
                if balance == 0 {
                    return start_index.map(|start| &text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_fence_wins_over_earlier_generic_fence() {
        let response = "```\nplain\n```\nthen\n```json\n{\"chart\": \"bar\"}\n```";
        assert_eq!(extract_code(response).unwrap(), "{\"chart\": \"bar\"}");
    }

    #[test]
    fn blank_input_yields_none() {
        assert_eq!(extract_code(""), None);
        assert_eq!(extract_code("   \n\t"), None);
    }

    #[test]
    fn balanced_object_skips_trailing_prose() {
        let text = "{\"chart\": \"bar\", \"meta\": {\"a\": 1}} and some words }";
        assert_eq!(
            find_json_object(text),
            Some("{\"chart\": \"bar\", \"meta\": {\"a\": 1}}")
        );
        assert_eq!(find_json_object("no braces"), None);
    }
}
