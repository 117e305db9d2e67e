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

use easel::extractor::{extract_code, extract_code_blocks};

#[test]
fn test_fenced_json_block_is_extracted() {
    let response = "Sure! Here is your chart:\n\n```json\n{\"chart\": \"bar\", \"x\": \"education\"}\n```\n\nLet me know if you need more.";
    assert_eq!(
        extract_code(response).unwrap(),
        "{\"chart\": \"bar\", \"x\": \"education\"}"
    );
}

#[test]
fn test_generic_fence_is_used_without_tag() {
    let response = "```\n{\"chart\": \"pie\"}\n```";
    assert_eq!(extract_code(response).unwrap(), "{\"chart\": \"pie\"}");
}

#[test]
fn test_inline_span_when_no_fence() {
    let response = "Use `{\"chart\": \"histogram\", \"x\": \"Income\"}` for this.";
    assert_eq!(
        extract_code(response).unwrap(),
        "{\"chart\": \"histogram\", \"x\": \"Income\"}"
    );
}

#[test]
fn test_line_scan_starts_at_first_code_line() {
    let response = "Here is what I came up with:\n{\"chart\": \"line\",\n \"x\": \"Dt_Customer\"}";
    let code = extract_code(response).unwrap();
    assert!(code.starts_with("{\"chart\": \"line\""));
    assert!(!code.contains("came up with"));
}

#[test]
fn test_plain_prose_is_returned_trimmed() {
    assert_eq!(
        extract_code("  I cannot help with that.  ").as_deref(),
        Some("I cannot help with that.")
    );
}

#[test]
fn test_unclosed_fence_runs_to_end() {
    let blocks = extract_code_blocks("```JSON\n{\"chart\": \"area\"}");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].0.as_deref(), Some("json"));
    assert_eq!(blocks[0].1, "{\"chart\": \"area\"}");
}

#[test]
fn test_empty_tagged_fence_falls_through_to_next_block() {
    let response = "```json\n```\n```\n{\"chart\": \"box\"}\n```";
    assert_eq!(extract_code(response).unwrap(), "{\"chart\": \"box\"}");
}
