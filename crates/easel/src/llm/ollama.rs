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

use llm_contracts::{GenerationOptions, LLMError, LLMResult, ProviderSettings, TextGenerator};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Blocking client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(settings: &ProviderSettings) -> LLMResult<Self> {
        settings.validate().map_err(LLMError::Configuration)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| LLMError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_retries: settings.max_retries,
        })
    }

    fn build_payload(&self, prompt: &str, options: &GenerationOptions) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "top_p": options.top_p,
                "num_predict": options.max_tokens,
            }
        })
    }

    fn post_with_retry(&self, endpoint: &str, payload: &Value) -> LLMResult<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            debug!(
                attempt = attempt + 1,
                max_retries = self.max_retries + 1,
                "Sending request to Ollama API"
            );

            match self.client.post(&url).json(payload).send() {
                Ok(resp) => {
                    let status = resp.status();
                    info!("Received response from Ollama API: {}", status);

                    if status.is_success() {
                        return resp.json::<Value>().map_err(|e| {
                            LLMError::Serialisation(format!("Failed to parse JSON response: {e}"))
                        });
                    }
                    if status.as_u16() == 429 {
                        let wait_time = Duration::from_secs(2_u64.pow(attempt.min(5)));
                        warn!(
                            "Rate limited by Ollama API, waiting {:?} before retry",
                            wait_time
                        );
                        std::thread::sleep(wait_time);
                        last_error = Some(LLMError::RateLimit);
                        continue;
                    }

                    let error_body = resp.text().unwrap_or_default();
                    if status.as_u16() == 404 {
                        return Err(LLMError::ModelNotFound(format!(
                            "{}: {error_body}",
                            self.model
                        )));
                    }
                    last_error = Some(LLMError::Provider(format!(
                        "Ollama API error {status}: {error_body}"
                    )));
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!("Request to Ollama API timed out");
                    last_error = Some(LLMError::Timeout);
                }
                Err(e) => {
                    last_error = Some(LLMError::Network(format!("Request failed: {e}")));
                    if attempt < self.max_retries {
                        std::thread::sleep(Duration::from_secs(2_u64.pow(attempt.min(3))));
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LLMError::Internal("Unknown error".to_string())))
    }

    fn fetch_tags(&self) -> LLMResult<Value> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| LLMError::Unavailable(format!("Failed to connect to Ollama: {e}")))?;
        if !response.status().is_success() {
            return Err(LLMError::Unavailable(format!(
                "Ollama health check failed with status {}",
                response.status()
            )));
        }
        response
            .json()
            .map_err(|e| LLMError::Serialisation(format!("Failed to parse models response: {e}")))
    }
}

impl TextGenerator for OllamaGenerator {
    fn generate_text(&self, prompt: &str, options: &GenerationOptions) -> LLMResult<String> {
        let payload = self.build_payload(prompt, options);
        let data = self.post_with_retry("/api/generate", &payload)?;
        let text = data["response"].as_str().ok_or_else(|| {
            LLMError::Provider("Failed to extract text from Ollama response".to_string())
        })?;
        if text.trim().is_empty() {
            return Err(LLMError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    fn is_available(&self) -> bool {
        match self.fetch_tags() {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Ollama not reachable");
                false
            }
        }
    }

    fn list_models(&self) -> LLMResult<Vec<String>> {
        let tags = self.fetch_tags()?;
        Ok(tags["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_maps_generation_options() {
        let generator = OllamaGenerator::new(&ProviderSettings::default()).unwrap();
        let payload = generator.build_payload("hi", &GenerationOptions::default());
        assert_eq!(payload["model"], "mistral:7b");
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["options"]["num_predict"], 1000);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = ProviderSettings {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            OllamaGenerator::new(&settings),
            Err(LLMError::Configuration(_))
        ));
    }
}
