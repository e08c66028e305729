//! Gemini REST implementation of the provider capability.
//!
//! Talks to the `models/{model}:streamGenerateContent` endpoint with
//! `alt=sse`, replaying the seeded history as `contents` and passing the
//! generation knobs through verbatim. The provider's own SSE stream is
//! decoded with the same trailing-line-buffer discipline the relay consumer
//! uses, so fragments split across chunk reads are never dropped.

use async_trait::async_trait;
use futures_util::StreamExt;
use memchr::memchr;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, ChatSession, FragmentStream, ProviderError, SeedMessage};
use crate::api::ChatSettings;
use crate::utils::url::construct_api_url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        GeminiProvider {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

impl ChatProvider for GeminiProvider {
    fn start_session(
        &self,
        seed: Vec<SeedMessage>,
        settings: &ChatSettings,
    ) -> Result<Box<dyn ChatSession>, ProviderError> {
        let contents = seed
            .iter()
            .map(|message| Content {
                role: Some(message.role.provider_role().to_string()),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            })
            .collect();

        Ok(Box::new(GeminiSession {
            http: self.http.clone(),
            url: construct_api_url(
                &self.base_url,
                &format!("models/{}:streamGenerateContent", settings.model),
            ),
            api_key: self.api_key.clone(),
            contents,
            generation_config: GenerationConfig {
                temperature: settings.temperature,
                top_p: settings.top_p,
                top_k: settings.top_k,
                max_output_tokens: settings.max_tokens,
            },
            system_instruction: settings.system_instruction.clone().map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
        }))
    }
}

struct GeminiSession {
    http: reqwest::Client,
    url: String,
    api_key: String,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: Option<Content>,
}

impl GeminiSession {
    fn request_body(&self, turn: &str) -> GenerateRequest {
        let mut contents = self.contents.clone();
        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: turn.to_string(),
            }],
        });
        GenerateRequest {
            contents,
            generation_config: self.generation_config.clone(),
            system_instruction: self.system_instruction.clone(),
        }
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send_streaming(&self, turn: &str) -> Result<FragmentStream, ProviderError> {
        let response = self
            .http
            .post(&self.url)
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .json(&self.request_body(turn))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .as_ref()
                .and_then(extract_error_message)
                .unwrap_or(body);
            return Err(format!("upstream request failed ({status}): {detail}").into());
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(ProviderError::from)?;
                buffer.extend_from_slice(&chunk);

                while let Some(newline_pos) = memchr(b'\n', &buffer) {
                    let line = match std::str::from_utf8(&buffer[..newline_pos]) {
                        Ok(s) => s.trim().to_string(),
                        Err(e) => {
                            tracing::debug!("invalid UTF-8 in provider stream: {e}");
                            buffer.drain(..=newline_pos);
                            continue;
                        }
                    };
                    buffer.drain(..=newline_pos);

                    if let Some(payload) = line.strip_prefix("data:").map(str::trim_start) {
                        if let Some(text) = decode_provider_payload(payload)? {
                            yield text;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Decode one provider SSE payload into a text fragment.
///
/// Payloads carrying an `error` object abort the stream; anything that is not
/// JSON or has no candidate text is skipped.
fn decode_provider_payload(payload: &str) -> Result<Option<String>, ProviderError> {
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };

    if let Some(message) = extract_error_message(&value) {
        return Err(message.into());
    }

    let chunk: GenerateChunk = match serde_json::from_value(value) {
        Ok(chunk) => chunk,
        Err(_) => return Ok(None),
    };

    let text: String = chunk
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

fn extract_error_message(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                _ => None,
            })
        })
}
