//! Google Gemini text generation client.
//!
//! Sends a single user prompt to the `generateContent` endpoint and digs
//! the generated text out of the nested candidate/part response shape.

use crate::config::GeminiConfig;
use crate::errors::ClientError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 500;

/// Single-prompt text generation. One request at a time from the caller's
/// perspective; the implementation holds no concurrency guard of its own.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_description(&self, prompt: &str) -> Result<String, ClientError>;
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            client: Client::new(),
            base_url,
        }
    }

    /// Build a client from configuration. The API key is always injected
    /// from the config or the environment, never embedded in the source.
    pub fn from_config(config: &GeminiConfig) -> Result<Self, ClientError> {
        let api_key = config.resolve_api_key()?;
        Ok(Self::new(api_key, config.model.clone()))
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    #[allow(dead_code)]
    code: u16,
    message: String,
}

/// Wrap the raw concept in the instruction the model is asked to follow.
fn build_instruction(prompt: &str) -> String {
    format!(
        "Generate a detailed description of an image based on the following concept: \"{}\". \
         Focus on visual details, colors, mood and artistic style. Be concise.",
        prompt
    )
}

fn extract_text(response: GeminiResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .map(|part| part.text)
        .filter(|text| !text.is_empty())
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_description(&self, prompt: &str) -> Result<String, ClientError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ClientError::ValidationError(
                "Enter a concept to generate a description for.".to_string(),
            ));
        }

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: build_instruction(prompt),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(format!("Generation request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<GeminiError>(&error_text) {
                Ok(gemini_error) => gemini_error.error.message,
                Err(_) if error_text.is_empty() => status.to_string(),
                Err(_) => error_text,
            };
            if status == StatusCode::UNAUTHORIZED {
                return Err(ClientError::Unauthorized(detail));
            }
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                detail,
            });
        }

        // Keep the raw payload around so a shape mismatch can be logged in
        // full for diagnosis.
        let payload: Value = response
            .json()
            .await
            .map_err(|e| ClientError::ParsingError(format!("Failed to decode response: {}", e)))?;
        let parsed: GeminiResponse = serde_json::from_value(payload.clone())
            .map_err(|e| ClientError::ParsingError(format!("Failed to decode response: {}", e)))?;

        match extract_text(parsed) {
            Some(text) => Ok(text),
            None => {
                log::error!("Generation response had no usable text: {}", payload);
                Err(ClientError::ParsingError(
                    "Could not generate a description. Try a different concept.".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockGeminiServer;
    use serde_json::json;

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::with_base_url("test-key".to_string(), "gemini-1.5-flash".to_string(), base_url)
    }

    #[test]
    fn test_instruction_embeds_raw_prompt() {
        let instruction = build_instruction("a cat on the moon");
        assert!(instruction.contains("\"a cat on the moon\""));
        assert!(instruction.contains("artistic style"));
    }

    #[test]
    fn test_extract_text_takes_first_candidate_first_part() {
        let response = GeminiResponse {
            candidates: vec![GeminiCandidate {
                content: Some(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![
                        GeminiPart {
                            text: "first".to_string(),
                        },
                        GeminiPart {
                            text: "second".to_string(),
                        },
                    ],
                }),
            }],
        };
        assert_eq!(extract_text(response), Some("first".to_string()));
    }

    #[test]
    fn test_extract_text_handles_missing_pieces() {
        assert_eq!(extract_text(GeminiResponse { candidates: vec![] }), None);
        let no_content = GeminiResponse {
            candidates: vec![GeminiCandidate { content: None }],
        };
        assert_eq!(extract_text(no_content), None);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected_without_network() {
        let server = MockGeminiServer::start().await;
        let gemini = client(server.address());

        let err = gemini.generate_description("   ").await.unwrap_err();
        assert!(matches!(err, ClientError::ValidationError(_)));
        assert_eq!(server.request_count(), 0);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_generates_text_with_fixed_sampling_parameters() {
        let server = MockGeminiServer::start().await;
        server.enqueue_ok(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "A cat in a silver suit."}]}}
            ]
        }));
        let gemini = client(server.address());

        let text = gemini.generate_description("a cat").await.unwrap();
        assert_eq!(text, "A cat in a silver suit.");

        let request = server.last_request().unwrap();
        let config = request.get("generationConfig").unwrap();
        let temperature = config.get("temperature").unwrap().as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
        assert_eq!(config.get("maxOutputTokens").unwrap().as_u64().unwrap(), 500);
        let text_sent = request["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text_sent.contains("\"a cat\""));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_candidates_yields_could_not_generate() {
        let server = MockGeminiServer::start().await;
        server.enqueue_ok(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        let gemini = client(server.address());

        let err = gemini.generate_description("a cat").await.unwrap_err();
        match err {
            ClientError::ParsingError(msg) => assert!(msg.contains("Could not generate")),
            other => panic!("expected parsing error, got {:?}", other),
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_http_error_surfaces_structured_message() {
        let server = MockGeminiServer::start().await;
        server.enqueue_error(
            400,
            json!({"error": {"code": 400, "message": "API key not valid"}}),
        );
        let gemini = client(server.address());

        let err = gemini.generate_description("a cat").await.unwrap_err();
        match err {
            ClientError::ApiError { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "API key not valid");
            }
            other => panic!("expected api error, got {:?}", other),
        }

        server.shutdown().await;
    }
}
