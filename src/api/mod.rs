use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub settings: ChatSettings,
}

/// Generation knobs passed through to the upstream provider verbatim. The
/// fields are independent dials; range validation is delegated upstream and a
/// rejection comes back as an error frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f64,
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
    #[serde(rename = "topP")]
    pub top_p: f64,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(
        rename = "systemInstruction",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub system_instruction: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        ChatSettings {
            model: crate::core::config::DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            top_p: 0.95,
            top_k: 40,
            system_instruction: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

pub mod frame;
pub mod models;
