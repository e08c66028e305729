//! Upstream model provider capability.
//!
//! The relay never talks to a concrete API directly; it is handed a
//! [`ChatProvider`] at startup and opens one throwaway session per request.
//! A session is seeded with the conversation's prior turns and yields an
//! ordered, single-consumer, non-restartable fragment stream for the newest
//! turn. Provider-side failures surface as a single error at the point of
//! iteration.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::api::ChatSettings;
use crate::core::message::Role;

pub mod gemini;

pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;
pub type FragmentStream = BoxStream<'static, Result<String, ProviderError>>;

/// One prior turn, already normalized to the two-role vocabulary the
/// provider understands. Unknown wire roles degrade to `user`, matching the
/// relay's lenient intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedMessage {
    pub role: Role,
    pub content: String,
}

impl SeedMessage {
    pub fn from_wire(message: &crate::api::ChatMessage) -> Self {
        SeedMessage {
            role: Role::from_wire(&message.role).unwrap_or(Role::User),
            content: message.content.clone(),
        }
    }
}

#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Submit the newest turn and obtain the provider's token stream.
    ///
    /// An error returned here (as opposed to inside the stream) means the
    /// provider rejected the request before yielding any fragment.
    async fn send_streaming(&self, turn: &str) -> Result<FragmentStream, ProviderError>;
}

pub trait ChatProvider: Send + Sync {
    /// Open a session seeded with the prior conversation turns. Sessions are
    /// per-request and never pooled or shared.
    fn start_session(
        &self,
        seed: Vec<SeedMessage>,
        settings: &ChatSettings,
    ) -> Result<Box<dyn ChatSession>, ProviderError>;
}
