//! One-shot "say" command: the consuming side of the relay on the command
//! line. Streams the reply to stdout as fragments arrive.

use std::error::Error;
use std::io::{self, Write};

use tokio_util::sync::CancellationToken;

use crate::api::ChatSettings;
use crate::client::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::core::message::{Message, Role};

pub async fn run_say(
    prompt: Vec<String>,
    model: Option<String>,
    url: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.is_empty() {
        eprintln!("Usage: chatrelay say <prompt>");
        std::process::exit(1);
    }

    let config = Config::load()?;
    let base_url = url.unwrap_or_else(|| config.relay_base_url());
    let settings = ChatSettings {
        model: model.unwrap_or_else(|| config.default_model()),
        ..ChatSettings::default()
    };

    let (service, mut rx) = ChatStreamService::new();
    service.spawn_stream(StreamParams {
        client: reqwest::Client::new(),
        base_url,
        messages: vec![Message::new(Role::User, prompt)],
        settings,
        cancel_token: CancellationToken::new(),
    });

    loop {
        match rx.recv().await {
            Some(StreamMessage::Chunk(content)) => {
                print!("{}", content);
                io::stdout().flush()?;
            }
            Some(StreamMessage::Error(e)) => {
                // Text printed so far stays on screen; the turn is not lost.
                eprintln!("\n\n❌ Error: {e}");
                std::process::exit(1);
            }
            Some(StreamMessage::Failed(e)) => {
                eprintln!("❌ Error: {e}");
                std::process::exit(1);
            }
            Some(StreamMessage::End) => {
                println!();
                break;
            }
            None => break,
        }
    }

    Ok(())
}
