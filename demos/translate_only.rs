//! Demonstrate the translation layer without a server.
//!
//! Usage:
//!   `cargo run --example translate_only`

use chat_gateway::media::MediaResolver;
use chat_gateway::translate::anthropic_types::{MessagesResponse, ResponseContentBlock, Usage};
use chat_gateway::translate::openai_types::ChatCompletionRequest;
use chat_gateway::translate::request::openai_to_anthropic;
use chat_gateway::translate::response::anthropic_to_openai;
use chat_gateway::translate::streaming::{StreamEmulator, StreamSettings};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // What an OpenAI-style client sends. The image is inline, so nothing is fetched.
    let chat_req: ChatCompletionRequest = serde_json::from_value(serde_json::json!({
        "model": "claude-3-5-sonnet-latest",
        "stream": true,
        "stop": ["\n\nHuman:"],
        "messages": [
            {"role": "system", "content": "You are a geography expert. Be concise."},
            {"role": "user", "content": "What is the capital of France?"},
            {"role": "assistant", "content": "The capital of France is Paris."},
            {"role": "user", "content": [
                {"type": "text", "text": "And the country on this flag?"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBORw0KGgo="}}
            ]}
        ]
    }))?;

    let media = MediaResolver::new(reqwest::Client::new(), Duration::from_secs(10), "translate-demo");
    let messages_req = openai_to_anthropic(&chat_req, &media).await?;

    println!("=== Translated Request (Messages API) ===");
    println!("{}", serde_json::to_string_pretty(&messages_req)?);

    // Simulate an upstream answer and translate back
    let messages_resp = MessagesResponse {
        id: Some("msg_demo".to_string()),
        model: Some("claude-3-5-sonnet-20241022".to_string()),
        content: Some(vec![ResponseContentBlock::Text {
            text: Some("That flag belongs to Germany, whose capital is Berlin.".to_string()),
        }]),
        stop_reason: Some("end_turn".to_string()),
        usage: Some(Usage {
            input_tokens: Some(42),
            output_tokens: Some(12),
        }),
    };

    let chat_resp = anthropic_to_openai(&messages_resp, &chat_req.model);

    println!();
    println!("=== Translated Response (chat completion) ===");
    println!("{}", serde_json::to_string_pretty(&chat_resp)?);

    // Replay it the way a streaming client would receive it
    println!();
    println!("=== Pseudo-stream ===");

    let emulator = StreamEmulator::new(&chat_resp, &chat_req.model, StreamSettings::default());
    for frame in emulator.frames() {
        println!("data: {}", frame.data());
    }

    println!();
    println!("Done! The translation layer works without an upstream.");
    Ok(())
}
