//! Translate `OpenAI` Chat Completions requests into upstream Messages API requests.
//!
//! System messages are hoisted into the top-level `system` string, every other message
//! becomes exactly one upstream turn, and image parts are inlined as base64 blocks via
//! the [`MediaResolver`]. Images are resolved concurrently; block order always follows
//! part order.

use futures::future::try_join_all;

use super::anthropic_types::{ContentBlock, Message, MessagesRequest, Role};
use super::openai_types::{ChatCompletionRequest, ChatMessage, ContentPart, MessageContent, StopSequences};
use crate::error::Result;
use crate::media::MediaResolver;

/// Used when the client sends no `max_tokens` (or zero); the upstream requires one.
pub const DEFAULT_MAX_TOKENS: u64 = 1024;

/// Translate a chat completions request into a Messages API request.
///
/// Only image resolution can fail; missing optional fields fall back to defaults.
/// The result never asks the upstream to stream.
pub async fn openai_to_anthropic(
    req: &ChatCompletionRequest,
    media: &MediaResolver,
) -> Result<MessagesRequest> {
    let turns = req
        .messages
        .iter()
        .filter(|m| !m.is_system())
        .map(|m| translate_message(m, media));
    let messages = try_join_all(turns).await?;

    Ok(MessagesRequest {
        model: req.model.clone(),
        max_tokens: req
            .max_tokens
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS),
        messages,
        system: system_prompt(&req.messages),
        temperature: req.temperature,
        top_p: req.top_p,
        stop_sequences: req.stop.clone().map(StopSequences::into_vec),
        stream: false,
    })
}

/// All system texts, blank ones dropped, joined by a blank line.
fn system_prompt(messages: &[ChatMessage]) -> Option<String> {
    let system = messages
        .iter()
        .filter(|m| m.is_system())
        .map(ChatMessage::text_only)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if system.is_empty() {
        None
    } else {
        Some(system)
    }
}

async fn translate_message(msg: &ChatMessage, media: &MediaResolver) -> Result<Message> {
    let mut content = match &msg.content {
        MessageContent::Text(text) => vec![ContentBlock::text(text.clone())],
        MessageContent::Parts(parts) => translate_parts(parts, media).await?,
        MessageContent::Other(_) => Vec::new(),
    };

    // The upstream counts turns; an empty message still has to occupy one.
    if content.is_empty() {
        content.push(ContentBlock::text(""));
    }

    Ok(Message {
        role: Role::from_source(&msg.role),
        content,
    })
}

async fn translate_parts(
    parts: &[ContentPart],
    media: &MediaResolver,
) -> Result<Vec<ContentBlock>> {
    let pending = parts.iter().map(|part| translate_part(part, media));
    let blocks = try_join_all(pending).await?;
    Ok(blocks.into_iter().flatten().collect())
}

async fn translate_part(part: &ContentPart, media: &MediaResolver) -> Result<Option<ContentBlock>> {
    match part {
        ContentPart::Text { text } => Ok(Some(ContentBlock::text(
            text.clone().unwrap_or_default(),
        ))),
        ContentPart::ImageUrl(image) | ContentPart::InputImage(image) => {
            let Some(url) = image.source_url() else {
                return Ok(None);
            };
            let resolved = media.resolve(url).await?;
            Ok(Some(ContentBlock::base64_image(
                resolved.media_type,
                resolved.data,
            )))
        }
        ContentPart::Unsupported => Ok(None),
    }
}
