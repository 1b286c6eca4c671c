use super::anthropic_types::{MessagesResponse, ResponseContentBlock};
use super::openai_types::{ChatCompletionResponse, ChatUsage, Choice, ChoiceMessage};

/// Translate a Messages API response into a chat completion response.
/// Pure function: `requested_model` is what the client originally asked for and wins
/// over whatever alias the upstream reports.
pub fn anthropic_to_openai(resp: &MessagesResponse, requested_model: &str) -> ChatCompletionResponse {
    let text: String = resp
        .content
        .iter()
        .flatten()
        .filter_map(|block| match block {
            ResponseContentBlock::Text { text } => text.as_deref(),
            ResponseContentBlock::Other => None,
        })
        .collect();

    let finish_reason = map_stop_reason(resp.stop_reason.as_deref());

    let usage = resp.usage.map(|u| {
        let prompt_tokens = u.input_tokens.unwrap_or(0);
        let completion_tokens = u.output_tokens.unwrap_or(0);
        ChatUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    });

    let id = resp
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_completion_id);

    let model = if requested_model.is_empty() {
        resp.model.clone().unwrap_or_default()
    } else {
        requested_model.to_string()
    };

    ChatCompletionResponse {
        id,
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model,
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".to_string(),
                content: text,
            },
            finish_reason,
        }],
        usage,
    }
}

/// Map an upstream `stop_reason` to an `OpenAI` `finish_reason`.
/// Only `end_turn` is renamed; other reasons pass through, a missing one means `stop`.
pub fn map_stop_reason(reason: Option<&str>) -> String {
    match reason {
        None | Some("" | "end_turn") => "stop".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Fresh `chatcmpl-` identifier for responses the upstream did not label.
pub fn new_completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::anthropic_types::Usage;

    fn text_block(text: &str) -> ResponseContentBlock {
        ResponseContentBlock::Text {
            text: Some(text.to_string()),
        }
    }

    fn make_response(content: Vec<ResponseContentBlock>, stop_reason: Option<&str>) -> MessagesResponse {
        MessagesResponse {
            id: Some("msg_abc123".to_string()),
            model: Some("claude-upstream-alias".to_string()),
            content: Some(content),
            stop_reason: stop_reason.map(String::from),
            usage: Some(Usage {
                input_tokens: Some(10),
                output_tokens: Some(20),
            }),
        }
    }

    #[test]
    fn test_simple_text_response() {
        let resp = make_response(vec![text_block("Hello!")], Some("end_turn"));
        let result = anthropic_to_openai(&resp, "gpt-4o");

        assert_eq!(result.id, "msg_abc123");
        assert_eq!(result.object, "chat.completion");
        assert_eq!(result.model, "gpt-4o");
        assert_eq!(result.choices.len(), 1);
        assert_eq!(result.choices[0].index, 0);
        assert_eq!(result.choices[0].message.role, "assistant");
        assert_eq!(result.choices[0].message.content, "Hello!");
        assert_eq!(result.choices[0].finish_reason, "stop");
        assert_eq!(
            result.usage,
            Some(ChatUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            })
        );
        assert!(result.created > 0);
    }

    #[test]
    fn test_text_blocks_concatenate_without_separator() {
        let resp = make_response(
            vec![
                text_block("A"),
                ResponseContentBlock::Other,
                text_block("B"),
            ],
            None,
        );
        let result = anthropic_to_openai(&resp, "m");
        assert_eq!(result.choices[0].message.content, "AB");
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason(Some("end_turn")), "stop");
        assert_eq!(map_stop_reason(Some("tool_use")), "tool_use");
        assert_eq!(map_stop_reason(Some("max_tokens")), "max_tokens");
        assert_eq!(map_stop_reason(Some("")), "stop");
        assert_eq!(map_stop_reason(None), "stop");
    }

    #[test]
    fn test_empty_upstream_response_gets_defaults() {
        let result = anthropic_to_openai(&MessagesResponse::default(), "m");

        assert!(result.id.starts_with("chatcmpl-"));
        assert!(result.id.len() > "chatcmpl-".len());
        assert_eq!(result.model, "m");
        assert_eq!(result.choices[0].message.content, "");
        assert_eq!(result.choices[0].finish_reason, "stop");
        assert!(result.usage.is_none());

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("usage").is_none());
    }

    #[test]
    fn test_partial_usage_defaults_to_zero() {
        let mut resp = make_response(vec![text_block("x")], None);
        resp.usage = Some(Usage {
            input_tokens: Some(7),
            output_tokens: None,
        });
        let usage = anthropic_to_openai(&resp, "m").usage.unwrap();
        assert_eq!(usage.prompt_tokens, 7);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 7);
    }

    #[test]
    fn test_huge_usage_saturates() {
        let mut resp = make_response(vec![text_block("x")], None);
        resp.usage = Some(Usage {
            input_tokens: Some(u64::MAX),
            output_tokens: Some(1),
        });
        let usage = anthropic_to_openai(&resp, "m").usage.unwrap();
        assert_eq!(usage.prompt_tokens, u64::MAX);
        assert_eq!(usage.completion_tokens, 1);
        assert_eq!(usage.total_tokens, u64::MAX);
    }

    #[test]
    fn test_upstream_model_used_when_none_requested() {
        let resp = make_response(vec![text_block("x")], None);
        let result = anthropic_to_openai(&resp, "");
        assert_eq!(result.model, "claude-upstream-alias");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(new_completion_id(), new_completion_id());
    }
}
