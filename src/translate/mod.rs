//! Translation between `OpenAI` Chat Completions and the upstream Messages API.
//!
//! The core of the gateway: converts requests one way, responses the other way, and
//! replays finished responses as chunk streams. Only request translation does I/O,
//! and only to resolve image references.

pub mod anthropic_types;
pub mod lenient;
pub mod openai_types;
pub mod request;
pub mod response;
pub mod streaming;
