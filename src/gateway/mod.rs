//! Boundary to the hosted chat-completion service.
//!
//! Provides the [`CompletionBackend`] trait, an OpenAI-compatible HTTP
//! implementation in [`openai`], the deterministic offline answers in
//! [`fallback`], and the natural-language-to-SQL path in [`sql`].

pub mod fallback;
pub mod openai;
pub mod sql;

use crate::error::Result;
use crate::session::Message;

/// Something that can turn a message list into an assistant reply.
///
/// Failures of any kind (credential, network, remote error, rejected model) are
/// reported once; callers fall back to [`fallback::answer`] and never retry.
#[allow(async_fn_in_trait)]
pub trait CompletionBackend {
    /// Whether a request can be attempted at all. `false` means the caller
    /// should go straight to the fallback without calling [`Self::complete`].
    fn available(&self) -> bool {
        true
    }

    /// Send the full message list and return the assistant text.
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String>;
}
