//! Notification delivery abstraction.
//!
//! Four independent, best-effort operations; a failure in one never rolls
//! back or blocks another, and the monitor never retries delivery.

pub mod wecom;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use wecom::WeComSink;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a plain-text message.
    async fn send_text(&self, content: &str) -> Result<()>;

    /// Deliver a formatted (Markdown) message.
    async fn send_markdown(&self, content: &str) -> Result<()>;

    /// Upload a file, returning the channel's attachment id, or `None` when
    /// the channel rejected it.
    async fn upload_attachment(&self, path: &Path) -> Result<Option<String>>;

    /// Deliver a previously uploaded attachment.
    async fn send_attachment(&self, attachment_id: &str) -> Result<()>;
}
