//! WeCom (enterprise WeChat) group-robot webhook sink.
//!
//! The robot exposes a `webhook/send` endpoint for JSON messages and a
//! sibling `webhook/upload_media` endpoint for file attachments; a delivery
//! is only successful when the response body carries `errcode == 0`.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{MonitorError, Result};
use crate::notify::NotificationSink;

pub struct WeComSink {
    webhook_url: String,
    client: reqwest::Client,
}

impl WeComSink {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// The upload endpoint lives next to the send endpoint, keyed by the
    /// same robot token.
    fn upload_url(&self) -> String {
        format!(
            "{}&type=file",
            self.webhook_url.replace("webhook/send", "webhook/upload_media")
        )
    }

    async fn post_message(&self, payload: Value) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MonitorError::Notification(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| MonitorError::Notification(e.to_string()))?;
        check_errcode(&body)
    }
}

fn check_errcode(body: &Value) -> Result<()> {
    match body.get("errcode").and_then(Value::as_i64) {
        Some(0) => Ok(()),
        _ => Err(MonitorError::Notification(format!(
            "webhook rejected message: {body}"
        ))),
    }
}

#[async_trait]
impl NotificationSink for WeComSink {
    async fn send_text(&self, content: &str) -> Result<()> {
        self.post_message(json!({
            "msgtype": "text",
            "text": { "content": content },
        }))
        .await
    }

    async fn send_markdown(&self, content: &str) -> Result<()> {
        self.post_message(json!({
            "msgtype": "markdown",
            "markdown": { "content": content },
        }))
        .await
    }

    async fn upload_attachment(&self, path: &Path) -> Result<Option<String>> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let bytes = tokio::fs::read(path).await?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("media", part);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| MonitorError::Notification(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| MonitorError::Notification(e.to_string()))?;

        if body.get("errcode").and_then(Value::as_i64) == Some(0) {
            Ok(body
                .get("media_id")
                .and_then(Value::as_str)
                .map(str::to_string))
        } else {
            warn!(%body, "attachment upload rejected");
            Ok(None)
        }
    }

    async fn send_attachment(&self, attachment_id: &str) -> Result<()> {
        self.post_message(json!({
            "msgtype": "file",
            "file": { "media_id": attachment_id },
        }))
        .await
    }
}
