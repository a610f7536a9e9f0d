//! A live chat page bound to one channel.

use {
    crate::{
        error::ExtractError,
        script::{chat_script, parse_rows},
    },
    async_trait::async_trait,
    chatspout_protocol::{ChatEntry, Platform},
    chatspout_relay::{ChatFeed, SourceError},
    chromiumoxide::Page,
    serde_json::Value,
};

/// One navigated chat page. Polling evaluates the platform's extraction
/// script against the live DOM; release closes the page (the browser stays
/// up for other channels).
pub struct PageSession {
    page: Option<Page>,
    platform: Platform,
}

impl PageSession {
    pub(crate) fn new(page: Page, platform: Platform) -> Self {
        Self {
            page: Some(page),
            platform,
        }
    }

    async fn evaluate_rows(&self) -> Result<Vec<ChatEntry>, ExtractError> {
        let page = self.page.as_ref().ok_or(ExtractError::BrowserClosed)?;
        let script = chat_script(self.platform).ok_or_else(|| {
            ExtractError::Extraction(format!("no extraction script for {}", self.platform))
        })?;

        let rows: Value = page
            .evaluate(script)
            .await
            .map_err(|e| ExtractError::Extraction(e.to_string()))?
            .into_value()
            .map_err(|e| ExtractError::Extraction(format!("failed to get result: {e:?}")))?;

        Ok(parse_rows(&rows))
    }
}

#[async_trait]
impl ChatFeed for PageSession {
    async fn poll(&mut self) -> Result<Vec<ChatEntry>, SourceError> {
        Ok(self.evaluate_rows().await?)
    }

    async fn release(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(err) = page.close().await {
                tracing::debug!(error = %err, platform = %self.platform, "page close failed");
            }
        }
    }
}
