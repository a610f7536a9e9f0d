//! Profile-image lookup on a channel's main page.

use {
    crate::{engine::ExtractEngine, error::ExtractError},
    chatspout_protocol::Platform,
    serde_json::Value,
};

const KICK_AVATAR_JS: &str = r#"
(() => {
    const img = document.querySelector('img#channel-avatar');
    return img ? img.getAttribute('src') : null;
})()
"#;

const TWITCH_AVATAR_JS: &str = r#"
(() => {
    const img = document.querySelector(
        'div[aria-label="Channel Avatar Picture"] img.tw-image.tw-image-avatar');
    return img ? img.getAttribute('src') : null;
})()
"#;

fn avatar_script(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Kick => Some(KICK_AVATAR_JS),
        Platform::Twitch => Some(TWITCH_AVATAR_JS),
        Platform::Twitter | Platform::Youtube => None,
    }
}

impl ExtractEngine {
    /// Visit a channel's main page and pull the avatar URL out of the DOM.
    /// The page is one-shot and closed before returning.
    pub async fn profile_image(
        &self,
        platform: Platform,
        url: &str,
    ) -> Result<String, ExtractError> {
        let script = avatar_script(platform).ok_or_else(|| {
            ExtractError::Extraction(format!("no profile support for {platform}"))
        })?;

        let page = self.open(url).await?;

        let result = async {
            let src: Value = page
                .evaluate(script)
                .await
                .map_err(|e| ExtractError::Extraction(e.to_string()))?
                .into_value()
                .map_err(|e| ExtractError::Extraction(format!("failed to get result: {e:?}")))?;

            src.as_str()
                .filter(|s| !s.is_empty())
                .map(String::from)
                .ok_or_else(|| {
                    ExtractError::Extraction(format!("no profile image found at {url}"))
                })
        }
        .await;

        if let Err(err) = page.close().await {
            tracing::debug!(error = %err, "profile page close failed");
        }

        result
    }
}
