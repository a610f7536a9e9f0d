//! Headless Chromium lifecycle and page acquisition.

use {
    crate::{
        detect::{detect_browser, install_instructions},
        error::ExtractError,
        session::PageSession,
    },
    async_trait::async_trait,
    chatspout_config::ExtractConfig,
    chatspout_protocol::Platform,
    chatspout_relay::{ChatFeed, ChatSource, SourceError},
    chromiumoxide::{Browser, BrowserConfig, Page},
    futures::StreamExt,
    std::{sync::Arc, time::Duration},
    tokio::{sync::Mutex, task::JoinHandle},
};

/// One Chromium process shared by every channel. Pages are cheap; browser
/// launches are not, so the engine launches once at startup and hands out
/// pages on demand.
pub struct ExtractEngine {
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    navigation_timeout: Duration,
}

impl ExtractEngine {
    /// Launch Chromium according to the extraction config.
    pub async fn launch(config: &ExtractConfig) -> Result<Arc<Self>, ExtractError> {
        let executable = detect_browser(config.chrome_path.as_deref())
            .ok_or_else(|| ExtractError::BrowserNotAvailable(install_instructions()))?;

        tracing::info!(executable = %executable.display(), headless = config.headless, "launching browser");

        let mut builder = BrowserConfig::builder();

        // chromiumoxide runs headless by default.
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .chrome_executable(&executable)
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(Duration::from_millis(config.navigation_timeout_ms));

        if let Some(agent) = &config.user_agent {
            builder = builder.arg(format!("--user-agent={agent}"));
        }

        // The 7tv extension rewrites the Twitch chat DOM into the shape the
        // extraction script expects.
        if let Some(dir) = &config.extension_dir {
            builder = builder
                .arg(format!("--disable-extensions-except={dir}"))
                .arg(format!("--load-extension={dir}"));
        }

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        builder = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox");

        let browser_config = builder
            .build()
            .map_err(ExtractError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| ExtractError::LaunchFailed(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                tracing::trace!(?event, "browser event");
            }
        });

        Ok(Arc::new(Self {
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
        }))
    }

    /// Open a fresh page and navigate it, bounded by the configured timeout.
    pub async fn open(&self, url: &str) -> Result<Page, ExtractError> {
        let page = {
            let guard = self.browser.lock().await;
            let browser = guard.as_ref().ok_or(ExtractError::BrowserClosed)?;
            browser.new_page("about:blank").await?
        };

        let navigate = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(self.navigation_timeout, navigate).await {
            Ok(Ok(())) => Ok(page),
            Ok(Err(err)) => {
                let _ = page.close().await;
                Err(ExtractError::NavigationFailed(format!("{url}: {err}")))
            }
            Err(_) => {
                let _ = page.close().await;
                Err(ExtractError::Timeout(format!(
                    "navigation to {url} exceeded {:?}",
                    self.navigation_timeout
                )))
            }
        }
    }

    /// Close the browser process. Idempotent.
    pub async fn shutdown(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                tracing::warn!(error = %err, "browser close failed");
            }
            let _ = browser.wait().await;
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl ChatSource for ExtractEngine {
    async fn acquire(
        &self,
        url: &str,
        platform: Platform,
    ) -> Result<Box<dyn ChatFeed>, SourceError> {
        let page = self.open(url).await?;
        tracing::debug!(%url, %platform, "chat page ready");
        Ok(Box::new(PageSession::new(page, platform)))
    }
}
