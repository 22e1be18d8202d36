//! Web Driver implementation using Playwright
//!
//! This driver enables web browser automation testing using the Playwright library.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::driver::traits::PlatformDriver;
use crate::locator::{ElementHandle, ElementQuery};
use crate::utils::config::{BrowserType, RunConfig};

/// Visible interactive elements' labels, capped for the healing pool
const INTERACTIVE_TEXTS_JS: &str = r#"() => {
    const selector = 'button, a, input[type="submit"], input[type="button"], [role="button"], [role="link"], [role="menuitem"], [role="tab"], label, summary';
    return Array.from(document.querySelectorAll(selector))
        .filter(el => {
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            return rect.width > 0 && rect.height > 0
                && style.visibility !== 'hidden' && style.display !== 'none';
        })
        .map(el => (el.innerText || el.value || el.getAttribute('aria-label') || '').trim())
        .filter(text => text.length > 0 && text.length < 100)
        .slice(0, 100);
}"#;

const ELEMENT_TEXT_JS: &str = "el => el.value || el.innerText || el.textContent || ''";

/// Web Driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser_type: BrowserType,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl From<&RunConfig> for WebDriverConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            browser_type: config.browser,
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }
}

/// Web Driver using Playwright
pub struct WebDriver {
    // Keeps the driver process alive for the session
    _playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    _context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
}

impl WebDriver {
    /// Launch a browser and open a fresh page
    pub async fn new(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match config.browser_type {
            BrowserType::Chromium => launch_chromium_browser(&playwright.chromium(), &config).await?,
            BrowserType::Firefox => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserType::Webkit => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
        };

        let context = browser.context_builder().build().await?;
        let page = context.new_page().await?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        info!(
            "Launched {:?} (headless: {}, viewport {}x{})",
            config.browser_type, config.headless, config.viewport_width, config.viewport_height
        );

        Ok(Self {
            _playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            _context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
        })
    }
}

#[async_trait]
impl ElementQuery for WebDriver {
    async fn wait_for_visible(&self, selector: &str, timeout_ms: u64) -> Result<bool> {
        let page = self.page.lock().await;
        let result = page
            .wait_for_selector_builder(selector)
            .timeout(timeout_ms as f64)
            .wait_for_selector()
            .await;

        Ok(result.is_ok())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let page = self.page.lock().await;
        let elements = page.query_selector_all(selector).await?;
        Ok(elements.len())
    }

    async fn interactive_texts(&self) -> Result<Vec<String>> {
        let page = self.page.lock().await;
        let texts: Vec<String> = page.evaluate(INTERACTIVE_TEXTS_JS, ()).await?;
        Ok(texts)
    }
}

#[async_trait]
impl PlatformDriver for WebDriver {
    fn platform_name(&self) -> &str {
        match self.config.browser_type {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let page = self.page.lock().await;
        page.click_builder(&element.selector)
            .click()
            .await
            .with_context(|| format!("Failed to click: {}", element.selector))?;
        Ok(())
    }

    async fn double_click(&self, element: &ElementHandle) -> Result<()> {
        let page = self.page.lock().await;
        page.dblclick_builder(&element.selector)
            .dblclick()
            .await
            .with_context(|| format!("Failed to double click: {}", element.selector))?;
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        let page = self.page.lock().await;
        let Some(el) = page.query_selector(&element.selector).await? else {
            anyhow::bail!("Element disappeared before fill: {}", element.selector);
        };
        el.fill_builder(value).fill().await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.click_builder(&element.selector).click().await?;
        page.keyboard.input_text(text).await?;
        Ok(())
    }

    async fn press_key(&self, element: Option<&ElementHandle>, key: &str) -> Result<()> {
        let page = self.page.lock().await;
        if let Some(element) = element {
            page.evaluate_on_selector::<String, ()>(&element.selector, "el => el.focus()", None)
                .await?;
        }
        page.keyboard.down(key).await?;
        page.keyboard.up(key).await?;
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> Result<()> {
        let page = self.page.lock().await;
        page.evaluate_on_selector::<String, ()>(
            &element.selector,
            "el => ['mouseover', 'mouseenter', 'mousemove'].forEach(type => el.dispatchEvent(new MouseEvent(type, { bubbles: true })))",
            None,
        )
        .await?;
        Ok(())
    }

    async fn set_checked(&self, element: &ElementHandle, checked: bool) -> Result<()> {
        let page = self.page.lock().await;
        let js = if checked {
            "el => { if (!el.checked) el.click(); }"
        } else {
            "el => { if (el.checked) el.click(); }"
        };
        page.evaluate_on_selector::<String, ()>(&element.selector, js, None)
            .await?;
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, value: &str) -> Result<()> {
        let page = self.page.lock().await;
        let js = "(el, value) => {
            const option = Array.from(el.options || []).find(o => o.value === value || o.label === value);
            if (!option) return false;
            el.value = option.value;
            el.dispatchEvent(new Event('input', { bubbles: true }));
            el.dispatchEvent(new Event('change', { bubbles: true }));
            return true;
        }";
        let selected: bool = page
            .evaluate_on_selector::<String, bool>(&element.selector, js, Some(value.to_string()))
            .await?;
        if !selected {
            anyhow::bail!("Option '{}' not found in {}", value, element.selector);
        }
        Ok(())
    }

    async fn element_text(&self, element: &ElementHandle) -> Result<String> {
        let page = self.page.lock().await;
        let text: String = page
            .evaluate_on_selector::<String, String>(&element.selector, ELEMENT_TEXT_JS, None)
            .await?;
        Ok(text)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let page = self.page.lock().await;
        match page.query_selector(selector).await? {
            Some(el) => Ok(el.is_visible().await?),
            None => Ok(false),
        }
    }

    async fn wait_for_hidden(&self, selector: &str, timeout_ms: u64) -> Result<bool> {
        let start = std::time::Instant::now();

        while start.elapsed().as_millis() < timeout_ms as u128 {
            if !self.is_visible(selector).await? {
                return Ok(true);
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        }

        Ok(false)
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page.lock().await;
        let url: String = page.evaluate("() => window.location.href", ()).await?;
        Ok(url)
    }

    async fn title(&self) -> Result<String> {
        let page = self.page.lock().await;
        let title: String = page.evaluate("() => document.title", ()).await?;
        Ok(title)
    }

    async fn take_screenshot(&self, path: &Path) -> Result<()> {
        let page = self.page.lock().await;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        page.screenshot_builder()
            .path(path.to_path_buf())
            .screenshot()
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing {} browser", self.platform_name());
        self.browser.close().await?;
        Ok(())
    }
}

/// Launch Chromium with the sandbox flags CI containers need
async fn launch_chromium_browser(
    chromium: &playwright::api::BrowserType,
    config: &WebDriverConfig,
) -> Result<Browser> {
    let mut launcher = chromium.launcher();
    launcher = launcher.headless(config.headless);

    let env_path = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH")
        .ok()
        .map(std::path::PathBuf::from);
    if let Some(ref path) = env_path {
        info!("Using browser from env: {}", path.display());
        launcher = launcher.executable(path);
    }

    let args: Vec<String> = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--ignore-certificate-errors",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let browser = launcher
        .args(&args)
        .launch()
        .await
        .context("Failed to launch Chromium")?;
    Ok(browser)
}
