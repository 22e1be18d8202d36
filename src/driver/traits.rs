use crate::locator::{ElementHandle, ElementQuery};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Browser automation interface used by the web runner
///
/// Element actions take an [`ElementHandle`] that the locator has already
/// resolved, so implementations never need to know about self-healing.
/// Lookups used by the healing cascade come from the [`ElementQuery`]
/// supertrait.
#[async_trait]
pub trait PlatformDriver: ElementQuery {
    /// Get the platform name (e.g., "chromium", "firefox")
    fn platform_name(&self) -> &str;

    /// Navigate the page to an absolute URL
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn double_click(&self, element: &ElementHandle) -> Result<()>;

    /// Replace the element's value
    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()>;

    /// Focus the element and type text key by key
    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// Press a key, on the focused element when `element` is `None`
    async fn press_key(&self, element: Option<&ElementHandle>, key: &str) -> Result<()>;

    async fn hover(&self, element: &ElementHandle) -> Result<()>;

    /// Bring a checkbox to the requested state
    async fn set_checked(&self, element: &ElementHandle, checked: bool) -> Result<()>;

    async fn select_option(&self, element: &ElementHandle, value: &str) -> Result<()>;

    /// Value or rendered text of the element
    async fn element_text(&self, element: &ElementHandle) -> Result<String>;

    /// Check visibility right now, without waiting
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Wait until nothing visible matches `selector`
    async fn wait_for_hidden(&self, selector: &str, timeout_ms: u64) -> Result<bool>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    async fn take_screenshot(&self, path: &Path) -> Result<()>;

    /// Tear down the browser
    async fn close(&self) -> Result<()>;
}
