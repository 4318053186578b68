//! Page-level interactions and DOM serialization.
//!
//! `PageController` wraps a single `chromiumoxide::Page` with the step
//! vocabulary `harness_common::scenario::Step` needs: navigation, element
//! interaction resolved from a `Selector`, and the recursive DOM-to-JSON
//! snapshot the comparison facade diffs (Section 3, Section 4.F).

use std::time::{Duration, Instant};

use chromiumoxide::Page;
use harness_common::model::{ScreenshotImage, SerializedNode};
use harness_common::scenario::{Selector, SelectorStrategy};
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Recursively walks `document.body`, producing the `SerializedNode` shape
/// over the wire: `{type, tagName, attributes, children}` for elements,
/// `{type, content}` for text/comment nodes. Whitespace-only text nodes are
/// kept here; `diff_engine::dom_diff` is the layer that drops them by config.
fn dom_snapshot_script() -> &'static str {
    r#"(function serialize(node) {
        function walk(n) {
            if (n.nodeType === Node.TEXT_NODE) {
                return { type: 'text', content: n.textContent || '' };
            }
            if (n.nodeType === Node.COMMENT_NODE) {
                return { type: 'comment', content: n.textContent || '' };
            }
            const attributes = {};
            for (const attr of n.attributes || []) {
                attributes[attr.name] = attr.value;
            }
            const children = [];
            for (const child of n.childNodes) {
                if (child.nodeType === Node.ELEMENT_NODE
                    || child.nodeType === Node.TEXT_NODE
                    || child.nodeType === Node.COMMENT_NODE) {
                    children.push(walk(child));
                }
            }
            return {
                type: 'element',
                tagName: n.tagName.toLowerCase(),
                attributes,
                children,
            };
        }
        return walk(node);
    })(document.body)"#
}

pub struct PageController {
    page: Page,
    default_timeout: Duration,
}

impl PageController {
    pub fn new(page: Page) -> Self {
        Self { page, default_timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn navigate(&self, url: &str) -> RunnerResult<()> {
        debug!("navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| RunnerError::Navigation(format!("failed to navigate to {}: {}", url, e)))?;
        Ok(())
    }

    pub async fn wait_for_selector(&self, selector: &str) -> RunnerResult<()> {
        let deadline = Instant::now() + self.default_timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RunnerError::Timeout {
                    condition: "elementVisible".to_string(),
                    details: selector.to_string(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Resolve a `Selector` to a CSS string. `TestId`/`Role` map to attribute
    /// selectors; `XPath` is resolved to an equivalent CSS path at runtime
    /// via `document.evaluate`, since chromiumoxide only finds by CSS.
    pub async fn selector_to_css(&self, selector: &Selector) -> RunnerResult<String> {
        if let Some(css) = selector.css_value() {
            return Ok(css.to_string());
        }
        match selector {
            Selector::Strategy { strategy: SelectorStrategy::TestId, value, .. } => {
                Ok(format!("[data-testid=\"{}\"]", value))
            }
            Selector::Strategy { strategy: SelectorStrategy::Role, value, name, .. } => match name {
                Some(name) => Ok(format!("[role=\"{}\"][aria-label=\"{}\"]", value, name)),
                None => Ok(format!("[role=\"{}\"]", value)),
            },
            Selector::Strategy { strategy: SelectorStrategy::XPath, value, .. } => {
                self.xpath_to_css(value).await
            }
            _ => unreachable!("css_value() covers the Css strategy and Plain variant"),
        }
    }

    async fn xpath_to_css(&self, xpath: &str) -> RunnerResult<String> {
        let escaped = xpath.replace('\\', "\\\\").replace('"', "\\\"");
        let script = format!(
            r#"(function() {{
                const el = document.evaluate("{escaped}", document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
                if (!el) return null;
                if (el.id) return '#' + el.id;
                let path = [];
                let current = el;
                while (current && current.nodeType === Node.ELEMENT_NODE) {{
                    let sel = current.nodeName.toLowerCase();
                    if (current.id) {{ path.unshift('#' + current.id); break; }}
                    let sib = current, nth = 1;
                    while (sib = sib.previousElementSibling) {{
                        if (sib.nodeName.toLowerCase() == sel) nth++;
                    }}
                    if (nth != 1) sel += ':nth-of-type(' + nth + ')';
                    path.unshift(sel);
                    current = current.parentNode;
                }}
                return path.join(' > ') || null;
            }})()"#
        );
        let result = self.execute_script(&script).await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| RunnerError::ElementNotFound { selector: format!("xpath: {}", xpath) })
    }

    /// Find an element, retrying at `POLL_INTERVAL` until `default_timeout`
    /// elapses. No selector-fallback chain - scenarios carry one selector per
    /// step, unlike the teacher's self-healing `SmartSelector`.
    async fn find_element(&self, selector: &Selector) -> RunnerResult<chromiumoxide::Element> {
        let css = self.selector_to_css(selector).await?;
        let deadline = Instant::now() + self.default_timeout;
        loop {
            if let Ok(element) = self.page.find_element(&css).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(RunnerError::ElementNotFound { selector: css });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn click(&self, selector: &Selector) -> RunnerResult<()> {
        let element = self.find_element(selector).await?;
        element
            .click()
            .await
            .map_err(|e| RunnerError::Interaction(format!("click failed: {}", e)))?;
        Ok(())
    }

    pub async fn type_text(&self, selector: &Selector, text: &str, clear_first: bool) -> RunnerResult<()> {
        let element = self.find_element(selector).await?;
        if clear_first {
            element
                .click()
                .await
                .map_err(|e| RunnerError::Interaction(format!("click before type failed: {}", e)))?;
            self.page.evaluate("document.execCommand('selectAll', false, null)").await.ok();
        }
        element
            .type_str(text)
            .await
            .map_err(|e| RunnerError::Interaction(format!("type failed: {}", e)))?;
        Ok(())
    }

    pub async fn hover(&self, selector: &Selector) -> RunnerResult<()> {
        let element = self.find_element(selector).await?;
        element
            .scroll_into_view()
            .await
            .map_err(|e| RunnerError::Interaction(format!("scroll failed: {}", e)))?;
        element
            .focus()
            .await
            .map_err(|e| RunnerError::Interaction(format!("hover/focus failed: {}", e)))?;
        Ok(())
    }

    pub async fn scroll(&self, selector: Option<&Selector>, dx: i32, dy: i32) -> RunnerResult<()> {
        match selector {
            Some(sel) => {
                self.find_element(sel).await?;
            }
            None => {
                let script = format!("window.scrollBy({}, {})", dx, dy);
                self.execute_script(&script).await?;
            }
        }
        Ok(())
    }

    pub async fn select(&self, selector: &Selector, value: &str) -> RunnerResult<()> {
        let css = self.selector_to_css(selector).await?;
        let escaped_css = css.replace('\'', "\\'");
        let escaped_value = value.replace('\'', "\\'");
        let script = format!(
            "(function() {{
                const el = document.querySelector('{escaped_css}');
                if (!el) return false;
                el.value = '{escaped_value}';
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"
        );
        let result = self.execute_script(&script).await?;
        if result.as_bool() == Some(false) {
            return Err(RunnerError::ElementNotFound { selector: css });
        }
        Ok(())
    }

    pub async fn key_press(&self, key: &str, modifiers: &[String]) -> RunnerResult<()> {
        let script = format!(
            "document.dispatchEvent(new KeyboardEvent('keydown', {{
                key: '{}',
                ctrlKey: {},
                altKey: {},
                shiftKey: {},
                metaKey: {},
            }}))",
            key.replace('\'', "\\'"),
            modifiers.iter().any(|m| m == "ctrl"),
            modifiers.iter().any(|m| m == "alt"),
            modifiers.iter().any(|m| m == "shift"),
            modifiers.iter().any(|m| m == "meta"),
        );
        self.execute_script(&script).await?;
        Ok(())
    }

    pub async fn get_url(&self) -> RunnerResult<String> {
        let result = self
            .page
            .evaluate("window.location.href")
            .await
            .map_err(|e| RunnerError::Navigation(format!("failed to read url: {}", e)))?;
        result
            .into_value::<String>()
            .map_err(|e| RunnerError::Navigation(format!("failed to parse url: {}", e)))
    }

    pub async fn extract_text(&self, selector: &Selector) -> RunnerResult<String> {
        let element = self.find_element(selector).await?;
        element
            .inner_text()
            .await
            .map_err(|e| RunnerError::Interaction(format!("text extraction failed: {}", e)))?
            .ok_or_else(|| RunnerError::Interaction("element has no text content".to_string()))
    }

    pub async fn execute_script(&self, script: &str) -> RunnerResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| RunnerError::Interaction(format!("script execution failed: {}", e)))?;
        Ok(result.into_value::<serde_json::Value>().unwrap_or(serde_json::Value::Null))
    }

    pub async fn screenshot(&self) -> RunnerResult<Vec<u8>> {
        self.page
            .screenshot(chromiumoxide::page::ScreenshotParams::default())
            .await
            .map_err(|e| RunnerError::Interaction(format!("screenshot failed: {}", e)))
    }

    /// Capture a `ScreenshotImage`, decoding dimensions from the PNG header
    /// via the `image` crate so callers never have to re-decode.
    pub async fn screenshot_image(&self) -> RunnerResult<ScreenshotImage> {
        let bytes = self.screenshot().await?;
        let (width, height) = image::load_from_memory(&bytes)
            .map(|img| {
                use image::GenericImageView;
                img.dimensions()
            })
            .unwrap_or((0, 0));
        Ok(ScreenshotImage { width, height, bytes })
    }

    /// Serialize the live DOM into the shared `SerializedNode` tree.
    pub async fn snapshot_dom(&self) -> RunnerResult<SerializedNode> {
        let value = self.execute_script(dom_snapshot_script()).await?;
        serde_json::from_value(value).map_err(|e| RunnerError::DomSerialization(e.to_string()))
    }

    pub async fn assert_element_text(&self, selector: &Selector, expected: &str) -> RunnerResult<()> {
        let actual = self.extract_text(selector).await?;
        if actual.trim() != expected.trim() {
            return Err(RunnerError::Interaction(format!(
                "expected element text {:?}, found {:?}",
                expected, actual
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_common::scenario::Selector;

    #[test]
    fn css_selector_passes_through() {
        let selector = Selector::css("#login-btn");
        assert_eq!(selector.css_value(), Some("#login-btn"));
    }

    #[test]
    fn plain_selector_is_treated_as_css() {
        let selector = Selector::Plain("#login-btn".to_string());
        assert_eq!(selector.css_value(), Some("#login-btn"));
    }
}
