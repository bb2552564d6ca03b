//! Injected-JavaScript element operations.
//!
//! Every element operation evaluates a small self-contained script in
//! the page. Selectors are embedded as JSON string literals so quoting
//! in the selector cannot break the script. CSS and XPath resolve
//! through the same lookup helper, so visibility semantics stay
//! identical across dialects.

use chromiumoxide::Page;
use hale_engine::DriverError;
use hale_engine::driver::is_xpath;
use std::time::Duration;

/// Evaluate timeout; dialogs that slipped past the auto-accept hook
/// would otherwise hang the JS thread forever.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Retries for evaluations racing a navigation.
const MAX_CONTEXT_RETRIES: u32 = 10;
const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Errors meaning the execution context went away mid-navigation.
pub fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

/// JS expression resolving the selector to an element (or null).
fn lookup_expr(selector: &str) -> String {
    let encoded = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    if is_xpath(selector) {
        format!(
            "document.evaluate({encoded}, document, null, \
             XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
        )
    } else {
        format!("document.querySelector({encoded})")
    }
}

/// Script returning whether the selector resolves to a visible element.
pub fn visibility_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}; \
         return !!(el && (el.offsetWidth || el.offsetHeight || el.getClientRects().length)); }})()",
        lookup_expr(selector)
    )
}

/// Script clicking the element; returns false when it is missing.
pub fn click_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return false; \
         el.scrollIntoView({{block: 'center', inline: 'center'}}); \
         el.click(); return true; }})()",
        lookup_expr(selector)
    )
}

/// Script clearing the field and setting a value, firing the input and
/// change events frameworks listen on.
pub fn fill_script(selector: &str, value: &str) -> String {
    let encoded = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const el = {}; if (!el) return false; \
         el.focus(); el.value = ''; el.value = {encoded}; \
         el.dispatchEvent(new Event('input', {{bubbles: true}})); \
         el.dispatchEvent(new Event('change', {{bubbles: true}})); \
         return true; }})()",
        lookup_expr(selector)
    )
}

/// Script reading the element's text content; null when missing.
pub fn text_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = {}; return el ? el.textContent : null; }})()",
        lookup_expr(selector)
    )
}

pub async fn is_visible(page: &Page, selector: &str) -> Result<bool, DriverError> {
    evaluate(page, &visibility_script(selector)).await
}

pub async fn click(page: &Page, selector: &str) -> Result<(), DriverError> {
    let clicked: bool = evaluate(page, &click_script(selector)).await?;
    if clicked {
        Ok(())
    } else {
        Err(DriverError::Action {
            selector: selector.to_string(),
            message: "element not found".to_string(),
        })
    }
}

pub async fn fill(page: &Page, selector: &str, value: &str) -> Result<(), DriverError> {
    let filled: bool = evaluate(page, &fill_script(selector, value)).await?;
    if filled {
        Ok(())
    } else {
        Err(DriverError::Action {
            selector: selector.to_string(),
            message: "element not found".to_string(),
        })
    }
}

pub async fn text_content(page: &Page, selector: &str) -> Result<String, DriverError> {
    let text: Option<String> = evaluate(page, &text_script(selector)).await?;
    text.ok_or_else(|| DriverError::Action {
        selector: selector.to_string(),
        message: "element not found".to_string(),
    })
}

pub async fn ready_state(page: &Page) -> Result<String, DriverError> {
    evaluate(page, "document.readyState").await
}

/// Number of resource timing entries; stable across samples means the
/// network has gone quiet.
pub async fn resource_count(page: &Page) -> Result<u64, DriverError> {
    evaluate(page, "performance.getEntriesByType('resource').length").await
}

/// Evaluate an expression with a timeout and context-error retries.
/// Navigations tear the execution context down under us; retrying is
/// the only correct response.
pub async fn evaluate<T>(page: &Page, expression: &str) -> Result<T, DriverError>
where
    T: serde::de::DeserializeOwned,
{
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        let result = tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression)).await;
        match result {
            Err(_) => {
                return Err(DriverError::Other(
                    "evaluation timed out, possibly blocked by a dialog".to_string(),
                ));
            }
            Ok(Err(e)) => {
                let err_str = e.to_string();
                if is_context_error(&err_str) {
                    tracing::debug!(
                        attempt = attempt + 1,
                        "execution context unavailable, retrying"
                    );
                    last_error = Some(err_str);
                    tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
                    continue;
                }
                return Err(DriverError::Other(err_str));
            }
            Ok(Ok(remote)) => {
                return remote
                    .into_value::<T>()
                    .map_err(|e| DriverError::Other(format!("failed to read result: {e}")));
            }
        }
    }

    Err(DriverError::Other(last_error.unwrap_or_else(|| {
        "evaluation failed after context retries".to_string()
    })))
}
