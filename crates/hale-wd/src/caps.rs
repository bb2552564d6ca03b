//! W3C capability maps per browser variant.

use hale_core::config::BrowserVariant;
use hale_engine::LaunchOptions;
use serde_json::{Map, Value, json};

/// Capabilities for a new session of the given variant. Launch args
/// only reach Chromium; Firefox takes its own headless switch and
/// safaridriver accepts no arguments at all.
pub fn capabilities(variant: BrowserVariant, opts: &LaunchOptions) -> Map<String, Value> {
    let mut caps = Map::new();
    match variant {
        BrowserVariant::Chromium => {
            let mut args = opts.args.clone();
            if opts.headless {
                args.push("--headless=new".to_string());
            }
            caps.insert("browserName".to_string(), json!("chrome"));
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserVariant::Firefox => {
            let mut args: Vec<String> = Vec::new();
            if opts.headless {
                args.push("-headless".to_string());
            }
            caps.insert("browserName".to_string(), json!("firefox"));
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
        BrowserVariant::Webkit => {
            caps.insert("browserName".to_string(), json!("safari"));
        }
    }
    caps
}
