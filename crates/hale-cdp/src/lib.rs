//! Chromium driver over the Chrome DevTools Protocol.
//!
//! Drives a locally launched Chromium through chromiumoxide. Element
//! operations run as injected JavaScript against the live DOM, which
//! keeps visibility semantics identical for CSS and XPath selectors.
//! Session video is recorded through the CDP screencast as an MJPEG
//! stream.

pub mod client;
pub mod driver;
pub mod js;
pub mod recorder;

pub use driver::CdpDriver;
