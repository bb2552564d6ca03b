//! WebDriver driver over a remote endpoint.
//!
//! Talks W3C WebDriver through fantoccini, so any browser with a
//! driver binary (chromedriver, geckodriver, safaridriver) works. A
//! WebDriver session has no recording channel; sessions under this
//! driver run without video and the lifecycle degrades gracefully.

pub mod caps;
pub mod driver;

pub use driver::WdDriver;
