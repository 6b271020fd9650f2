//! # ragline-telemetry
//!
//! Logging for ragline.
//!
//! - [`init_logging`] installs the global `tracing` subscriber with an
//!   `RUST_LOG`-style filter and pretty, compact or JSON output.
//! - [`SpanCapture`] records spans and events in memory, for tests.
//!
//! ```rust,no_run
//! use ragline_telemetry::{LogFormat, LoggingConfig, init_logging};
//!
//! init_logging(&LoggingConfig::default().with_format(LogFormat::Json)).unwrap();
//! tracing::info!("ready");
//! ```

pub mod capture;
pub mod logging;

pub use capture::{CapturedEvent, CapturedSpan, SpanCapture, SpanCaptureLayer};
pub use logging::{LogFormat, LoggingConfig, build_filter, init_logging};
