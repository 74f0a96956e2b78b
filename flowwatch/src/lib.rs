//! Trading-hours tooltip harvesting for a rendered dashboard chart
//!
//! This crate drives a browser over WebDriver, locates one specific chart
//! canvas on the page, hovers a fixed set of points on it and appends the
//! tooltip texts it finds to a JSON history log, but only while the market's
//! trading window is open.
//!
//! ```text
//! Scheduler ──▶ calendar::decide ──closed──▶ Clock::sleep_until(boundary)
//!     │                 └──open──▶ SnapshotCollector ──▶ ExtractionSession (per point)
//!     └──────────────────────────────────────▶ HistoryStore::append
//! ```

pub mod calendar;
pub mod clock;
pub mod collector;
pub mod config;
pub mod engine;
pub mod errors;
pub mod history;
pub mod scheduler;
pub mod session;
pub mod snapshot;
pub mod webdriver;

pub use calendar::{GateDecision, GateState};
pub use clock::{Clock, SystemClock};
pub use collector::SnapshotCollector;
pub use config::{BrowserOptions, ChartTarget, HarvestConfig, PopupDismissal};
pub use engine::{BrowserEngine, ElementRef, ElementSize};
pub use errors::HarvestError;
pub use history::HistoryStore;
pub use scheduler::{Scheduler, Tick};
pub use session::ExtractionSession;
pub use snapshot::{ChartPoint, Snapshot};
pub use webdriver::WebDriverClient;
