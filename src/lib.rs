//! Swiftea mirror synchronization and search core.
//!
//! Owns the durable local mirror of external mail and calendar stores:
//! schema and migrations, the identity engine that keeps public IDs stable
//! across upstream identifier churn, the mail and calendar sync engines,
//! the daemon controller that drives them on a schedule, the structured
//! query/FTS search surface, and the Markdown/JSON/iCalendar exporters.
//! CLI wiring, vault bootstrap, and the external system stores themselves
//! live outside this crate; they are consumed and produced through the
//! `provider` module's interfaces.

pub mod config;
pub mod error;
pub mod logging;

pub mod schema;
pub mod identity;
pub mod store;
pub mod query;
pub mod provider;

pub mod mail;
pub mod calendar;
pub mod daemon;
pub mod export;

pub use config::VaultPaths;
pub use error::CoreError;

/// Crate version, exposed for status surfaces and log lines.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize process-wide tracing. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}
