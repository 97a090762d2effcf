// ABOUTME: Main library entry point for the Pin & Freeze capture core.
// ABOUTME: Re-exports the public API: Client, CaptureResult, CaptureError, selectors, settings, pins and history.

//! Pin & Freeze - capture a page's rendered HTML and keep it as a static snapshot.
//!
//! The core fetches a document (falling back to the loopback address with the
//! original host headers when the public host is unreachable) and extracts the
//! inner HTML of the elements matched by a typed selector contract.
//!
//! # Example
//!
//! ```no_run
//! use pinfreeze_core::{CaptureError, Client, SelectorContract};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CaptureError> {
//!     let client = Client::builder().build();
//!     let selector = SelectorContract::class("site-main")?;
//!     let result = client.capture("https://example.com/", &selector).await?;
//!     println!("{} ({})", result.html, result.origin);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod extract;
pub mod formats;
pub mod history;
pub mod options;
pub mod pin;
pub mod resource;
pub mod selector;
pub mod settings;

pub use crate::client::{CaptureResult, Client};
pub use crate::error::{CaptureError, ErrorCode, FetchFailure};
pub use crate::extract::extract;
pub use crate::history::{History, HistoryError, MemorySnapshotStore, Snapshot, SnapshotStore};
pub use crate::options::{ClientBuilder, Options};
pub use crate::pin::{PostPin, render_pinned_block, sanitize_pinned_blocks, save_post_pin};
pub use crate::resource::{fetch_document, FetchOptions, FetchOrigin, FetchResult};
pub use crate::selector::{Selector, SelectorContract, SelectorKind};
pub use crate::settings::{SelectorSource, Settings};

/// Result alias for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;
