//! Unsubscriber Library
//!
//! A Rust library for cleaning up newsletter subscriptions in an IMAP
//! mailbox. This library provides functionality to:
//!
//! - Search a mailbox for messages mentioning "unsubscribe"
//! - Decode their HTML parts and extract unsubscribe links
//! - Group links by the sending service's registrable domain
//! - Visit one representative link per service
//! - Save the link list and a per-service table for spreadsheets
//!
//! # Example
//!
//! ```rust,no_run
//! use unsubscriber::extract::extract_unsubscribe_links;
//! use unsubscriber::services::group_links;
//!
//! let html = r#"<a href="https://news.example.com/unsubscribe?id=1">Unsubscribe</a>"#;
//! let grouping = group_links(extract_unsubscribe_links(html));
//!
//! for entry in grouping.services.entries() {
//!     println!("{} -> {}", entry.display_name, entry.representative_url);
//! }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod domain_utils;
pub mod errors;
pub mod extract;
pub mod facade;
pub mod logging;
pub mod mailbox;
pub mod message;
pub mod report;
pub mod services;
pub mod styled_output;
pub mod summary;
pub mod visit;

// Re-export commonly used types and functions for convenience
pub use errors::{Result, UnsubscriberError};
pub use extract::extract_unsubscribe_links;
pub use facade::{RunOptions, Unsubscriber};
pub use mailbox::{Credentials, MailConnection, MailTransport};
pub use services::{ServiceEntry, ServiceMap, group_links};
pub use styled_output::StyledFormatter;
pub use summary::RunSummary;
pub use visit::{HttpProbe, ReqwestProbe};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
