//! FIKL runtime: configuration, logging, output devices and query sessions
//! on top of [`fikl_core`].
//!
//! # Example
//!
//! ```rust
//! use fikl::{FiklConfig, Session};
//! use fikl_core::InMemoryStore;
//! use serde_json::json;
//!
//! let store = InMemoryStore::new();
//! store.insert("users/ann", json!({"name": "Ann", "age": 31})).unwrap();
//!
//! let session = Session::new(store, &FiklConfig::default());
//! let text = session.run_to_string("select name from users output csv").unwrap();
//! assert_eq!(text, "name\nAnn\n");
//! ```

pub mod config;
pub mod logging;
pub mod session;
pub mod sink;

pub use config::{FiklConfig, LimitsConfig, LoggingConfig, OutputConfig};
pub use fikl_core::{QueryError, QueryOutput};
pub use logging::init_tracing;
pub use session::Session;
pub use sink::{ClipboardSink, ClipboardWriter, DeviceSink, FileSink, MemoryClipboard};
