//! # Memolink
//!
//! Backend for a memory graph: users keep nodes (memories with a
//! description, an optional picture, tags and a canvas position) and link
//! them together. Usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! memolink = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use memolink::config::ServerConfig;
//! use memolink::mail::LogMailer;
//! use memolink::server::{AppState, create_router};
//! use memolink::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     config,
//!     Arc::new(LogMailer),
//!     b"signing-secret",
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `memolink` binary. Disable with `default-features = false`.

pub mod auth;
pub mod blob;
pub mod config;
pub mod error;
pub mod mail;
pub mod server;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;
