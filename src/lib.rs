//! # apihub
//!
//! Account and authorization core of a multi-tenant API-management platform:
//! users, teams, apps, services, plugins, hooks and access tokens behind one
//! storage contract, usable both as a standalone server and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! apihub = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use apihub::server::{AppState, create_router};
//! use apihub::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/apihub.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), 3600));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `apihub` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod hooks;
pub mod server;
pub mod store;
pub mod types;
