/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - The SQLite crime table and its live queries (store.rs, live.rs)
/// - The background write worker (worker.rs)
/// - The repository and the context that owns it (repository.rs, context.rs)
/// - Per-screen view-models (list_model.rs, detail_model.rs)
/// - Configuration and errors (config.rs, error.rs)

pub mod config;
pub mod context;
pub mod data;
pub mod detail_model;
pub mod error;
pub mod list_model;
pub mod live;
pub mod repository;
pub mod store;
pub mod worker;
