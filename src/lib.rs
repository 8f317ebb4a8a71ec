//! Library exports for the server binary, the terminal client and tests.
/// Application directory resolution.
pub mod app_dirs;
/// Dataset and model catalog.
pub mod catalog;
/// Panel configuration stored as TOML.
pub mod config;
/// Wire-level error codes shared by the server and clients.
pub mod errors;
/// Filesystem helpers shared by the stores.
pub mod fs_ops;
/// External script invocation.
pub mod gateway;
/// Shared blocking HTTP client.
pub mod http_client;
/// Training run identity tokens.
pub mod identity;
/// Tracing setup.
pub mod logging;
/// Comparison request building and result handling.
pub mod orchestrator;
/// Compare selection slots.
pub mod selection;
/// HTTP surface.
pub mod server;
/// Filesystem-backed run and compare records.
pub mod store;
