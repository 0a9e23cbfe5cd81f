//! Work-context frames for AI coding agents, served over MCP.
//!
//! Tessera lets an agent capture a *frame* (what it was doing, on which branch and
//! modules, and what comes next) and find it again later. The protocol engine is
//! transport-free: [`dispatch::handle`] takes a method name and JSON params and
//! returns a JSON result or a structured error. [`server`] hosts it over stdio with
//! rmcp.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with an FTS5 index over reference point, summary and keywords
//! - **Idempotency**: `frame_create` calls carrying a `request_id` are cached for 24h,
//!   with a per-key lock so concurrent retries create one frame
//! - **Queries**: full-text first, then exact `jira`, then exact `branch`; filtered
//!   queries scan a bounded window of recent frames
//! - **Policy**: an optional module policy resolves module aliases and rejects
//!   unknown module ids
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`engine`]: the explicit context every dispatch runs against
//! - [`dispatch`]: `initialize` / `tools/list` / `tools/call`
//! - [`tools`]: the tool catalog, alias table and handlers
//! - [`frame`]: frame model, store contracts and the query engine
//! - [`error`]: error codes and the wire-error mapper
//! - [`db`]: the SQLite frame and image store

pub mod branch;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod frame;
pub mod idempotency;
pub mod policy;
pub mod server;
pub mod tools;
