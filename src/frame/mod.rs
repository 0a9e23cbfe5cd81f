pub mod contradictions;
pub mod query;
pub mod stats;
pub mod store;
pub mod timeline;
pub mod turncost;
pub mod types;

/// Current UTC time in the frame timestamp format (RFC 3339, microseconds, `Z`).
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
