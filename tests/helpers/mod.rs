#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tessera::db::SqliteStore;
use tessera::dispatch;
use tessera::engine::{EngineContext, EngineSettings};
use tessera::error::WireError;
use tessera::frame::store::{
    FramePage, FrameStore, FtsQuery, ImageStore, ListOptions, StoreError,
};
use tessera::frame::types::{Frame, ImageAttachment, StatusSnapshot};
use tessera::policy::Policy;
use tessera::tools::ToolOutput;

pub const POLICY_JSON: &str = r#"{
    "modules": {
        "mod/x": {"description": "Module X", "allowed_callers": ["mod/y"]},
        "mod/y": {"description": "Module Y"},
        "services/auth": {"description": "Authentication", "allowed_callers": ["ui/login"], "forbidden_callers": ["mod/x"]},
        "ui/login": {"description": "Login screen"}
    },
    "aliases": {"auth": "services/auth", "login": "ui/login"}
}"#;

pub fn test_policy() -> Policy {
    Policy::from_json(POLICY_JSON, Path::new("test.policy.json")).unwrap()
}

/// Settings with no repository context, so the branch is always explicit or "unknown".
pub fn test_settings() -> EngineSettings {
    EngineSettings::default()
}

/// An engine over a fresh in-memory store, with the test policy loaded.
pub fn test_engine() -> EngineContext {
    engine_with(test_settings(), Some(test_policy()))
}

/// An engine over a fresh in-memory store in unchecked mode.
pub fn unchecked_engine() -> EngineContext {
    engine_with(test_settings(), None)
}

pub fn engine_with(settings: EngineSettings, policy: Option<Policy>) -> EngineContext {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    EngineContext::new(settings, store.clone(), store, policy).unwrap()
}

pub fn engine_with_stores(
    settings: EngineSettings,
    store: Arc<dyn FrameStore>,
    images: Arc<dyn ImageStore>,
) -> EngineContext {
    EngineContext::new(settings, store, images, Some(test_policy())).unwrap()
}

pub async fn call(ctx: &EngineContext, tool: &str, args: Value) -> Result<ToolOutput, WireError> {
    dispatch::call_tool(ctx, tool, args).await
}

/// Call a tool that is expected to succeed and return its `data` payload.
pub async fn call_ok(ctx: &EngineContext, tool: &str, args: Value) -> Value {
    match call(ctx, tool, args).await {
        Ok(output) => output.data.unwrap_or(Value::Null),
        Err(e) => panic!("{tool} failed: {} {}", e.code, e.message),
    }
}

/// Call a tool that is expected to fail and return the wire error.
pub async fn call_err(ctx: &EngineContext, tool: &str, args: Value) -> WireError {
    match call(ctx, tool, args).await {
        Ok(output) => panic!("{tool} unexpectedly succeeded: {}", output.joined_text()),
        Err(e) => e,
    }
}

/// Minimal valid `frame_create` arguments.
pub fn create_args(reference_point: &str, modules: &[&str]) -> Value {
    json!({
        "summary_caption": format!("Working on {reference_point}"),
        "reference_point": reference_point,
        "status_snapshot": {"next_action": "keep going"},
        "module_scope": modules,
        "branch": "main",
    })
}

pub fn with_field(mut args: Value, key: &str, value: Value) -> Value {
    args[key] = value;
    args
}

pub fn frame_count(ctx: &EngineContext) -> u64 {
    ctx.store.frame_count().unwrap()
}

/// Insert a frame directly with a controlled timestamp.
pub fn seed_frame(
    store: &dyn FrameStore,
    id: &str,
    timestamp: &str,
    branch: &str,
    jira: Option<&str>,
    modules: &[&str],
) -> Frame {
    let frame = Frame {
        id: id.to_string(),
        timestamp: timestamp.to_string(),
        branch: branch.to_string(),
        jira: jira.map(str::to_string),
        module_scope: modules.iter().map(|m| m.to_string()).collect(),
        summary_caption: format!("summary {id}"),
        reference_point: format!("reference {id}"),
        status_snapshot: StatusSnapshot {
            next_action: "next".into(),
            ..Default::default()
        },
        keywords: None,
        atlas_frame_id: None,
        image_ids: vec![],
    };
    store.save_frame(&frame).unwrap();
    frame
}

/// `2026-03-01T00:MM:00.000000Z` for minute `n`: increasing with `n`.
pub fn minute(n: u32) -> String {
    format!("2026-03-01T{:02}:{:02}:00.000000Z", n / 60, n % 60)
}

pub fn png() -> Value {
    json!({"data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk", "mime_type": "image/png"})
}

pub fn ids(frames: &Value) -> Vec<String> {
    frames
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_str().unwrap().to_string())
        .collect()
}

/// A frame store whose full-text backend rejects every query as malformed.
pub struct MalformedFtsStore {
    pub inner: SqliteStore,
}

impl MalformedFtsStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().unwrap(),
        }
    }
}

impl FrameStore for MalformedFtsStore {
    fn save_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        self.inner.save_frame(frame)
    }
    fn get_frame_by_id(&self, id: &str) -> Result<Option<Frame>, StoreError> {
        self.inner.get_frame_by_id(id)
    }
    fn delete_frame(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_frame(id)
    }
    fn list_frames(&self, options: &ListOptions) -> Result<FramePage, StoreError> {
        self.inner.list_frames(options)
    }
    fn search_frames(&self, _query: &FtsQuery) -> Result<Vec<Frame>, StoreError> {
        Err(StoreError::MalformedQuery("fts5: syntax error near \"(\"".into()))
    }
    fn frame_count(&self) -> Result<u64, StoreError> {
        self.inner.frame_count()
    }
}

/// An image store that delegates to a real store but fails the `fail_at`-th
/// attachment (0-based) while `failing` is set.
pub struct FlakyImageStore {
    pub inner: Arc<SqliteStore>,
    pub fail_at: usize,
    pub failing: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyImageStore {
    pub fn new(inner: Arc<SqliteStore>, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            failing: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

impl ImageStore for FlakyImageStore {
    fn store_image(&self, frame_id: &str, image: &ImageAttachment) -> Result<String, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) && call == self.fail_at {
            return Err(StoreError::Backend("disk quota exceeded".into()));
        }
        self.inner.store_image(frame_id, image)
    }
    fn delete_images_for_frame(&self, frame_id: &str) -> Result<usize, StoreError> {
        self.inner.delete_images_for_frame(frame_id)
    }
    fn image_count(&self) -> Result<u64, StoreError> {
        self.inner.image_count()
    }
}
