//! `frame_create`: validate, resolve modules, persist, attach images.
//!
//! With a `request_id` the call is idempotent: the first success is cached for the
//! cache TTL and replayed verbatim for the same key. Concurrent calls with one key
//! serialize on a per-key lock, so the second sees the first's result. Failures are
//! never cached.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::{ErrorCode, ToolError};
use crate::frame::now_timestamp;
use crate::frame::store::{FrameStore, ImageStore};
use crate::frame::types::{Frame, ImageAttachment, StatusSnapshot};

use super::{non_blank, parse_args, validation, ToolOutput};

/// Parameters for `frame_create` (and `frame_validate`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameCreateParams {
    #[schemars(description = "One-line summary of the current state of work")]
    pub summary_caption: String,

    #[schemars(description = "Free-text anchor for this frame; the primary full-text search subject")]
    pub reference_point: String,

    #[schemars(description = "Where the work stands: next_action is required")]
    pub status_snapshot: StatusSnapshot,

    #[schemars(description = "Module ids this work touches. Aliases are resolved to canonical ids when a policy is loaded.")]
    pub module_scope: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Branch name. Defaults to the configured default branch or the repository HEAD.")]
    pub branch: Option<String>,

    #[serde(default)]
    #[schemars(description = "Jira ticket id, e.g. 'PROJ-123'")]
    pub jira: Option<String>,

    #[serde(default)]
    #[schemars(description = "Extra search keywords")]
    pub keywords: Option<Vec<String>>,

    #[serde(default)]
    #[schemars(description = "Id of a related atlas frame")]
    pub atlas_frame_id: Option<String>,

    #[serde(default)]
    #[schemars(description = "Image attachments: [{data, mime_type}]")]
    pub images: Option<Vec<ImageAttachment>>,

    #[serde(default)]
    #[schemars(description = "Idempotency key. Retries with the same key return the first successful response.")]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct Created {
    frame_id: String,
    timestamp: String,
    branch: String,
    module_scope: Vec<String>,
    image_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let request_id = args
        .get("request_id")
        .and_then(Value::as_str)
        .and_then(|key| non_blank(Some(key)))
        .map(str::to_string);

    let Some(key) = request_id else {
        return create(ctx, args).await;
    };

    let _in_flight = ctx.cache.lock_key(&key).await;
    if let Some(cached) = ctx.cache.get_cached(&key) {
        tracing::info!(request_id = %key, "frame_create replayed from idempotency cache");
        return Ok(cached);
    }

    let output = create(ctx, args).await?;
    ctx.cache.set_cached(&key, output.clone());
    Ok(output)
}

async fn create(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: FrameCreateParams = parse_args(args)?;
    let checked = validation::validate(&params, ctx.policy())?;

    let frame = Frame {
        id: uuid::Uuid::now_v7().to_string(),
        timestamp: now_timestamp(),
        branch: ctx.resolve_branch(params.branch.as_deref()),
        jira: non_blank(params.jira.as_deref()).map(str::to_string),
        module_scope: checked.module_scope,
        summary_caption: params.summary_caption,
        reference_point: params.reference_point,
        status_snapshot: params.status_snapshot,
        keywords: params.keywords,
        atlas_frame_id: non_blank(params.atlas_frame_id.as_deref()).map(str::to_string),
        image_ids: Vec::new(),
    };
    let images = params.images.unwrap_or_default();

    tracing::info!(
        frame_id = %frame.id,
        branch = %frame.branch,
        modules = frame.module_scope.len(),
        images = images.len(),
        "frame_create called"
    );

    let frame = ctx
        .with_stores(move |store, image_store| persist(store, image_store, frame, &images))
        .await?;

    let text = format!(
        "Frame {} created on branch '{}' ({} module{}{})",
        frame.id,
        frame.branch,
        frame.module_scope.len(),
        if frame.module_scope.len() == 1 { "" } else { "s" },
        match frame.image_ids.len() {
            0 => String::new(),
            n => format!(", {n} image{}", if n == 1 { "" } else { "s" }),
        }
    );
    ToolOutput::with_data(
        text,
        &Created {
            frame_id: frame.id,
            timestamp: frame.timestamp,
            branch: frame.branch,
            module_scope: frame.module_scope,
            image_ids: frame.image_ids,
            warnings: checked.warnings,
        },
    )
}

/// Save the frame, then its images. If any image step fails the frame and any
/// images already stored are removed before the error is returned.
fn persist(
    store: &dyn FrameStore,
    images: &dyn ImageStore,
    mut frame: Frame,
    attachments: &[ImageAttachment],
) -> Result<Frame, ToolError> {
    store.save_frame(&frame).map_err(ToolError::storage_write)?;
    if attachments.is_empty() {
        return Ok(frame);
    }

    let mut image_ids = Vec::with_capacity(attachments.len());
    for (index, attachment) in attachments.iter().enumerate() {
        match images.store_image(&frame.id, attachment) {
            Ok(id) => image_ids.push(id),
            Err(err) => {
                tracing::error!(frame_id = %frame.id, index, error = %err, "image attachment failed");
                roll_back(store, images, &frame.id);
                return Err(ToolError::domain(
                    ErrorCode::StorageImageFailed,
                    format!("Failed to store image {index}; the frame was not created"),
                )
                .with_context(json!({ "image_index": index })));
            }
        }
    }

    frame.image_ids = image_ids;
    if let Err(err) = store.save_frame(&frame) {
        roll_back(store, images, &frame.id);
        return Err(ToolError::storage_write(err));
    }
    Ok(frame)
}

fn roll_back(store: &dyn FrameStore, images: &dyn ImageStore, frame_id: &str) {
    if let Err(err) = images.delete_images_for_frame(frame_id) {
        tracing::error!(frame_id, error = %err, "rollback: failed to delete images");
    }
    match store.delete_frame(frame_id) {
        Ok(_) => tracing::warn!(frame_id, "rolled back frame after image failure"),
        Err(err) => tracing::error!(frame_id, error = %err, "rollback: failed to delete frame"),
    }
}
