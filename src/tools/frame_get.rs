use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::EngineContext;
use crate::error::{ErrorCode, ToolError};

use super::{non_blank, parse_args, ToolOutput};

/// Parameters for the `frame_get` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FrameGetParams {
    #[schemars(description = "The frame id returned by frame_create or frame_search")]
    pub frame_id: String,
}

pub(crate) async fn run(ctx: &EngineContext, args: Value) -> Result<ToolOutput, ToolError> {
    let params: FrameGetParams = parse_args(args)?;
    let frame_id = non_blank(Some(&params.frame_id))
        .ok_or_else(|| ToolError::required_field("frame_id"))?
        .to_string();
    tracing::info!(frame_id = %frame_id, "frame_get called");

    let id = frame_id.clone();
    let frame = ctx
        .with_store(move |store| store.get_frame_by_id(&id).map_err(ToolError::storage_read))
        .await?;

    let Some(frame) = frame else {
        return Err(ToolError::guidance(
            ErrorCode::StorageNotFound,
            format!("Frame not found: {frame_id}"),
            [
                "Use frame_search to find frames by reference point, ticket or branch",
                "Use frame_list to browse recent frames",
            ],
        )
        .with_context(json!({ "frame_id": frame_id, "hintId": "hint_frame_not_found" })));
    };

    let text = format!(
        "Frame {} ({}, branch '{}')\n{}\nReference: {}\nNext: {}",
        frame.id,
        frame.timestamp,
        frame.branch,
        frame.summary_caption,
        frame.reference_point,
        frame.status_snapshot.next_action
    );
    ToolOutput::with_data(text, &frame)
}
