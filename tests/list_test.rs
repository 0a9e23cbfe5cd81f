mod helpers;

use helpers::{call_err, call_ok, engine_with, ids, minute, seed_frame, test_engine, test_policy, test_settings};
use serde_json::{json, Value};
use tessera::engine::EngineContext;

fn seed_five(ctx: &EngineContext) {
    let store = ctx.store.as_ref();
    seed_frame(store, "f1", &minute(1), "main", None, &["mod/x"]);
    seed_frame(store, "f2", &minute(2), "feature", None, &["services/auth"]);
    seed_frame(store, "f3", &minute(3), "main", Some("T-1"), &["mod/y"]);
    seed_frame(store, "f4", &minute(4), "feature", None, &["mod/x", "services/auth"]);
    seed_frame(store, "f5", &minute(5), "main", None, &["mod/x"]);
}

#[tokio::test]
async fn unfiltered_listing_passes_store_cursor_through() {
    let ctx = test_engine();
    seed_five(&ctx);

    let first = call_ok(&ctx, "frame_list", json!({"limit": 2})).await;
    assert_eq!(ids(&first["frames"]), ["f5", "f4"]);
    assert_eq!(first["page"]["hasMore"], true);
    assert_eq!(first["page"]["limit"], 2);
    assert_eq!(first["order"], json!({"by": "timestamp", "direction": "desc"}));
    let cursor = first["page"]["nextCursor"].clone();
    assert!(cursor.is_string());

    let second = call_ok(&ctx, "frame_list", json!({"limit": 2, "cursor": cursor})).await;
    assert_eq!(ids(&second["frames"]), ["f3", "f2"]);

    let third = call_ok(
        &ctx,
        "frame_list",
        json!({"limit": 2, "cursor": second["page"]["nextCursor"]}),
    )
    .await;
    assert_eq!(ids(&third["frames"]), ["f1"]);
    assert_eq!(third["page"]["hasMore"], false);
    assert_eq!(third["page"]["nextCursor"], Value::Null);
}

#[tokio::test]
async fn filtered_listing_disables_pagination() {
    let ctx = test_engine();
    seed_five(&ctx);

    let data = call_ok(&ctx, "frame_list", json!({"branch": "main", "limit": 2})).await;
    assert_eq!(ids(&data["frames"]), ["f5", "f3"]);
    // More main frames exist, but a filtered page never claims so.
    assert_eq!(data["page"]["hasMore"], false);
    assert_eq!(data["page"]["nextCursor"], Value::Null);
    assert_eq!(data["order"]["by"], "timestamp");
}

#[tokio::test]
async fn filtered_listing_ignores_cursor() {
    let ctx = test_engine();
    seed_five(&ctx);
    let first = call_ok(&ctx, "frame_list", json!({"limit": 1})).await;

    let data = call_ok(
        &ctx,
        "frame_list",
        json!({"branch": "feature", "cursor": first["page"]["nextCursor"]}),
    )
    .await;
    assert_eq!(ids(&data["frames"]), ["f4", "f2"]);
}

#[tokio::test]
async fn module_filter_accepts_aliases() {
    let ctx = test_engine();
    seed_five(&ctx);

    let canonical = call_ok(&ctx, "frame_list", json!({"module": "services/auth"})).await;
    let alias = call_ok(&ctx, "frame_list", json!({"module": "auth"})).await;
    assert_eq!(ids(&canonical["frames"]), ["f4", "f2"]);
    assert_eq!(canonical["frames"], alias["frames"]);
}

#[tokio::test]
async fn since_filter_is_inclusive() {
    let ctx = test_engine();
    seed_five(&ctx);

    let data = call_ok(&ctx, "frame_list", json!({"since": "2026-03-01T00:03:00Z"})).await;
    assert_eq!(ids(&data["frames"]), ["f5", "f4", "f3"]);

    let data = call_ok(
        &ctx,
        "frame_list",
        json!({"since": "2026-03-01T00:02:00Z", "branch": "feature", "module": "mod/x"}),
    )
    .await;
    assert_eq!(ids(&data["frames"]), ["f4"]);
}

#[tokio::test]
async fn invalid_since_is_format_error() {
    let ctx = test_engine();
    let err = call_err(&ctx, "frame_list", json!({"since": "last tuesday"})).await;
    assert_eq!(err.code, "VALIDATION_INVALID_FORMAT");
    assert_eq!(err.context.unwrap()["field"], "since");
}

#[tokio::test]
async fn invalid_cursor_is_format_error() {
    let ctx = test_engine();
    seed_five(&ctx);
    let err = call_err(&ctx, "frame_list", json!({"cursor": "not-a-cursor"})).await;
    assert_eq!(err.code, "VALIDATION_INVALID_FORMAT");
    assert_eq!(err.context.unwrap()["field"], "cursor");
}

#[tokio::test]
async fn filters_only_see_recent_window() {
    let mut settings = test_settings();
    settings.fetch_bound = 2;
    let ctx = engine_with(settings, Some(test_policy()));
    seed_five(&ctx);

    // f2 is a feature frame, but it is older than the newest two.
    let data = call_ok(&ctx, "frame_list", json!({"branch": "feature"})).await;
    assert_eq!(ids(&data["frames"]), ["f4"]);

    // Unfiltered listings are not bounded by the window.
    let data = call_ok(&ctx, "frame_list", json!({"limit": 10})).await;
    assert_eq!(ids(&data["frames"]).len(), 5);
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let ctx = test_engine();
    let data = call_ok(&ctx, "frame_list", json!({})).await;
    assert_eq!(data["frames"], json!([]));
    assert_eq!(data["page"]["hasMore"], false);
    assert_eq!(data["page"]["limit"], 10);
}

#[tokio::test]
async fn huge_fetch_bound_scans_whole_store() {
    let mut settings = test_settings();
    settings.fetch_bound = usize::MAX;
    let ctx = engine_with(settings, Some(test_policy()));
    seed_five(&ctx);

    let data = call_ok(&ctx, "frame_list", json!({"branch": "feature"})).await;
    assert_eq!(ids(&data["frames"]), ["f4", "f2"]);
}
