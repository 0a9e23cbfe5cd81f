mod helpers;

use std::sync::Arc;

use helpers::{
    call_err, call_ok, create_args, frame_count, minute, seed_frame, test_engine, test_settings,
    unchecked_engine, with_field,
};
use serde_json::{json, Value};
use tessera::db::SqliteStore;
use tessera::engine::{EngineContext, PolicyState};

// --- frame_create / frame_get / frame_validate ---

#[tokio::test]
async fn created_frame_can_be_fetched() {
    let ctx = test_engine();
    let args = with_field(
        with_field(create_args("login redirect", &["login", "mod/x"]), "jira", json!("T-7")),
        "keywords",
        json!(["oauth", "redirect"]),
    );
    let created = call_ok(&ctx, "frame_create", args).await;
    assert_eq!(created["branch"], "main");
    assert_eq!(created["module_scope"], json!(["ui/login", "mod/x"]));
    assert_eq!(created["warnings"].as_array().unwrap().len(), 1);

    let frame = call_ok(&ctx, "frame_get", json!({"frame_id": created["frame_id"]})).await;
    assert_eq!(frame["id"], created["frame_id"]);
    assert_eq!(frame["timestamp"], created["timestamp"]);
    assert_eq!(frame["jira"], "T-7");
    assert_eq!(frame["keywords"], json!(["oauth", "redirect"]));
    assert_eq!(frame["module_scope"], json!(["ui/login", "mod/x"]));
    assert_eq!(frame["status_snapshot"]["next_action"], "keep going");
}

#[tokio::test]
async fn create_without_branch_uses_unknown() {
    let ctx = test_engine();
    let mut args = create_args("no branch", &["mod/x"]);
    args.as_object_mut().unwrap().remove("branch");
    let created = call_ok(&ctx, "frame_create", args).await;
    assert_eq!(created["branch"], "unknown");
}

#[tokio::test]
async fn create_reports_first_validation_error() {
    let ctx = test_engine();

    let mut args = create_args("x", &["mod/x"]);
    args.as_object_mut().unwrap().remove("summary_caption");
    let err = call_err(&ctx, "frame_create", args).await;
    assert_eq!(err.code, "VALIDATION_REQUIRED_FIELD");
    assert_eq!(err.context.unwrap()["field"], "summary_caption");

    let err = call_err(&ctx, "frame_create", create_args("x", &[])).await;
    assert_eq!(err.code, "VALIDATION_EMPTY_MODULE_SCOPE");
    assert_eq!(err.context.unwrap()["hintId"], "hint_module_scope");
    assert!(!err.next_actions.unwrap().is_empty());

    let err = call_err(&ctx, "frame_create", create_args("x", &["mod/z"])).await;
    assert_eq!(err.code, "VALIDATION_INVALID_MODULE_ID");
    let context = err.context.unwrap();
    assert_eq!(context["hintId"], "hint_invalid_module");
    assert_eq!(context["invalid"][0]["module"], "mod/z");
    let suggestions = context["invalid"][0]["suggestions"].as_array().unwrap();
    assert!(suggestions.contains(&json!("mod/x")));

    let err = call_err(&ctx, "frame_create", json!({"summary_caption": 5})).await;
    assert_eq!(err.code, "VALIDATION_INVALID_FORMAT");

    assert_eq!(frame_count(&ctx), 0);
}

#[tokio::test]
async fn frame_get_unknown_id_is_guidance() {
    let ctx = test_engine();
    let err = call_err(&ctx, "frame_get", json!({"frame_id": "nope"})).await;
    assert_eq!(err.code, "STORAGE_NOT_FOUND");
    assert_eq!(err.context.unwrap()["hintId"], "hint_frame_not_found");
    assert!(err.next_actions.is_some());

    let err = call_err(&ctx, "frame_get", json!({})).await;
    assert_eq!(err.code, "VALIDATION_REQUIRED_FIELD");
}

#[tokio::test]
async fn frame_validate_collects_every_error_without_writing() {
    let ctx = test_engine();
    let data = call_ok(
        &ctx,
        "frame_validate",
        json!({
            "summary_caption": "",
            "reference_point": "r",
            "status_snapshot": {"next_action": ""},
            "module_scope": ["mod/z"],
            "images": [{"data": "abc", "mime_type": "text/plain"}],
        }),
    )
    .await;

    assert_eq!(data["valid"], false);
    let codes: Vec<&str> = data["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert_eq!(
        codes,
        [
            "VALIDATION_REQUIRED_FIELD",
            "VALIDATION_REQUIRED_FIELD",
            "VALIDATION_INVALID_IMAGE",
            "VALIDATION_INVALID_MODULE_ID",
        ]
    );
    assert_eq!(frame_count(&ctx), 0);
}

#[tokio::test]
async fn frame_validate_returns_canonical_scope() {
    let ctx = test_engine();
    let data = call_ok(&ctx, "frame_validate", create_args("ok", &["auth", "services/auth"])).await;
    assert_eq!(data["valid"], true);
    assert_eq!(data["errors"], json!([]));
    assert_eq!(data["canonical_module_scope"], json!(["services/auth"]));

    let data = call_ok(&ctx, "frame_validate", json!("not an object")).await;
    assert_eq!(data["valid"], false);
    assert_eq!(data["errors"][0]["code"], "VALIDATION_INVALID_FORMAT");
}

// --- unchecked mode ---

#[tokio::test]
async fn unchecked_mode_stores_modules_as_given() {
    let ctx = unchecked_engine();
    let created = call_ok(
        &ctx,
        "frame_create",
        create_args("anything goes", &["whatever/module", "whatever/module"]),
    )
    .await;
    assert_eq!(created["module_scope"], json!(["whatever/module"]));
    assert!(created["warnings"][0].as_str().unwrap().contains("No module policy"));
}

#[tokio::test]
async fn policy_tools_need_a_policy() {
    let ctx = unchecked_engine();
    for (tool, args) in [
        ("policy_check", json!({})),
        ("atlas_analyze", json!({"module_scope": ["mod/x"]})),
    ] {
        let err = call_err(&ctx, tool, args).await;
        assert_eq!(err.code, "POLICY_NOT_FOUND", "{tool}");
        assert_eq!(err.context.unwrap()["hintId"], "hint_policy_missing");
        assert_eq!(err.next_actions.unwrap().len(), 2);
    }

    let data = call_ok(&ctx, "system_introspect", json!({})).await;
    assert_eq!(data["policy"]["loaded"], false);
}

#[tokio::test]
async fn invalid_policy_is_reported_as_such() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let ctx = EngineContext::with_policy_state(
        test_settings(),
        store.clone(),
        store,
        PolicyState::Invalid("expected value at line 1 column 1".into()),
    )
    .unwrap();

    let err = call_err(&ctx, "policy_check", json!({"modules": ["mod/x"]})).await;
    assert_eq!(err.code, "POLICY_INVALID");

    // Frame writes still work, unchecked.
    let created = call_ok(&ctx, "frame_create", create_args("still works", &["mod/q"])).await;
    assert_eq!(created["module_scope"], json!(["mod/q"]));
}

// --- policy_check / atlas_analyze ---

#[tokio::test]
async fn policy_check_summarizes_and_validates() {
    let ctx = test_engine();

    let summary = call_ok(&ctx, "policy_check", json!({})).await;
    assert_eq!(summary["module_count"], 4);
    assert_eq!(summary["alias_count"], 2);
    assert_eq!(summary["path"], "test.policy.json");

    let checked = call_ok(&ctx, "policy_check", json!({"modules": ["auth", "mod/x"]})).await;
    assert_eq!(checked["valid"], true);
    assert_eq!(checked["canonical"], json!(["services/auth", "mod/x"]));
    assert_eq!(checked["resolved_aliases"], json!([["auth", "services/auth"]]));

    let checked = call_ok(&ctx, "policy_check", json!({"modules": ["mod/q"]})).await;
    assert_eq!(checked["valid"], false);
    assert_eq!(checked["errors"][0]["module"], "mod/q");
}

#[tokio::test]
async fn atlas_walks_policy_graph() {
    let ctx = test_engine();

    let atlas = call_ok(&ctx, "atlas_analyze", json!({"module_scope": ["mod/x"]})).await;
    assert_eq!(atlas["fold_radius"], 1);
    let modules: Vec<&str> = atlas["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(modules, ["mod/x", "mod/y", "services/auth"]);
    assert!(atlas["edges"]
        .as_array()
        .unwrap()
        .contains(&json!({"from": "mod/x", "to": "services/auth", "allowed": false})));

    let wide = call_ok(
        &ctx,
        "atlas_analyze",
        json!({"module_scope": ["mod/x"], "fold_radius": 2}),
    )
    .await;
    assert_eq!(wide["modules"].as_array().unwrap().len(), 4);

    let via_alias = call_ok(&ctx, "atlas_analyze", json!({"module_scope": ["login"], "fold_radius": 0})).await;
    assert_eq!(via_alias["seed_modules"], json!(["ui/login"]));
}

#[tokio::test]
async fn atlas_rejects_bad_input() {
    let ctx = test_engine();
    let err = call_err(&ctx, "atlas_analyze", json!({"module_scope": ["mod/x"], "fold_radius": 9})).await;
    assert_eq!(err.code, "VALIDATION_INVALID_FORMAT");

    let err = call_err(&ctx, "atlas_analyze", json!({"module_scope": [" "]})).await;
    assert_eq!(err.code, "VALIDATION_EMPTY_MODULE_SCOPE");

    let err = call_err(&ctx, "atlas_analyze", json!({"module_scope": ["mod/q"]})).await;
    assert_eq!(err.code, "VALIDATION_INVALID_MODULE_ID");
}

// --- timeline_show ---

#[tokio::test]
async fn timeline_is_oldest_first_with_module_diffs() {
    let ctx = test_engine();
    let store = ctx.store.as_ref();
    seed_frame(store, "t1", &minute(1), "feature/a", Some("T-1"), &["mod/x"]);
    seed_frame(store, "t2", &minute(2), "feature/a", Some("T-1"), &["mod/x", "mod/y"]);
    seed_frame(store, "other", &minute(3), "main", Some("T-2"), &["mod/x"]);
    seed_frame(store, "t3", &minute(4), "feature/a", Some("T-1"), &["mod/y"]);

    let data = call_ok(&ctx, "timeline_show", json!({"ticket_or_branch": "T-1"})).await;
    let entries = data["entries"].as_array().unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e["frame_id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["t1", "t2", "t3"]);
    assert_eq!(entries[1]["modules_added"], json!(["mod/y"]));
    assert_eq!(entries[2]["modules_removed"], json!(["mod/x"]));

    let by_branch = call_ok(&ctx, "timeline_show", json!({"ticket_or_branch": "feature/a", "limit": 2})).await;
    let ids: Vec<&str> = by_branch["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["frame_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["t2", "t3"]);

    let bounded = call_ok(
        &ctx,
        "timeline_show",
        json!({"ticket_or_branch": "T-1", "since": "2026-03-01T00:02:00Z", "until": "2026-03-01T00:03:00Z"}),
    )
    .await;
    assert_eq!(bounded["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_timeline_is_guidance() {
    let ctx = test_engine();
    let err = call_err(&ctx, "timeline_show", json!({"ticket_or_branch": "T-404"})).await;
    assert_eq!(err.code, "STORAGE_NOT_FOUND");
    assert_eq!(err.context.unwrap()["hintId"], "hint_timeline_empty");

    let err = call_err(&ctx, "timeline_show", json!({"ticket_or_branch": "  "})).await;
    assert_eq!(err.code, "VALIDATION_REQUIRED_FIELD");

    let err = call_err(&ctx, "timeline_show", json!({"ticket_or_branch": "T-1", "until": "soon"})).await;
    assert_eq!(err.code, "VALIDATION_INVALID_FORMAT");
}

// --- db_stats / turncost / contradictions ---

#[tokio::test]
async fn db_stats_counts_frames_branches_modules() {
    let ctx = test_engine();
    let store = ctx.store.as_ref();
    seed_frame(store, "s1", &minute(1), "main", None, &["mod/x"]);
    seed_frame(store, "s2", &minute(2), "main", None, &["mod/x", "mod/y"]);
    seed_frame(store, "s3", &minute(3), "dev", None, &["mod/x"]);

    let stats = call_ok(&ctx, "db_stats", json!({})).await;
    assert_eq!(stats["total_frames"], 3);
    assert_eq!(stats["total_images"], 0);
    assert_eq!(stats["by_branch"], json!({"dev": 1, "main": 2}));
    assert_eq!(stats["top_modules"][0], json!({"module": "mod/x", "frames": 3}));
    assert_eq!(stats["oldest_frame"], minute(1));
    assert_eq!(stats["newest_frame"], minute(3));
    assert_eq!(stats["sampled"], false);
}

#[tokio::test]
async fn turncost_scores_recent_frames() {
    let ctx = test_engine();
    let mut blocked = create_args("blocked", &["mod/x"]);
    blocked["status_snapshot"] = json!({"next_action": "wait", "blockers": ["review", "ci"]});
    call_ok(&ctx, "frame_create", blocked).await;
    call_ok(&ctx, "frame_create", create_args("switch", &["mod/y"])).await;

    let cost = call_ok(&ctx, "turncost_calculate", json!({})).await;
    assert_eq!(cost["period"], "24h");
    assert_eq!(cost["components"]["frames"], 2);
    assert_eq!(cost["components"]["blockers"], 2);
    assert_eq!(cost["components"]["context_switches"], 1);
    // 2 frames * 1.0 + 2 blockers * 3.0 + 1 switch * 2.0
    assert_eq!(cost["total"].as_f64().unwrap(), 10.0);

    let weighted = call_ok(
        &ctx,
        "turncost_calculate",
        json!({"period": "7d", "weights": {"blockers": 0.0}}),
    )
    .await;
    assert_eq!(weighted["total"].as_f64().unwrap(), 4.0);
    assert_eq!(weighted["weights"]["frames"].as_f64().unwrap(), 1.0);

    let err = call_err(&ctx, "turncost_calculate", json!({"period": "1y"})).await;
    assert_eq!(err.code, "VALIDATION_INVALID_FORMAT");
    assert_eq!(err.context.unwrap()["accepted"], json!(["24h", "7d", "30d"]));
}

#[tokio::test]
async fn contradictions_pair_negated_reference_points() {
    let ctx = test_engine();
    call_ok(&ctx, "frame_create", create_args("use redis cache for sessions", &["services/auth"])).await;
    call_ok(&ctx, "frame_create", create_args("never cache sessions in redis", &["auth"])).await;
    call_ok(&ctx, "frame_create", create_args("unrelated billing work", &["mod/y"])).await;

    let data = call_ok(&ctx, "contradictions_scan", json!({})).await;
    assert_eq!(data["scanned"], 3);
    assert_eq!(data["count"], 1);
    assert_eq!(data["contradictions"][0]["shared_modules"], json!(["services/auth"]));

    let scoped = call_ok(&ctx, "contradictions_scan", json!({"module": "mod/y"})).await;
    assert_eq!(scoped["count"], 0);
    assert_eq!(scoped["module"], "mod/y");

    let aliased = call_ok(&ctx, "contradictions_scan", json!({"module": "auth"})).await;
    assert_eq!(aliased["module"], "services/auth");
    assert_eq!(aliased["count"], 1);
}

// --- hints_get / help ---

#[tokio::test]
async fn hints_expand_ids_from_errors() {
    let ctx = test_engine();
    let err = call_err(&ctx, "frame_search", json!({})).await;
    let hint_id = err.context.unwrap()["hintId"].clone();

    let data = call_ok(&ctx, "hints_get", json!({"hint_ids": [hint_id, "hint_nope"]})).await;
    assert_eq!(data["hints"].as_array().unwrap().len(), 1);
    assert_eq!(data["hints"][0]["tool"], "frame_search");
    assert_eq!(data["unknown"], json!(["hint_nope"]));

    let all = call_ok(&ctx, "get_hints", json!({})).await;
    assert!(all["hints"].as_array().unwrap().len() >= 6);
}

#[tokio::test]
async fn help_describes_tools_and_aliases() {
    let ctx = test_engine();

    let overview = call_ok(&ctx, "help", json!({})).await;
    assert_eq!(overview["tools"].as_array().unwrap().len(), 14);
    assert_eq!(overview["aliases"]["remember"], "frame_create");

    let detail = call_ok(&ctx, "help", json!({"tool": "remember"})).await;
    assert_eq!(detail["tool"], "frame_create");
    assert_eq!(detail["example"]["name"], "frame_create");
    assert!(detail["example"]["arguments"]["module_scope"].is_array());
    assert!(detail["aliases"].as_array().unwrap().contains(&json!("lex_remember")));
    assert!(detail["inputSchema"]["properties"]["summary_caption"].is_object());

    let err = call_err(&ctx, "help", json!({"tool": "frobnicate"})).await;
    assert_eq!(err.code, "INTERNAL_UNKNOWN_TOOL");
}

#[tokio::test]
async fn every_tool_example_is_accepted_by_its_schema_fields() {
    let ctx = test_engine();
    let overview = call_ok(&ctx, "help", json!({})).await;
    for tool in overview["tools"].as_array().unwrap() {
        let name = tool["name"].as_str().unwrap();
        let detail = call_ok(&ctx, "help", json!({"tool": name})).await;
        let properties = detail["inputSchema"]["properties"].clone();
        if let Value::Object(args) = &detail["example"]["arguments"] {
            for key in args.keys() {
                assert!(properties.get(key).is_some(), "{name} example uses unknown field {key}");
            }
        }
    }
}
