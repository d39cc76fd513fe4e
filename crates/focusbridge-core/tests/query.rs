mod common;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::ScriptedRunner;
use focusbridge_core::model::EntityKind;
use focusbridge_core::mutation::AddTagRequest;
use focusbridge_core::query::{QueryResult, QuerySpec, SortOrder};
use focusbridge_core::Bridge;

fn names(items: &[serde_json::Map<String, Value>]) -> Vec<String> {
    items
        .iter()
        .map(|item| item["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn created_tag_is_found_by_name() {
    let runner = ScriptedRunner::new()
        .reply("{\"success\":true,\"tagId\":\"gA\",\"name\":\"Alpha\",\"parentName\":null}")
        .reply(
            &json!({
                "success": true,
                "count": 1,
                "items": [{"id": "gA", "name": "Alpha", "status": "Active", "active": true,
                           "allowsNextAction": true, "parentId": null, "parentName": null,
                           "taskCount": 0, "remainingTaskCount": 0}]
            })
            .to_string(),
        );
    let bridge = Bridge::new(&runner);
    let created = bridge
        .add_tag(&AddTagRequest {
            name: "Alpha".into(),
            ..AddTagRequest::default()
        })
        .expect("add tag");

    let spec: QuerySpec =
        serde_json::from_value(json!({"entity": "tags", "filters": {"name": "Alpha"}})).expect("spec");
    let outcome = bridge.query(&spec).expect("query");
    let items = outcome.items.expect("items");
    assert_eq!(outcome.count, 1);
    assert_eq!(items[0]["name"], json!("Alpha"));
    assert_eq!(items[0]["id"], json!(created.id));

    let program = runner.last_program();
    assert!(program.contains("{ \"op\": \"contains\", \"field\": \"name\", \"value\": \"Alpha\" }"));
    assert!(program.contains("for (const o of flattenedTags) {"));
}

#[test]
fn tag_names_sort_case_sensitively() {
    let runner = ScriptedRunner::new().reply(
        &json!({
            "success": true,
            "count": 3,
            "items": [{"name": "Beta"}, {"name": "alpha"}, {"name": "Gamma"}]
        })
        .to_string(),
    );
    let bridge = Bridge::new(&runner);
    let mut spec = QuerySpec::new(EntityKind::Tag);
    spec.sort_by = Some("name".into());
    spec.sort_order = SortOrder::Asc;
    spec.fields = Some(vec!["name".into()]);

    let outcome = bridge.query(&spec).expect("query");
    assert_eq!(names(&outcome.items.expect("items")), vec!["Beta", "Gamma", "alpha"]);

    let program = runner.last_program();
    let sort = program.find("out = __sorted(out, \"name\", false);").expect("sort");
    let pick = program.find("out = out.map((r) => __pick(r, fields));").expect("pick");
    assert!(sort < pick);
}

#[test]
fn summary_queries_only_return_a_count() {
    let runner = ScriptedRunner::new().reply("{\"success\":true,\"count\":42}");
    let bridge = Bridge::new(&runner);
    let spec: QuerySpec = serde_json::from_value(json!({
        "entity": "tasks",
        "filters": {"flagged": true, "status": ["Available", "Due Soon"]},
        "limit": 5,
        "summary": true
    }))
    .expect("spec");

    let result = QueryResult::from(bridge.query(&spec));
    assert_eq!(result.count, Some(42));
    assert_eq!(result.items, None);
    let rendered = serde_json::to_value(&result).expect("json");
    assert_eq!(rendered, json!({"success": true, "count": 42}));

    let program = runner.last_program();
    assert!(!program.contains("out.slice"));
    assert!(program.contains("\"field\": \"taskStatus\""));
}

#[test]
fn limit_is_applied_after_sorting() {
    let runner = ScriptedRunner::new().reply(
        &json!({
            "success": true,
            "count": 2,
            "items": [{"name": "a", "taskCount": 1}, {"name": "b", "taskCount": 7}]
        })
        .to_string(),
    );
    let bridge = Bridge::new(&runner);
    let mut spec = QuerySpec::new(EntityKind::Project);
    spec.fields = Some(vec!["name".into(), "taskCount".into()]);
    spec.sort_by = Some("taskCount".into());
    spec.sort_order = SortOrder::Desc;
    spec.limit = Some(1);

    let outcome = bridge.query(&spec).expect("query");
    let items = outcome.items.expect("items");
    assert_eq!(outcome.count, 1);
    assert_eq!(names(&items), vec!["b"]);

    let program = runner.last_program();
    let sort = program.find("__sorted(out, \"taskCount\", true)").expect("sort");
    let limit = program.find("out = out.slice(0, 1);").expect("limit");
    assert!(sort < limit);
}

#[test]
fn projection_keeps_requested_field_order() {
    let runner = ScriptedRunner::new().reply(
        &json!({
            "success": true,
            "count": 1,
            "items": [{"id": "t1", "name": "Write", "dueDate": null}]
        })
        .to_string(),
    );
    let bridge = Bridge::new(&runner);
    let mut spec = QuerySpec::new(EntityKind::Task);
    spec.fields = Some(vec!["dueDate".into(), "name".into()]);

    let outcome = bridge.query(&spec).expect("query");
    let item = &outcome.items.expect("items")[0];
    let keys: Vec<&str> = item.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["dueDate", "name"]);
}

#[test]
fn invalid_queries_never_reach_the_interpreter() {
    let runner = ScriptedRunner::new();
    let bridge = Bridge::new(&runner);
    let mut spec = QuerySpec::new(EntityKind::Tag);
    spec.filters.folder_name = Some("Work".into());

    let result = QueryResult::from(bridge.query(&spec));
    assert!(!result.success);
    assert_eq!(result.error_kind.as_deref(), Some("validation"));
    assert!(runner.scripts().is_empty());
}

#[test]
fn unknown_filter_names_fail_to_deserialize() {
    let parsed = serde_json::from_value::<QuerySpec>(json!({
        "entity": "tasks",
        "filters": {"colour": "red"}
    }));
    assert!(parsed.is_err());
}
