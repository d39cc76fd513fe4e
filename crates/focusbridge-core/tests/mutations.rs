mod common;

use pretty_assertions::assert_eq;

use common::ScriptedRunner;
use focusbridge_core::mutation::{
    AddTagRequest, AddTaskRequest, EditItemRequest, MutationResult, RemoveItemRequest,
};
use focusbridge_core::model::{EntityKind, EntityRef};
use focusbridge_core::{Bridge, BridgeError};

#[test]
fn add_tag_reports_the_new_identifier() {
    let runner = ScriptedRunner::new()
        .reply("{\"success\":true,\"tagId\":\"gA1\",\"name\":\"Alpha\",\"parentName\":null}\n");
    let bridge = Bridge::new(&runner);

    let outcome = bridge
        .add_tag(&AddTagRequest {
            name: "Alpha".into(),
            ..AddTagRequest::default()
        })
        .expect("add tag");
    assert_eq!(outcome.id, "gA1");
    assert_eq!(outcome.name, "Alpha");
    assert_eq!(outcome.parent_name, None);

    let program = runner.last_program();
    assert!(program.contains("const item = new Tag(\"Alpha\", dest === null ? tags.ending : dest.ending);"));
    assert!(program.contains("tagId: __pk(item)"));
}

#[test]
fn add_task_resolves_its_container_before_creating() {
    let runner = ScriptedRunner::new().reply(
        "{\"success\":true,\"taskId\":\"t9\",\"name\":\"Call Bob\",\"parentName\":\"Errands\",\"containerKind\":\"project\"}",
    );
    let bridge = Bridge::new(&runner);
    let outcome = bridge
        .add_task(&AddTaskRequest {
            name: "Call Bob".into(),
            project_name: Some("Errands".into()),
            tags: vec!["phone".into()],
            due_date: Some("2026-10-20".into()),
            ..AddTaskRequest::default()
        })
        .expect("add task");
    assert_eq!(outcome.container_kind.as_deref(), Some("project"));

    let program = runner.last_program();
    let lookup = program.find("__byName(flattenedProjects, \"Errands\")").expect("lookup");
    let missing = program.find("Project not found: Errands").expect("not found branch");
    let create = program.find("new Task(\"Call Bob\"").expect("create");
    assert!(lookup < missing && missing < create);
    assert!(program.contains("new Date(\"2026-10-20T00:00:00\")"));
    assert!(program.contains("for (const n of [\"phone\"]) {"));
}

#[test]
fn id_only_edits_never_look_up_by_name() {
    let runner = ScriptedRunner::new()
        .reply("{\"success\":true,\"id\":\"T\",\"name\":\"Alpha\",\"changedProperties\":[]}");
    let bridge = Bridge::new(&runner);
    let mut request = EditItemRequest::new(EntityKind::Task, EntityRef::by_id("T"));
    request.new_flagged = Some(true);
    bridge.edit_item(&request).expect("edit");

    let program = runner.last_program();
    assert!(program.contains("const target = __byId(Task, \"T\");"));
    assert!(!program.contains("__byName(flattenedTasks,"));
}

#[test]
fn edit_without_changes_is_a_successful_no_op() {
    let runner = ScriptedRunner::new()
        .reply("{\"success\":true,\"id\":\"T\",\"name\":\"Alpha\",\"changedProperties\":[]}");
    let bridge = Bridge::new(&runner);
    let outcome = bridge
        .edit_item(&EditItemRequest::new(EntityKind::Task, EntityRef::by_id("T")))
        .expect("edit");
    assert!(outcome.changed_properties.is_empty());
    assert!(!outcome.moved());

    let program = runner.last_program();
    assert!(!program.contains("moveTasks"));
    assert!(!program.contains("let dest = null;"));
}

#[test]
fn property_edits_only_report_real_changes() {
    let runner = ScriptedRunner::new()
        .reply("{\"success\":true,\"id\":\"T\",\"name\":\"Renamed\",\"changedProperties\":[\"name\"]}")
        .reply("{\"success\":true,\"id\":\"T\",\"name\":\"Renamed\",\"changedProperties\":[]}");
    let bridge = Bridge::new(&runner);
    let mut request = EditItemRequest::new(EntityKind::Task, EntityRef::by_id("T"));
    request.new_name = Some("Renamed".into());

    let first = bridge.edit_item(&request).expect("first edit");
    let second = bridge.edit_item(&request).expect("second edit");
    assert_eq!(first.changed_properties, vec!["name".to_string()]);
    assert!(second.changed_properties.is_empty());

    let program = runner.last_program();
    assert!(program.contains("const v = \"Renamed\";"));
    assert!(program.contains("if (target.name !== v) {"));
    assert!(program.contains("__mark(\"name\");"));
}

#[test]
fn move_into_current_project_checks_placement_first() {
    let runner = ScriptedRunner::new()
        .reply("{\"success\":true,\"id\":\"T\",\"name\":\"Alpha\",\"changedProperties\":[]}");
    let bridge = Bridge::new(&runner);
    let mut request = EditItemRequest::new(EntityKind::Task, EntityRef::by_id("T"));
    request.new_project_id = Some("P".into());

    let outcome = bridge.edit_item(&request).expect("edit");
    assert!(outcome.changed_properties.is_empty());

    let program = runner.last_program();
    let placed = "target.containingProject !== null && __pk(target.containingProject) === __pk(dest)";
    assert_eq!(program.matches(placed).count(), 2, "checked before and after the move");
    let first_check = program.find(placed).expect("placement check");
    let move_call = program.find("moveTasks([target], dest.ending);").expect("move");
    let moved = program.find("__mark(\"moved\");").expect("moved marker");
    assert!(first_check < move_call && move_call < moved);
}

#[test]
fn missing_destination_fails_before_any_update() {
    let runner = ScriptedRunner::new()
        .reply("{\"success\":false,\"error\":\"Task not found: X\"}");
    let bridge = Bridge::new(&runner);
    let mut request = EditItemRequest::new(EntityKind::Task, EntityRef::by_id("T"));
    request.new_name = Some("Renamed".into());
    request.new_parent_task_id = Some("X".into());

    let err = bridge.edit_item(&request).expect_err("missing destination");
    assert_eq!(err, BridgeError::Business("Task not found: X".into()));
    assert!(err.to_string().contains("not found"));

    let program = runner.last_program();
    let missing = program.find("error: \"Task not found: X\"").expect("destination check");
    let rename = program.find("target.name = v;").expect("rename");
    assert!(missing < rename);
    assert!(program.contains("Cannot move a task into itself"));
}

#[test]
fn two_destinations_are_rejected_before_any_script_runs() {
    let runner = ScriptedRunner::new();
    let bridge = Bridge::new(&runner);
    let mut request = EditItemRequest::new(EntityKind::Task, EntityRef::by_id("T"));
    request.new_project_name = Some("Home".into());
    request.new_parent_task_name = Some("Parent".into());

    let err = bridge.edit_item(&request).expect_err("validation");
    assert_eq!(err.kind(), "validation");
    assert!(runner.scripts().is_empty());
}

#[test]
fn missing_reference_is_rejected_before_any_script_runs() {
    let runner = ScriptedRunner::new();
    let bridge = Bridge::new(&runner);
    let result = MutationResult::from(bridge.remove_item(&RemoveItemRequest {
        id: None,
        name: Some("   ".into()),
        item_type: EntityKind::Tag,
    }));
    assert!(!result.success);
    assert_eq!(result.error_kind.as_deref(), Some("validation"));
    assert!(runner.scripts().is_empty());
}

#[test]
fn tag_moves_to_root_use_the_library_tag_list() {
    let runner = ScriptedRunner::new().reply(
        "{\"success\":true,\"id\":\"g1\",\"name\":\"Errands\",\"changedProperties\":[\"moved\"]}",
    );
    let bridge = Bridge::new(&runner);
    let mut request = EditItemRequest::new(EntityKind::Tag, EntityRef::by_name("Errands"));
    request.move_to_root = true;
    let outcome = bridge.edit_item(&request).expect("edit");
    assert!(outcome.moved());

    let program = runner.last_program();
    assert!(program.contains("const candidate = tags;"));
    assert!(program.contains("if (!(target.parent === null)) {"));
    assert!(program.contains("moveTags([target], dest.ending);"));
}

#[test]
fn removing_twice_reports_not_found_the_second_time() {
    let runner = ScriptedRunner::new()
        .reply("{\"success\":true,\"id\":\"T\",\"name\":\"Alpha\"}")
        .reply("{\"success\":false,\"error\":\"Tag not found: T\"}");
    let bridge = Bridge::new(&runner);
    let request = RemoveItemRequest {
        id: Some("T".into()),
        name: None,
        item_type: EntityKind::Tag,
    };

    let first = bridge.remove_item(&request).expect("first remove");
    assert_eq!(first.name, "Alpha");
    let second = bridge.remove_item(&request).expect_err("second remove");
    assert_eq!(second.kind(), "business");
    assert!(second.to_string().contains("not found"));

    let program = runner.last_program();
    let capture = program.find("const removedName = target.name;").expect("capture");
    let delete = program.find("deleteObject(target);").expect("delete");
    assert!(capture < delete);
}

#[test]
fn process_and_decode_failures_stay_distinct() {
    let runner = ScriptedRunner::new()
        .fail(BridgeError::Process {
            message: "interpreter exited with status 1".into(),
            status: Some(1),
            stderr: "execution error".into(),
        })
        .reply("execution error: Error: SyntaxError: Unexpected token");
    let bridge = Bridge::new(&runner);
    let request = RemoveItemRequest {
        id: Some("T".into()),
        name: None,
        item_type: EntityKind::Task,
    };

    let first = MutationResult::from(bridge.remove_item(&request));
    assert_eq!(first.error_kind.as_deref(), Some("process"));
    let second = MutationResult::from(bridge.remove_item(&request));
    assert_eq!(second.error_kind.as_deref(), Some("decode"));
}

#[test]
fn hostile_names_survive_both_escaping_layers() {
    let name = "Fix \"quotes\" and 'apostrophes' \\ backslashes\nnewline";
    let runner = ScriptedRunner::new()
        .reply("{\"success\":true,\"tagId\":\"g2\",\"name\":\"x\",\"parentName\":null}");
    let bridge = Bridge::new(&runner);
    bridge
        .add_tag(&AddTagRequest {
            name: name.into(),
            ..AddTagRequest::default()
        })
        .expect("add tag");

    let program = runner.last_program();
    assert!(program.contains(
        "new Tag(\"Fix \\\"quotes\\\" and \\'apostrophes\\' \\\\ backslashes\\nnewline\","
    ));
}
