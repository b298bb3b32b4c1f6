//! File operations: move, delete, recreate and delete_method.

use super::Workspace;
use patchwright::{ChangeRequest, ElementLocator, Mode, RequestError};

#[test]
fn move_then_edit_through_new_path() {
    let ws = Workspace::new();
    ws.write("a.py", "x = 1\n");

    let mut orchestrator = ws.orchestrator();
    let staged = orchestrator.process([
        ChangeRequest::move_file("a.py", "sub/b.py"),
        ChangeRequest::element(
            "sub/b.py",
            ElementLocator::item("g"),
            Mode::Replace,
            "def g():\n    pass\n",
        ),
    ]);

    assert!(orchestrator.failures().is_empty());
    assert_eq!(orchestrator.sessions().count(), 1);
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].path, ws.path("a.py"));
    assert_eq!(staged[0].target(), ws.path("sub/b.py"));

    let confirmed = orchestrator.confirm_with(&mut patchwright::ApproveAll);
    let summary = orchestrator.commit(&confirmed);

    assert!(summary.is_success());
    assert_eq!(summary.written, vec![ws.path("sub/b.py")]);
    assert!(!ws.exists("a.py"));
    assert_eq!(ws.read("sub/b.py"), "x = 1\n\n\ndef g():\n    pass\n");
}

#[test]
fn move_validates_against_destination_language() {
    let ws = Workspace::new();
    ws.write("script.py", "def f():\n    return 1\n");

    let summary = ws.run(vec![ChangeRequest::move_file("script.py", "script.js")]);

    assert_eq!(summary.rolled_back.len(), 1);
    assert!(summary.written.is_empty());
    assert!(ws.exists("script.py"));
    assert!(!ws.exists("script.js"));
}

#[test]
fn move_conflicts_fail_the_request() {
    let ws = Workspace::new();
    ws.write("a.py", "x = 1\n");
    ws.write("b.py", "y = 1\n");
    ws.write("c.py", "z = 1\n");

    let mut orchestrator = ws.orchestrator();
    orchestrator.process([
        ChangeRequest::full_file("b.py", "y = 2\n"),
        ChangeRequest::move_file("a.py", "b.py"),
        ChangeRequest::move_file("c.py", "./c.py"),
        ChangeRequest::delete_file("c.py"),
        ChangeRequest::move_file("c.py", "d.py"),
        ChangeRequest::move_file("ghost.py", "e.py"),
    ]);

    let failed: Vec<usize> = orchestrator.failures().iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 2, 4, 5]);
    assert!(orchestrator
        .failures()
        .iter()
        .all(|f| matches!(f.error, RequestError::OperationConflict { .. })));
}

#[test]
fn delete_file_removes_it() {
    let ws = Workspace::new();
    ws.write("old.py", "def old():\n    pass\n");

    let summary = ws.run(vec![
        ChangeRequest::delete_file("old.py"),
        ChangeRequest::delete_file("never-existed.py"),
    ]);

    assert_eq!(summary.deleted, vec![ws.path("old.py")]);
    assert!(!ws.exists("old.py"));
    assert!(summary
        .skipped
        .iter()
        .any(|(path, reason)| path == &ws.path("never-existed.py") && reason == "no changes"));
}

#[test]
fn edits_after_delete_start_from_empty() {
    let ws = Workspace::new();
    ws.write("mod.py", "def old():\n    pass\n");

    let mut orchestrator = ws.orchestrator();
    let staged = orchestrator.process([
        ChangeRequest::delete_file("mod.py"),
        ChangeRequest::element(
            "mod.py",
            ElementLocator::item("new"),
            Mode::Merge,
            "def new():\n    pass\n",
        ),
    ]);

    assert_eq!(staged.len(), 1);
    assert!(!staged[0].tombstoned);
    assert_eq!(staged[0].original, "def old():\n    pass\n");
    assert_eq!(staged[0].working, "def new():\n    pass\n");

    let confirmed = orchestrator.confirm_with(&mut patchwright::ApproveAll);
    let summary = orchestrator.commit(&confirmed);
    assert_eq!(summary.written, vec![ws.path("mod.py")]);
    assert_eq!(ws.read("mod.py"), "def new():\n    pass\n");
}

#[test]
fn deleting_move_target_then_recreating_it() {
    let ws = Workspace::new();
    ws.write("a.py", "x = 1\n");

    let summary = ws.run(vec![
        ChangeRequest::move_file("a.py", "b.py"),
        ChangeRequest::delete_file("b.py"),
        ChangeRequest::full_file("b.py", "y = 2\n"),
    ]);

    assert!(summary.is_success());
    assert_eq!(summary.deleted, vec![ws.path("a.py")]);
    assert_eq!(summary.written, vec![ws.path("b.py")]);
    assert!(!ws.exists("a.py"));
    assert_eq!(ws.read("b.py"), "y = 2\n");
}

#[test]
fn delete_method_takes_its_decorators() {
    let ws = Workspace::new();
    ws.write(
        "c.py",
        "class C:\n    def a(self):\n        pass\n\n    @A\n    @B\n    def m(self):\n        return 1\n",
    );
    ws.write("only.py", "class D:\n    @property\n    def m(self):\n        return 1\n");

    let summary = ws.run(vec![
        ChangeRequest::delete_method("c.py", "C", "m"),
        ChangeRequest::delete_method("only.py", "D", "m"),
    ]);

    assert!(summary.is_success());
    let content = ws.read("c.py");
    assert_eq!(content, "class C:\n    def a(self):\n        pass\n");
    assert!(!content.contains('@'));
    assert_eq!(ws.read("only.py"), "class D:\n    pass\n");
}

#[test]
fn delete_method_of_typescript_class() {
    let ws = Workspace::new();
    ws.write(
        "api.ts",
        "class Api {\n  list() {}\n\n  @Get()\n  find() {}\n}\n",
    );

    let summary = ws.run(vec![ChangeRequest::delete_method("api.ts", "Api", "find")]);

    assert!(summary.is_success());
    assert_eq!(ws.read("api.ts"), "class Api {\n  list() {}\n}\n");
}

#[test]
fn deleting_absent_method_changes_nothing() {
    let ws = Workspace::new();
    ws.write("c.py", "class C:\n    def a(self):\n        pass\n");

    let mut orchestrator = ws.orchestrator();
    let staged = orchestrator.process([
        ChangeRequest::delete_method("c.py", "C", "missing"),
        ChangeRequest::delete_method("c.py", "Missing", "a"),
    ]);

    assert!(orchestrator.failures().is_empty());
    assert!(staged.is_empty());
}
