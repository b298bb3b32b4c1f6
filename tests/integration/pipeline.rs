//! Element requests end to end: locate, replace, merge, insert, split,
//! validate and commit.

use super::Workspace;
use patchwright::{
    ChangeRequest, ElementLocator, EngineError, Mode, RequestError, SessionStatus,
};

fn element(path: &str, locator: &str, mode: Mode, body: &str) -> ChangeRequest {
    ChangeRequest::element(path, locator.parse::<ElementLocator>().unwrap(), mode, body)
}

#[test]
fn replaces_method_body_and_validates() {
    let ws = Workspace::new();
    ws.write("c.py", "class C:\n    def m(self):\n        return 1\n");

    let summary = ws.run(vec![element(
        "c.py",
        "C.m",
        Mode::Replace,
        "def m(self): return 2",
    )]);

    assert!(summary.is_success());
    assert_eq!(summary.written, vec![ws.path("c.py")]);
    let content = ws.read("c.py");
    assert_eq!(content, "class C:\n    def m(self): return 2\n");
    assert!(!content.contains("return 1"));
}

#[test]
fn replace_twice_equals_once() {
    let ws = Workspace::new();
    ws.write(
        "svc.py",
        "class Service:\n    @staticmethod\n    def ping():\n        return 'pong'\n",
    );
    let request = || element("svc.py", "Service.ping", Mode::Replace, "def ping():\n    return 'PONG'\n");

    ws.run(vec![request()]);
    let once = ws.read("svc.py");

    let summary = ws.run(vec![request()]);
    assert!(summary.written.is_empty());
    assert_eq!(ws.read("svc.py"), once);

    let mut orchestrator = ws.orchestrator();
    assert!(orchestrator.process([request(), request()]).is_empty());
}

#[test]
fn merge_keeps_or_swaps_decorators() {
    let ws = Workspace::new();
    let source = "class C:\n    @A\n    @B\n    def m(self):\n        return 1\n";
    ws.write("keep.py", source);
    ws.write("swap.py", source);

    let summary = ws.run(vec![
        element("keep.py", "C.m", Mode::Merge, "def m(self):\n    return 2\n"),
        element("swap.py", "C.m", Mode::Merge, "@C\ndef m(self):\n    return 2\n"),
    ]);

    assert_eq!(summary.written.len(), 2);
    assert_eq!(
        ws.read("keep.py"),
        "class C:\n    @A\n    @B\n    def m(self):\n        return 2\n"
    );
    assert_eq!(
        ws.read("swap.py"),
        "class C:\n    @C\n    def m(self):\n        return 2\n"
    );
}

#[test]
fn absent_elements_are_appended_to_their_scope() {
    let ws = Workspace::new();
    ws.write(
        "app.py",
        "class C:\n    def a(self):\n        pass\n\n\ndef f():\n    pass\n",
    );

    let summary = ws.run(vec![
        element("app.py", "C.b", Mode::Replace, "def b(self):\n    return 1\n"),
        element("app.py", "g", Mode::Replace, "def g():\n    return 2\n"),
    ]);

    assert!(summary.is_success());
    assert_eq!(
        ws.read("app.py"),
        "class C:\n    def a(self):\n        pass\n\n    def b(self):\n        return 1\n\n\ndef f():\n    pass\n\n\ndef g():\n    return 2\n"
    );

    // Both are now found and replaced in place rather than appended again.
    let summary = ws.run(vec![
        element("app.py", "C.b", Mode::Replace, "def b(self):\n    return 10\n"),
        element("app.py", "g", Mode::Replace, "def g():\n    return 20\n"),
    ]);
    assert_eq!(summary.written.len(), 1);
    let content = ws.read("app.py");
    assert_eq!(content.matches("def b(self)").count(), 1);
    assert_eq!(content.matches("def g()").count(), 1);
    assert!(content.contains("        return 10\n"));
    assert!(content.ends_with("def g():\n    return 20\n"));
}

#[test]
fn later_requests_see_earlier_ones() {
    let ws = Workspace::new();
    let summary = ws.run(vec![
        element("new.py", "f", Mode::Replace, "def f():\n    return 1\n"),
        element("new.py", "f", Mode::Replace, "def f():\n    return 2\n"),
    ]);

    assert_eq!(summary.written, vec![ws.path("new.py")]);
    assert_eq!(ws.read("new.py"), "def f():\n    return 2\n");
}

#[test]
fn multi_definition_body_is_split() {
    let ws = Workspace::new();
    ws.write("lib.py", "def f():\n    return 0\n");

    let summary = ws.run(vec![element(
        "lib.py",
        "f",
        Mode::Replace,
        "def f():\n    return 1\n\n\ndef g():\n    return 2\n\n\nclass H:\n    pass\n",
    )]);

    assert!(summary.is_success());
    assert_eq!(
        ws.read("lib.py"),
        "def f():\n    return 1\n\n\ndef g():\n    return 2\n\n\nclass H:\n    pass\n"
    );
}

#[test]
fn method_list_lands_in_class() {
    let ws = Workspace::new();
    ws.write("c.py", "class C:\n    def a(self):\n        return 0\n");

    ws.run(vec![element(
        "c.py",
        "C.a",
        Mode::Replace,
        "def a(self):\n    return 1\n\ndef b(self):\n    return 2\n",
    )]);

    assert_eq!(
        ws.read("c.py"),
        "class C:\n    def a(self):\n        return 1\n\n    def b(self):\n        return 2\n"
    );
}

#[test]
fn invalid_file_rolls_back_while_others_are_written() {
    let ws = Workspace::new();
    ws.write("good.py", "x = 1\n");
    ws.write("bad.py", "y = 1\n");

    let summary = ws.run(vec![
        ChangeRequest::full_file("good.py", "x = 2\n"),
        ChangeRequest::full_file("bad.py", "def broken(:\n    pass\n"),
    ]);

    assert!(!summary.is_success());
    assert_eq!(summary.written, vec![ws.path("good.py")]);
    assert_eq!(summary.rolled_back.len(), 1);
    let (path, reason) = &summary.rolled_back[0];
    assert_eq!(path, &ws.path("bad.py"));
    assert!(reason.contains("does not parse"), "{reason}");

    assert_eq!(ws.read("good.py"), "x = 2\n");
    assert_eq!(ws.read("bad.py"), "y = 1\n");
}

#[test]
fn unparsable_body_fails_only_its_request() {
    let ws = Workspace::new();
    ws.write("a.py", "def f():\n    return 1\n");

    let mut orchestrator = ws.orchestrator();
    let staged = orchestrator.process([
        element("a.py", "f", Mode::Replace, "def f(:\n    return\n"),
        element("a.py", "g", Mode::Replace, "def g():\n    return 2\n"),
    ]);

    assert_eq!(orchestrator.failures().len(), 1);
    let failure = &orchestrator.failures()[0];
    assert_eq!(failure.index, 0);
    assert!(matches!(
        failure.error,
        RequestError::Engine(EngineError::ParseFailure { .. })
    ));

    assert_eq!(staged.len(), 1);
    assert!(staged[0].working.contains("def f():\n    return 1\n"));
    assert!(staged[0].working.ends_with("def g():\n    return 2\n"));
}

#[test]
fn element_requests_need_a_grammar() {
    let ws = Workspace::new();

    let summary = ws.run(vec![
        element("notes.txt", "f", Mode::Replace, "def f(): pass"),
        ChangeRequest::full_file("notes.txt", "anything {{ goes\n"),
    ]);

    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(
        summary.failures[0].error,
        RequestError::UnsupportedLanguage { .. }
    ));
    assert_eq!(summary.written, vec![ws.path("notes.txt")]);
    assert_eq!(ws.read("notes.txt"), "anything {{ goes\n");
}

#[test]
fn externally_modified_file_is_skipped() {
    let ws = Workspace::new();
    ws.write("a.py", "x = 1\n");

    let mut orchestrator = ws.orchestrator();
    orchestrator.process([ChangeRequest::full_file("a.py", "x = 2\n")]);
    let confirmed = orchestrator.confirm_with(&mut patchwright::ApproveAll);

    ws.write("a.py", "x = 3\n");
    let summary = orchestrator.commit(&confirmed);

    assert!(summary.written.is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].1.contains("modified externally"));
    assert_eq!(ws.read("a.py"), "x = 3\n");

    let statuses: Vec<_> = orchestrator.sessions().map(|s| s.status().clone()).collect();
    assert!(matches!(statuses[0], SessionStatus::Skipped { .. }));
}

#[test]
fn declined_files_stay_untouched() {
    let ws = Workspace::new();
    ws.write("a.py", "x = 1\n");

    let mut orchestrator = ws.orchestrator();
    let staged = orchestrator.process([ChangeRequest::full_file("a.py", "x = 2\n")]);
    assert_eq!(staged[0].diff.insertions(), 1);
    assert_eq!(staged[0].diff.deletions(), 1);
    assert!(staged[0].unified_diff().contains("+x = 2"));

    let summary = orchestrator.commit(&Default::default());
    assert_eq!(summary.skipped[0].1, "not confirmed");
    assert_eq!(ws.read("a.py"), "x = 1\n");
}

#[test]
fn typescript_method_is_inserted() {
    let ws = Workspace::new();
    ws.write(
        "src/service.ts",
        "export class Service {\n  constructor(private readonly repo: Repo) {}\n\n  list(): Item[] {\n    return this.repo.all();\n  }\n}\n",
    );

    let summary = ws.run(vec![element(
        "src/service.ts",
        "Service.find",
        Mode::Merge,
        "find(id: string): Item | undefined {\n  return this.repo.get(id);\n}\n",
    )]);

    assert!(summary.is_success());
    assert!(ws.read("src/service.ts").ends_with(
        "  }\n\n  find(id: string): Item | undefined {\n    return this.repo.get(id);\n  }\n}\n"
    ));
}

#[test]
fn javascript_function_replaced_in_place() {
    let ws = Workspace::new();
    ws.write(
        "util.js",
        "// Adds two numbers.\nfunction add(a, b) {\n  return a + b;\n}\n\nmodule.exports = { add };\n",
    );

    ws.run(vec![element(
        "util.js",
        "add",
        Mode::Merge,
        "function add(a, b) {\n  return b + a;\n}",
    )]);

    assert_eq!(
        ws.read("util.js"),
        "// Adds two numbers.\nfunction add(a, b) {\n  return b + a;\n}\n\nmodule.exports = { add };\n"
    );
}

#[test]
fn multiline_string_contents_are_kept() {
    let ws = Workspace::new();
    ws.write("c.py", "class C:\n    def m(self):\n        return 1\n");

    let summary = ws.run(vec![element(
        "c.py",
        "C.m",
        Mode::Replace,
        "def m(self):\n    s = \"\"\"a\nb\"\"\"\n",
    )]);

    assert!(summary.is_success());
    assert_eq!(
        ws.read("c.py"),
        "class C:\n    def m(self):\n        s = \"\"\"a\nb\"\"\"\n"
    );
}

#[test]
fn template_literal_lines_are_kept() {
    let ws = Workspace::new();
    ws.write("view.js", "class View {\n  title() {\n    return 'x';\n  }\n}\n");

    let summary = ws.run(vec![element(
        "view.js",
        "View.render",
        Mode::Merge,
        "render() {\n  return `<div>\n<p>${this.title()}</p>\n</div>`;\n}",
    )]);

    assert!(summary.is_success());
    assert_eq!(
        ws.read("view.js"),
        "class View {\n  title() {\n    return 'x';\n  }\n\n  render() {\n    return `<div>\n<p>${this.title()}</p>\n</div>`;\n  }\n}\n"
    );
}

#[test]
fn arrow_function_field_is_replaced() {
    let ws = Workspace::new();
    ws.write("widget.js", "class W {\n  handle = () => {\n    return 1;\n  };\n}\n");

    let summary = ws.run(vec![element(
        "widget.js",
        "W.handle",
        Mode::Replace,
        "handle = () => {\n  return 2;\n};",
    )]);

    assert!(summary.is_success());
    let content = ws.read("widget.js");
    assert_eq!(content, "class W {\n  handle = () => {\n    return 2;\n  };\n}\n");
    assert_eq!(content.matches("handle").count(), 1);
}

#[test]
fn export_survives_body_without_it() {
    let ws = Workspace::new();
    ws.write(
        "lib.ts",
        "export function f(): number {\n  return 1;\n}\n\nexport default class App {}\n",
    );

    let summary = ws.run(vec![
        element("lib.ts", "f", Mode::Replace, "function f(): number {\n  return 2;\n}"),
        element("lib.ts", "App", Mode::Merge, "class App {\n  run() {}\n}"),
    ]);

    assert!(summary.is_success());
    assert_eq!(
        ws.read("lib.ts"),
        "export function f(): number {\n  return 2;\n}\n\nexport default class App {\n  run() {}\n}\n"
    );
}

#[test]
fn class_merge_keeps_members_the_body_omits() {
    let ws = Workspace::new();
    ws.write(
        "k.py",
        "class K:\n    x: int = 1\n\n    def run(self):\n        return self.x\n",
    );

    let summary = ws.run(vec![element(
        "k.py",
        "K",
        Mode::Merge,
        "class K:\n    x: int = 2\n    y: str = ''\n",
    )]);

    assert!(summary.is_success());
    assert_eq!(
        ws.read("k.py"),
        "class K:\n    x: int = 2\n    y: str = ''\n\n    def run(self):\n        return self.x\n"
    );
}
