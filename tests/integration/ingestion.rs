//! Request files loaded from disk and run through the pipeline.

use super::Workspace;
use patchwright::{load_from_path, ChangeRequest, Operation, RecordIssue, RequestKind};

const REQUESTS: &str = r#"
[[request]]
kind = "element"
path = "app/models.py"
locator = "User.display_name"
mode = "merge"
body = """
def display_name(self):
    return self.name.title()
"""

[[request]]
kind = "operation"
path = "app/models.py"
operation = "delete_method"
class = "User"
method = "legacy"

[[request]]
kind = "operation"
path = "app/old_helpers.py"
operation = "move_file"
target = "app/helpers.py"

[[request]]
kind = "element"
path = "app/models.py"
locator = "User."
body = "def broken(self): pass"

[[request]]
kind = "operation"
path = "app/models.py"
operation = "delete_method"
class = "User"
"#;

const MODELS: &str = r#"class User:
    def __init__(self, name):
        self.name = name

    @property
    def display_name(self):
        return self.name

    def legacy(self):
        return None
"#;

#[test]
fn toml_requests_apply_in_order() {
    let ws = Workspace::new();
    ws.write("app/models.py", MODELS);
    ws.write("app/old_helpers.py", "def helper():\n    return 1\n");
    ws.write("requests.toml", REQUESTS);

    let report = load_from_path(&ws.path("requests.toml")).unwrap();
    assert_eq!(report.requests.len(), 3);
    assert_eq!(report.rejected.len(), 2);
    assert!(matches!(
        report.rejected[0],
        RecordIssue::InvalidLocator { index: 3, .. }
    ));
    assert!(matches!(
        report.rejected[1],
        RecordIssue::MissingField { index: 4, .. }
    ));
    assert_eq!(
        report.requests[2].kind,
        RequestKind::Operation(Operation::MoveFile {
            target: "app/helpers.py".into()
        })
    );

    let summary = ws.run(report.requests);

    assert!(summary.is_success());
    assert_eq!(
        summary.written,
        vec![ws.path("app/models.py"), ws.path("app/helpers.py")]
    );
    assert_eq!(
        ws.read("app/models.py"),
        r#"class User:
    def __init__(self, name):
        self.name = name

    @property
    def display_name(self):
        return self.name.title()
"#
    );
    assert_eq!(ws.read("app/helpers.py"), "def helper():\n    return 1\n");
    assert!(!ws.exists("app/old_helpers.py"));
}

#[test]
fn json_requests_match_toml() {
    let ws = Workspace::new();
    ws.write(
        "requests.json",
        r#"{"request": [
            {"kind": "full_file", "path": "index.js", "body": "export const answer = 42;\n"},
            {"kind": "operation", "path": "stale.js", "operation": "delete_file"}
        ]}"#,
    );

    let report = load_from_path(&ws.path("requests.json")).unwrap();
    assert!(report.rejected.is_empty());
    assert_eq!(
        report.requests,
        vec![
            ChangeRequest::full_file("index.js", "export const answer = 42;\n"),
            ChangeRequest::delete_file("stale.js"),
        ]
    );

    let summary = ws.run(report.requests);
    assert_eq!(summary.written, vec![ws.path("index.js")]);
    assert_eq!(ws.read("index.js"), "export const answer = 42;\n");
}
