//! Property tests for the merge engine and diff producer.

use patchwright::diff;
use patchwright::locator::{locate, Location};
use patchwright::merge::{compute, Mode};
use patchwright::validate::validate;
use patchwright::{ElementLocator, PythonSyntax, SyntaxCapability};
use proptest::prelude::*;

fn apply(content: &str, locator: &ElementLocator, body: &str, mode: Mode) -> String {
    let tree = PythonSyntax.parse(content).unwrap();
    let location = locate(&tree, locator);
    match compute(&PythonSyntax, content, locator, &location, body, mode).unwrap() {
        Some(edit) => edit.apply_to(content).unwrap(),
        None => content.to_string(),
    }
}

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,8}".prop_map(|s| format!("m_{s}"))
}

fn class_source(methods: &[(String, u32)]) -> String {
    let mut source = String::from("class Widget:\n");
    if methods.is_empty() {
        source.push_str("    pass\n");
    }
    for (i, (name, value)) in methods.iter().enumerate() {
        if i > 0 {
            source.push('\n');
        }
        source.push_str(&format!("    def {name}(self):\n        return {value}\n"));
    }
    source
}

proptest! {
    #[test]
    fn replace_is_idempotent(
        methods in prop::collection::vec((ident(), 0u32..1000), 0..5),
        target in ident(),
        value in 0u32..1000,
        mode in prop_oneof![Just(Mode::Replace), Just(Mode::Merge)],
    ) {
        let source = class_source(&methods);
        let locator = ElementLocator::member("Widget", target.clone());
        let body = format!("def {target}(self):\n    return {value}\n");

        let once = apply(&source, &locator, &body, mode);
        let twice = apply(&once, &locator, &body, mode);
        prop_assert_eq!(&once, &twice);
        prop_assert!(validate(&PythonSyntax, &once).is_ok());
    }

    #[test]
    fn written_element_is_found_again(
        methods in prop::collection::vec((ident(), 0u32..1000), 0..5),
        target in ident(),
    ) {
        let source = class_source(&methods);
        let locator = ElementLocator::member("Widget", target.clone());
        let body = format!("def {target}(self):\n    return None\n");

        let out = apply(&source, &locator, &body, Mode::Replace);
        let tree = PythonSyntax.parse(&out).unwrap();
        match locate(&tree, &locator) {
            Location::Found { node, .. } => {
                prop_assert_eq!(node.text(&out), format!("def {target}(self):\n        return None"));
            }
            Location::Absent(_) => prop_assert!(false, "{} not found in\n{}", locator, out),
        }
    }

    #[test]
    fn diff_counts_match_line_changes(
        lines in prop::collection::vec("[a-z ]{0,12}", 0..20),
        extra in prop::collection::vec("[A-Z]{1,6}", 0..5),
    ) {
        let original: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let working = format!("{original}{}", extra.iter().map(|l| format!("{l}\n")).collect::<String>());

        let unchanged = diff::diff(&original, &original);
        prop_assert!(unchanged.is_empty());

        let appended = diff::diff(&original, &working);
        prop_assert_eq!(appended.insertions(), extra.len());
        prop_assert_eq!(appended.deletions(), 0);
    }
}
