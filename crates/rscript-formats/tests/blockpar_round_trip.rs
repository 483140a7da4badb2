#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Round-trip properties of the BlockPar codecs over generated documents
//!
//! Documents mix parameters and nested blocks, repeat names on purpose and
//! flip the sorted flag per block. Text values include CR/LF and the other
//! characters that force heredoc output, and now and then a `>>>` line that
//! the text writer has to refuse.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rscript_formats::blockpar::{
    BinaryLayout, BlockParError, Document, EntryKind, archive, binary, text,
};

#[derive(Debug, Clone)]
enum Node {
    Param(String),
    Block(bool, Vec<(String, Node)>),
}

fn node(value: BoxedStrategy<String>) -> impl Strategy<Value = Node> {
    value.prop_map(Node::Param).prop_recursive(4, 48, 6, |inner| {
        (
            any::<bool>(),
            prop::collection::vec(("[a-d]{1,3}", inner), 0..6),
        )
            .prop_map(|(sorted, entries)| Node::Block(sorted, entries))
    })
}

fn assemble(sorted: bool, entries: Vec<(String, Node)>) -> Document {
    let mut doc = Document::with_sorted(sorted);
    for (name, node) in entries {
        match node {
            Node::Param(value) => doc.set(name, value),
            Node::Block(sorted, children) => doc.set(name, assemble(sorted, children)),
        }
    }
    doc
}

fn document(value: BoxedStrategy<String>, root_sorted: Option<bool>) -> impl Strategy<Value = Document> {
    let sorted = match root_sorted {
        Some(flag) => Just(flag).boxed(),
        None => any::<bool>().boxed(),
    };
    (sorted, prop::collection::vec(("[a-d]{1,3}", node(value)), 0..8))
        .prop_map(|(sorted, entries)| assemble(sorted, entries))
}

fn binary_value() -> BoxedStrategy<String> {
    "\\PC{0,8}".boxed()
}

fn text_value() -> BoxedStrategy<String> {
    prop_oneof![
        15 => "[a-z =/{}<>~^\t\r\n]{0,10}",
        1 => "[a-z]{0,3}\r\n *>>> *\r?\n?[a-z]{0,3}",
    ]
    .boxed()
}

fn has_terminator_line(value: &str) -> bool {
    value
        .split('\n')
        .any(|line| line.trim_matches(['\t', '\n', '\r', ' ']) == ">>>")
}

#[derive(Clone, Copy)]
enum Walk {
    Default,
    Insertion,
    Sorted,
}

/// `(depth, name, kind, value)` for every entry, walking each block in `walk` order
fn flatten(doc: &Document, walk: Walk) -> Vec<(usize, String, EntryKind, String)> {
    let mut out = Vec::new();
    let mut stack = vec![(0usize, doc)];
    while let Some((depth, doc)) = stack.pop() {
        let entries: Vec<_> = match walk {
            Walk::Default => doc.iter().collect(),
            Walk::Insertion => doc.iter_insertion().collect(),
            Walk::Sorted => doc.iter_sorted().collect(),
        };
        for entry in entries.into_iter().rev() {
            out.push((
                depth,
                entry.name().to_string(),
                entry.kind(),
                entry.as_param().unwrap_or_default().to_string(),
            ));
            if let Some(child) = entry.as_block() {
                stack.push((depth + 1, child));
            }
        }
    }
    out
}

proptest! {
    #[test]
    fn binary_round_trip_plain(doc in document(binary_value(), None)) {
        let bytes = binary::build(&doc, BinaryLayout::Plain).unwrap();
        let decoded = binary::parse(&bytes, BinaryLayout::Plain).unwrap();
        prop_assert_eq!(flatten(&decoded, Walk::Insertion), flatten(&doc, Walk::Insertion));
        prop_assert_eq!(flatten(&decoded, Walk::Sorted), flatten(&doc, Walk::Sorted));
        prop_assert_eq!(decoded, doc);
    }

    #[test]
    fn binary_round_trip_grouped(doc in document(binary_value(), None)) {
        let bytes = binary::build(&doc, BinaryLayout::Grouped).unwrap();
        let decoded = binary::parse(&bytes, BinaryLayout::Grouped).unwrap();
        prop_assert_eq!(flatten(&decoded, Walk::Sorted), flatten(&doc, Walk::Sorted));
        prop_assert_eq!(decoded, doc);
    }

    #[test]
    fn text_round_trip(doc in document(text_value(), Some(true))) {
        let unrepresentable = flatten(&doc, Walk::Default)
            .iter()
            .any(|(_, _, kind, value)| {
                // a bare `>>>` still fits on a plain `name=value` line
                *kind == EntryKind::Param && value != ">>>" && has_terminator_line(value)
            });
        match text::format(&doc) {
            Ok(rendered) => {
                prop_assert!(!unrepresentable);
                let decoded = text::parse(&rendered).unwrap();
                prop_assert_eq!(flatten(&decoded, Walk::Default), flatten(&doc, Walk::Default));
                prop_assert_eq!(decoded, doc);
            }
            Err(BlockParError::UnrepresentableValue(_)) => prop_assert!(unrepresentable),
            Err(err) => prop_assert!(false, "unexpected error: {err}"),
        }
    }

    #[test]
    fn archive_round_trip(doc in document(binary_value(), None), seed in any::<i32>()) {
        let data = archive::build(&doc, seed).unwrap();
        prop_assert_eq!(archive::parse(&data).unwrap(), doc);
    }
}

#[test]
fn test_text_round_trip_with_crlf_and_duplicates() {
    let mut quest = Document::unsorted();
    quest.set("Step", "Talk to the governor");
    quest.set("Step", "Deliver the cargo");
    quest.set("Text", "Greetings, ranger.\r\nThe sector needs you.\r\n\r\nGood luck.");

    let mut doc = Document::new();
    doc.set("Quest", quest);
    doc.set("Id", "17");
    doc.set("Id", "18");

    let rendered = text::format(&doc).unwrap();
    assert_eq!(
        rendered,
        "Id=17\r\nId=18\r\nQuest~{\r\n    Step=Talk to the governor\r\n    Step=Deliver the cargo\r\n    \
         Text=<<<\r\n    Greetings, ranger.\r\n    The sector needs you.\r\n    \r\n    Good luck.\r\n    >>>\r\n}\r\n"
    );

    let decoded = text::parse(&rendered).unwrap();
    assert_eq!(decoded, doc);
    assert_eq!(
        decoded.get_param("Quest.Text").unwrap(),
        "Greetings, ranger.\r\nThe sector needs you.\r\n\r\nGood luck."
    );
}

#[test]
fn test_all_codecs_agree() {
    let listing = rscript_formats::blockpar::from_code("a;\n{\n  b;\n}\n").unwrap();

    let through_text = text::parse(&text::format(&listing).unwrap()).unwrap();
    let through_archive = archive::parse(&archive::build(&listing, 3).unwrap()).unwrap();

    // the text form has no root flag, so the text copy comes back sorted
    assert!(!listing.is_sorted());
    assert!(through_text.is_sorted());
    assert_eq!(through_text.get_param("1.0").unwrap(), "b;");
    assert_eq!(through_archive, listing);
}

#[test]
fn test_deep_text_nesting_is_iterative() {
    let depth = 3000;
    let mut text_doc = "n~{\r\n".repeat(depth);
    text_doc.push_str("leaf=1\r\n");
    text_doc.push_str(&"}\r\n".repeat(depth));

    let options = text::TextOptions::default().with_max_depth(depth + 1);
    let doc = text::parse_with(&text_doc, options).unwrap();

    let path = vec!["n"; depth].join(".") + ".leaf";
    assert_eq!(doc.get_param(&path).unwrap(), "1");

    let rendered = text::format(&doc).unwrap();
    assert_eq!(rendered.lines().count(), depth * 2 + 1);
}
