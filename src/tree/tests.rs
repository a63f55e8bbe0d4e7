//! Tree structure and fixture tests

use super::*;
use serde_json::json;

fn row(text: &str) -> NodeSpec {
    NodeSpec::element("tr").child(NodeSpec::element("td").with_text(text))
}

#[test]
fn new_document_has_head_and_body() {
    let doc = Document::new();
    assert_eq!(doc.tag(doc.root()), Some("html"));
    assert_eq!(doc.element_children(doc.root()), vec![doc.head(), doc.body()]);
    assert!(doc.is_connected(doc.body()));
}

#[test]
fn text_content_concatenates_in_document_order() {
    let mut doc = Document::new();
    let div = doc.append_element(doc.body(), Element::new("div")).unwrap();
    doc.append_text(div, "#123.4 ").unwrap();
    let a = doc.append_element(div, Element::new("a")).unwrap();
    doc.append_text(a, "feat: ECP-1").unwrap();
    doc.append_text(div, " tail").unwrap();

    assert_eq!(doc.text_content(div), "#123.4 feat: ECP-1 tail");
    assert_eq!(doc.text_content(a), "feat: ECP-1");
}

#[test]
fn remove_drops_subtree_and_ids_are_not_reused() {
    let mut doc = Document::from_specs(&[row("ECP-1")]).unwrap();
    let tr = doc.element_children(doc.body())[0];
    let td = doc.element_children(tr)[0];
    let before = doc.node_count();

    doc.remove(tr).unwrap();
    assert!(!doc.contains(tr));
    assert!(!doc.contains(td));
    assert_eq!(doc.node_count(), before - 3);

    let replacement = doc.append_element(doc.body(), Element::new("tr")).unwrap();
    assert!(replacement > td);
}

#[test]
fn detached_nodes_are_not_connected() {
    let mut doc = Document::new();
    let span = doc.create_element("span");
    assert!(!doc.is_connected(span));
    doc.append_child(doc.body(), span).unwrap();
    assert!(doc.is_connected(span));
    doc.detach(span).unwrap();
    assert!(!doc.is_connected(span));
    assert!(doc.contains(span));
}

#[test]
fn append_child_rejects_cycles_and_text_parents() {
    let mut doc = Document::new();
    let outer = doc.append_element(doc.body(), Element::new("div")).unwrap();
    let inner = doc.append_element(outer, Element::new("div")).unwrap();
    let text = doc.append_text(inner, "x").unwrap();

    assert_eq!(
        doc.append_child(inner, outer),
        Err(TreeError::Cycle { parent: inner, child: outer })
    );
    assert_eq!(doc.append_child(text, outer), Err(TreeError::NotAnElement(text)));
    assert_eq!(doc.detach(doc.root()), Err(TreeError::RootDetach));
}

#[test]
fn append_child_moves_existing_node() {
    let mut doc = Document::new();
    let a = doc.append_element(doc.body(), Element::new("div")).unwrap();
    let b = doc.append_element(doc.body(), Element::new("div")).unwrap();
    let span = doc.append_element(a, Element::new("span")).unwrap();

    doc.append_child(b, span).unwrap();
    assert!(doc.children(a).is_empty());
    assert_eq!(doc.parent(span), Some(b));
}

#[test]
fn descendants_are_preorder() {
    let doc = Document::from_specs(&[
        NodeSpec::element("table").child(row("a")).child(row("b"))
    ])
    .unwrap();
    let tags: Vec<_> = doc
        .descendants(doc.body())
        .into_iter()
        .filter_map(|n| doc.tag(n).map(str::to_string))
        .collect();
    assert_eq!(tags, ["table", "tr", "td", "tr", "td"]);
}

#[test]
fn closest_includes_self() {
    let doc = Document::from_specs(&[NodeSpec::element("div")
        .class("build-list")
        .child(NodeSpec::element("span").class("build-name").with_text("x"))])
    .unwrap();
    let div = doc.element_children(doc.body())[0];
    let span = doc.element_children(div)[0];

    assert_eq!(doc.closest(span, |el| el.class_contains("build")), Some(span));
    assert_eq!(doc.closest(span, |el| el.is("div")), Some(div));
    assert_eq!(doc.closest(span, |el| el.is("table")), None);
}

#[test]
fn set_text_replaces_element_children() {
    let mut doc = Document::from_specs(&[row("ECP-1")]).unwrap();
    let tr = doc.element_children(doc.body())[0];
    let td = doc.element_children(tr)[0];
    doc.set_text(td, "ECP-2").unwrap();
    assert_eq!(doc.text_content(tr), "ECP-2");
    assert_eq!(doc.children(td).len(), 1);
}

#[test]
fn node_spec_deserializes_from_json() {
    let spec: NodeSpec = serde_json::from_value(json!({
        "tag": "TR",
        "class": "run-row selected",
        "attrs": {"data-testid": "run-1"},
        "children": [{"tag": "td", "children": ["#1.2 • fix: IP-7"]}]
    }))
    .unwrap();

    let doc = Document::from_specs(&[spec]).unwrap();
    let tr = doc.element_children(doc.body())[0];
    let el = doc.element(tr).unwrap();
    assert_eq!(el.tag, "tr");
    assert!(el.has_class("selected"));
    assert_eq!(doc.attribute(tr, "data-testid"), Some("run-1"));
    assert_eq!(doc.text_content(tr), "#1.2 • fix: IP-7");
}

#[test]
fn markup_renders_attributes_and_text() {
    let doc = Document::from_specs(&[NodeSpec::element("a")
        .attr("href", "/x")
        .with_text("ECP-1")])
    .unwrap();
    let a = doc.element_children(doc.body())[0];
    assert_eq!(doc.to_markup(a), "<a href=\"/x\">\n  ECP-1\n</a>\n");
}
