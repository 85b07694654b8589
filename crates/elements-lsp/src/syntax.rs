//! Small tree-sitter walking helpers shared by the markup extractors.

use tree_sitter::Node;

/// Visit `root` and its descendants in document order.
///
/// `visit` returns whether to descend into the node's children.
pub(crate) fn walk_nodes<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>) -> bool) {
    let mut cursor = root.walk();
    loop {
        let descend = visit(cursor.node());
        if descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Source text of `node`, or `""` if its range does not fall on char boundaries.
pub(crate) fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// First direct child of `node` with the given kind.
pub(crate) fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|child| child.kind() == kind)
}

/// An attribute of a start tag.
#[derive(Debug, Clone)]
pub(crate) struct RawAttribute<'t> {
    pub name: Node<'t>,
    /// Unquoted value text, if the attribute has a value.
    pub value: Option<String>,
}

/// Attributes of a `start_tag` / `self_closing_tag` node.
pub(crate) fn tag_attributes<'t>(tag: Node<'t>, source: &str) -> Vec<RawAttribute<'t>> {
    let mut cursor = tag.walk();
    tag.children(&mut cursor)
        .filter(|child| child.kind() == "attribute")
        .filter_map(|attribute| {
            let name = child_of_kind(attribute, "attribute_name")?;
            let value = attribute_value(attribute, source);
            Some(RawAttribute { name, value })
        })
        .collect()
}

fn attribute_value(attribute: Node<'_>, source: &str) -> Option<String> {
    if let Some(value) = child_of_kind(attribute, "attribute_value") {
        return Some(node_text(value, source).to_string());
    }
    let quoted = child_of_kind(attribute, "quoted_attribute_value")?;
    // `""` has no inner value node.
    Some(
        child_of_kind(quoted, "attribute_value")
            .map(|value| node_text(value, source).to_string())
            .unwrap_or_default(),
    )
}
