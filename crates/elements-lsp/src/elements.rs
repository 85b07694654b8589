//! Custom element occurrences and insertion points.

use crate::completion::is_custom_element_tag;
use crate::document::DocumentSnapshot;
use crate::syntax::{child_of_kind, node_text, tag_attributes, walk_nodes};
use crate::template::{TemplateParser, find_html_templates};
use elements_core::LanguageId;
use elements_core::position::{Position, Range, byte_to_position, bytes_to_range};
use tree_sitter::Tree;

/// An attribute on a custom element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    /// Attribute name as written (including any binding sigil).
    pub name: String,
    /// Unquoted value, if the attribute has one.
    pub value: Option<String>,
    /// Range of the attribute name.
    pub range: Range,
}

/// One occurrence of a custom element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomElementMatch {
    /// Tag name.
    pub tag_name: String,
    /// Range of the tag name in the start tag.
    pub range: Range,
    /// Attributes in source order.
    pub attributes: Vec<AttributeMatch>,
}

/// Collect custom elements from an HTML tree of `markup`, mapping ranges through `to_document`.
fn collect_elements(
    tree: &Tree,
    markup: &str,
    to_document: &dyn Fn(std::ops::Range<usize>) -> Range,
    out: &mut Vec<CustomElementMatch>,
) {
    walk_nodes(tree.root_node(), |node| {
        if !matches!(node.kind(), "start_tag" | "self_closing_tag") {
            return true;
        }
        let Some(name_node) = child_of_kind(node, "tag_name") else {
            return false;
        };
        let tag_name = node_text(name_node, markup);
        if is_custom_element_tag(tag_name) {
            out.push(CustomElementMatch {
                tag_name: tag_name.to_string(),
                range: to_document(name_node.byte_range()),
                attributes: tag_attributes(node, markup)
                    .into_iter()
                    .map(|attribute| AttributeMatch {
                        name: node_text(attribute.name, markup).to_string(),
                        value: attribute.value,
                        range: to_document(attribute.name.byte_range()),
                    })
                    .collect(),
            });
        }
        false
    });
}

/// Every custom element in the document, in document order.
///
/// Script documents contribute the elements of their markup templates.
pub fn find_custom_elements(
    snapshot: &DocumentSnapshot,
    templates: &TemplateParser,
) -> Vec<CustomElementMatch> {
    let content = snapshot.content();
    let Some(tree) = snapshot.tree.as_ref() else {
        return Vec::new();
    };

    let mut elements = Vec::new();
    match snapshot.language {
        LanguageId::Html => {
            collect_elements(tree, content, &|span| bytes_to_range(content, span), &mut elements);
        }
        LanguageId::TypeScript | LanguageId::Tsx => {
            for region in find_html_templates(tree, content) {
                let markup = region.masked_text(content);
                let Some(embedded) = templates.parse(&markup) else {
                    continue;
                };
                let base = region.span.start;
                let to_document = |span: std::ops::Range<usize>| {
                    bytes_to_range(content, base + span.start..base + span.end)
                };
                collect_elements(&embedded, &markup, &to_document, &mut elements);
            }
        }
    }
    elements
}

/// The custom element whose tag name contains `position`.
pub fn element_at(
    snapshot: &DocumentSnapshot,
    templates: &TemplateParser,
    position: Position,
) -> Option<CustomElementMatch> {
    find_custom_elements(snapshot, templates)
        .into_iter()
        .find(|element| element.range.contains(position))
}

/// The custom element attribute whose name contains `position`, with its element's tag name.
pub fn attribute_at(
    snapshot: &DocumentSnapshot,
    templates: &TemplateParser,
    position: Position,
) -> Option<(AttributeMatch, String)> {
    find_custom_elements(snapshot, templates)
        .into_iter()
        .find_map(|element| {
            let tag_name = element.tag_name;
            element
                .attributes
                .into_iter()
                .find(|attribute| attribute.range.contains(position))
                .map(|attribute| (attribute, tag_name))
        })
}

/// Where to insert a module import.
///
/// Markup: the start of the line where the first inline module script's content ends. Scripts:
/// the end of the document.
pub fn module_script_insertion(snapshot: &DocumentSnapshot) -> Option<Position> {
    match snapshot.language {
        LanguageId::Html => snapshot
            .script_tags
            .iter()
            .filter(|tag| tag.is_inline_module())
            .find_map(|tag| tag.content_range)
            .map(|range| Position::new(range.end.line, 0)),
        LanguageId::TypeScript | LanguageId::Tsx => {
            Some(byte_to_position(snapshot.content(), snapshot.content().len()))
        }
    }
}

/// Start of the line containing `</head>` (markup only).
pub fn head_insertion_point(snapshot: &DocumentSnapshot) -> Option<Position> {
    if snapshot.language != LanguageId::Html {
        return None;
    }
    snapshot
        .content()
        .lines()
        .position(|line| line.contains("</head>"))
        .map(|line| Position::new(line as u32, 0))
}
