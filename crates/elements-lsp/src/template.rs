//! HTML embedded in TypeScript template literals.
//!
//! Recognised templates are `html`/`svg` tagged templates (including `lit.html` and
//! `html<T>`) and templates assigned to `innerHTML`.

use crate::handler::new_parser;
use crate::syntax::{node_text, walk_nodes};
use elements_core::LanguageId;
use parking_lot::Mutex;
use std::ops::Range as ByteRange;
use tree_sitter::{Node, Parser, Tree};

const TEMPLATE_TAGS: [&str; 2] = ["html", "svg"];

/// One embedded HTML template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRegion {
    /// Bytes between the backticks.
    pub span: ByteRange<usize>,
    /// `${...}` substitutions inside `span`, in document bytes.
    pub substitutions: Vec<ByteRange<usize>>,
    /// Whether the template is `html`/`svg` tagged. Binding sigils only apply in tagged
    /// templates; `innerHTML` assignments hold plain markup.
    pub tagged: bool,
}

impl TemplateRegion {
    /// Whether `offset` is template markup (inside the backticks and not inside a substitution).
    pub fn contains_markup(&self, offset: usize) -> bool {
        self.span.start <= offset
            && offset <= self.span.end
            && !self
                .substitutions
                .iter()
                .any(|sub| sub.start < offset && offset < sub.end)
    }

    /// Template text with substitutions masked, byte-for-byte aligned with `span`.
    ///
    /// Substitution bytes become `_` (newlines are kept) so they read as one opaque attribute
    /// value or text run.
    pub fn masked_text(&self, content: &str) -> String {
        let Some(text) = content.get(self.span.clone()) else {
            return String::new();
        };
        let mut bytes = text.as_bytes().to_vec();
        for sub in &self.substitutions {
            let start = sub.start.saturating_sub(self.span.start);
            let end = sub.end.saturating_sub(self.span.start).min(bytes.len());
            for byte in bytes.iter_mut().take(end).skip(start) {
                if *byte != b'\n' {
                    *byte = b'_';
                }
            }
        }
        // Masking whole substitutions replaces every byte of any multi-byte char with ASCII.
        String::from_utf8(bytes).unwrap_or_default()
    }
}

fn is_template_tag(function: Node<'_>, content: &str) -> bool {
    match function.kind() {
        "identifier" => TEMPLATE_TAGS.contains(&node_text(function, content)),
        "member_expression" => function
            .child_by_field_name("property")
            .is_some_and(|p| TEMPLATE_TAGS.contains(&node_text(p, content))),
        _ => false,
    }
}

/// `Some(true)` for a tagged template, `Some(false)` for an `innerHTML` assignment.
fn markup_template_kind(template: Node<'_>, content: &str) -> Option<bool> {
    let parent = template.parent()?;
    match parent.kind() {
        "call_expression" => parent
            .child_by_field_name("function")
            .is_some_and(|f| is_template_tag(f, content))
            .then_some(true),
        "assignment_expression" | "augmented_assignment_expression" => parent
            .child_by_field_name("left")
            .filter(|left| left.kind() == "member_expression")
            .and_then(|left| left.child_by_field_name("property"))
            .is_some_and(|p| node_text(p, content) == "innerHTML")
            .then_some(false),
        _ => None,
    }
}

fn region_for(template: Node<'_>, tagged: bool) -> TemplateRegion {
    let start = template.start_byte() + 1;
    let mut cursor = template.walk();
    let children: Vec<_> = template.children(&mut cursor).collect();
    // A recovered template may end in a zero-width missing backtick.
    let closed = children
        .last()
        .is_some_and(|last| last.kind() == "`" && !last.is_missing() && last.start_byte() >= start);
    let end = if closed {
        template.end_byte() - 1
    } else {
        template.end_byte()
    };
    let substitutions = children
        .iter()
        .filter(|child| child.kind() == "template_substitution")
        .map(|child| child.byte_range())
        .collect();
    TemplateRegion {
        span: start..end.max(start),
        substitutions,
        tagged,
    }
}

/// Every markup template in a TypeScript / TSX tree, in document order.
pub fn find_html_templates(tree: &Tree, content: &str) -> Vec<TemplateRegion> {
    let mut regions = Vec::new();
    walk_nodes(tree.root_node(), |node| {
        if node.kind() == "template_string"
            && let Some(tagged) = markup_template_kind(node, content)
        {
            regions.push(region_for(node, tagged));
        }
        true
    });
    regions
}

/// The innermost markup template whose markup contains `offset`.
pub fn template_at(tree: &Tree, content: &str, offset: usize) -> Option<TemplateRegion> {
    find_html_templates(tree, content)
        .into_iter()
        .filter(|region| region.contains_markup(offset))
        .min_by_key(|region| region.span.len())
}

/// Heuristic for a template whose closing backtick has not been typed yet.
///
/// Returns where the template's markup starts when an odd number of unescaped backticks precede
/// `offset` and the last one directly follows an `html`/`svg` tag.
pub fn in_unterminated_template(content: &str, offset: usize) -> Option<usize> {
    let before = content.get(..offset)?;
    let mut last_open = None;
    let mut open = false;
    let mut escaped = false;
    for (idx, ch) in before.char_indices() {
        match ch {
            '\\' if !escaped => {
                escaped = true;
                continue;
            }
            '`' if !escaped => {
                open = !open;
                if open {
                    last_open = Some(idx);
                }
            }
            _ => {}
        }
        escaped = false;
    }
    let start = last_open.filter(|_| open)?;
    let tag = before[..start].trim_end();
    let tag = tag.strip_suffix('>').map_or(tag, |generic| {
        generic.rfind('<').map_or(generic, |i| &generic[..i])
    });
    TEMPLATE_TAGS
        .iter()
        .any(|t| {
            tag.ends_with(t)
                && !tag[..tag.len() - t.len()]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        })
        .then_some(start + 1)
}

/// A lazily created HTML parser for template content.
#[derive(Default)]
pub struct TemplateParser {
    parser: Mutex<Option<Parser>>,
}

impl std::fmt::Debug for TemplateParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateParser").finish_non_exhaustive()
    }
}

impl TemplateParser {
    /// Create an idle template parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse template markup as HTML.
    pub fn parse(&self, markup: &str) -> Option<Tree> {
        let mut slot = self.parser.lock();
        if slot.is_none() {
            match new_parser(LanguageId::Html) {
                Ok(parser) => *slot = Some(parser),
                Err(err) => {
                    tracing::warn!(error = %err, "template parser unavailable");
                    return None;
                }
            }
        }
        slot.as_mut()?.parse(markup, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ts_tree(source: &str) -> Tree {
        new_parser(LanguageId::TypeScript)
            .unwrap()
            .parse(source, None)
            .unwrap()
    }

    #[test]
    fn test_finds_tagged_and_inner_html_templates() {
        let source = "const a = html`<x-a></x-a>`;\n\
                      const b = svg`<circle/>`;\n\
                      const c = lit.html`<x-c></x-c>`;\n\
                      el.innerHTML = `<x-d></x-d>`;\n\
                      const e = `<x-e></x-e>`;\n\
                      const f = css`:host{}`;\n";
        let tree = ts_tree(source);
        let texts: Vec<_> = find_html_templates(&tree, source)
            .into_iter()
            .map(|r| (source[r.span].to_string(), r.tagged))
            .collect();
        assert_eq!(
            texts,
            vec![
                ("<x-a></x-a>".to_string(), true),
                ("<circle/>".to_string(), true),
                ("<x-c></x-c>".to_string(), true),
                ("<x-d></x-d>".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_substitutions_are_not_markup() {
        let source = "html`<x-a .value=${this.v}></x-a>`";
        let tree = ts_tree(source);
        let region = find_html_templates(&tree, source).remove(0);
        let inside_sub = source.find("this").unwrap();
        assert!(!region.contains_markup(inside_sub));
        assert!(region.contains_markup(source.find("x-a").unwrap()));
        assert_eq!(region.masked_text(source), "<x-a .value=_________></x-a>");
    }

    #[test]
    fn test_unterminated_template_heuristic() {
        let source = "const t = html`<my-button @cli";
        assert_eq!(
            in_unterminated_template(source, source.len()),
            Some(source.find('`').unwrap() + 1)
        );
        assert_eq!(in_unterminated_template("const s = `<my-b", 16), None);
        assert_eq!(in_unterminated_template("const t = html`<a>`; x", 22), None);
        assert_eq!(in_unterminated_template("xhtml`<a", 8), None);
    }
}
