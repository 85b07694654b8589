//! What is being completed at a cursor position.
//!
//! Markup is classified from the syntax tree when the tree can locate the tag around the cursor,
//! and from the text of the current line otherwise (unclosed tags, half-typed attributes).
//! TypeScript and TSX documents are analyzed inside their `html`/`svg` templates, where Lit
//! binding sigils (`@event`, `.property`, `?boolean`) are recognised.

use crate::document::DocumentSnapshot;
use crate::template::{TemplateParser, in_unterminated_template, template_at};
use elements_core::LanguageId;
use elements_core::position::{Position, line_at, position_to_byte};
use regex::Regex;
use std::sync::LazyLock;
use tree_sitter::Tree;

/// Kind of completion requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    /// Nothing completable.
    #[default]
    Unknown,
    /// A tag name after `<`.
    TagName,
    /// An attribute name inside a start tag.
    AttributeName,
    /// An attribute value.
    AttributeValue,
    /// `@event` binding name (templates only).
    EventBinding,
    /// `.property` binding name (templates only).
    PropertyBinding,
    /// `?attribute` boolean binding name (templates only).
    BooleanAttributeBinding,
}

/// Result of analyzing a cursor position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionContext {
    /// What is being completed.
    pub kind: CompletionKind,
    /// Tag the cursor is in (attribute and binding kinds).
    pub tag_name: Option<String>,
    /// Attribute whose value is being completed.
    pub attribute_name: Option<String>,
    /// Partially typed text; for bindings, the name after the sigil.
    pub prefix: String,
    /// Whether the cursor is inside an `html`/`svg` tagged template.
    pub in_template: bool,
    /// For `slot="..."` values, the tag of the element hosting the slot.
    pub parent_tag: Option<String>,
    /// Character that triggered the request, if any.
    pub trigger_char: Option<char>,
    /// Full text of the cursor's line.
    pub line_content: String,
}

impl CompletionContext {
    /// The tag name, when it names a custom element.
    pub fn custom_element(&self) -> Option<&str> {
        self.tag_name
            .as_deref()
            .filter(|name| is_custom_element_tag(name))
    }
}

/// Whether `name` is a valid custom element name: starts with a lowercase ASCII letter and
/// contains a hyphen.
pub fn is_custom_element_tag(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase()) && name.contains('-')
}

/// Classification of a tag fragment, relative to some markup text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TagCompletion {
    kind: CompletionKind,
    tag_name: Option<String>,
    attribute_name: Option<String>,
    prefix: String,
    parent_tag: Option<String>,
}

enum AttrState {
    Between,
    Name(usize),
    AfterName(usize, usize),
    AfterEquals(usize, usize),
    Quoted {
        name: (usize, usize),
        quote: char,
        start: usize,
    },
    Unquoted {
        name: (usize, usize),
        start: usize,
    },
}

/// Classify `fragment`, the text between a tag's `<` and the cursor.
fn classify_fragment(fragment: &str, in_template: bool) -> Option<TagCompletion> {
    let name_end = fragment
        .find(|c: char| c.is_whitespace())
        .unwrap_or(fragment.len());
    let tag = &fragment[..name_end];
    if tag.contains(['=', '>', '<', '"', '\'', '/', '!']) {
        return None;
    }
    let starts_like_tag = tag.starts_with(|c: char| c.is_ascii_alphabetic());

    if name_end == fragment.len() {
        if !tag.is_empty() && !starts_like_tag {
            return None;
        }
        return Some(TagCompletion {
            kind: CompletionKind::TagName,
            tag_name: None,
            attribute_name: None,
            prefix: tag.to_string(),
            parent_tag: None,
        });
    }
    if !starts_like_tag {
        return None;
    }

    let rest = &fragment[name_end..];
    let mut state = AttrState::Between;
    for (i, c) in rest.char_indices() {
        state = match state {
            AttrState::Between => match c {
                '>' => return None,
                '/' => AttrState::Between,
                c if c.is_whitespace() => AttrState::Between,
                _ => AttrState::Name(i),
            },
            AttrState::Name(start) => match c {
                '>' => return None,
                '=' => AttrState::AfterEquals(start, i),
                '/' => AttrState::Between,
                c if c.is_whitespace() => AttrState::AfterName(start, i),
                _ => AttrState::Name(start),
            },
            AttrState::AfterName(start, end) => match c {
                '>' => return None,
                '=' => AttrState::AfterEquals(start, end),
                c if c.is_whitespace() => AttrState::AfterName(start, end),
                '/' => AttrState::Between,
                _ => AttrState::Name(i),
            },
            AttrState::AfterEquals(start, end) => match c {
                '>' => return None,
                '"' | '\'' => AttrState::Quoted {
                    name: (start, end),
                    quote: c,
                    start: i + c.len_utf8(),
                },
                c if c.is_whitespace() => AttrState::AfterEquals(start, end),
                _ => AttrState::Unquoted {
                    name: (start, end),
                    start: i,
                },
            },
            AttrState::Quoted { name, quote, start } => {
                if c == quote {
                    AttrState::Between
                } else {
                    AttrState::Quoted { name, quote, start }
                }
            }
            AttrState::Unquoted { name, start } => match c {
                '>' => return None,
                c if c.is_whitespace() => AttrState::Between,
                _ => AttrState::Unquoted { name, start },
            },
        };
    }

    let (kind, attribute_name, prefix) = match state {
        AttrState::Between | AttrState::AfterName(..) => {
            (CompletionKind::AttributeName, None, String::new())
        }
        AttrState::Name(start) => (CompletionKind::AttributeName, None, rest[start..].to_string()),
        AttrState::AfterEquals(start, end) => (
            CompletionKind::AttributeValue,
            Some(rest[start..end].to_string()),
            String::new(),
        ),
        AttrState::Quoted { name, start, .. } | AttrState::Unquoted { name, start } => (
            CompletionKind::AttributeValue,
            Some(rest[name.0..name.1].to_string()),
            rest[start..].to_string(),
        ),
    };

    let (kind, prefix) = match (kind, in_template, prefix.chars().next()) {
        (CompletionKind::AttributeName, true, Some(sigil @ ('@' | '.' | '?'))) => {
            let binding = match sigil {
                '@' => CompletionKind::EventBinding,
                '.' => CompletionKind::PropertyBinding,
                _ => CompletionKind::BooleanAttributeBinding,
            };
            (binding, prefix[1..].to_string())
        }
        _ => (kind, prefix),
    };

    Some(TagCompletion {
        kind,
        tag_name: Some(tag.to_string()),
        attribute_name,
        prefix,
        parent_tag: None,
    })
}

enum TreeVerdict {
    /// The cursor is inside the tag starting at this byte.
    InTag(usize),
    /// The tree places the cursor outside any tag.
    OutsideTag,
    /// The tree is erroneous around the cursor.
    Inconclusive,
}

fn locate_tag(tree: &Tree, offset: usize) -> TreeVerdict {
    let root = tree.root_node();
    if offset == 0 {
        return TreeVerdict::OutsideTag;
    }
    let Some(mut node) = root.descendant_for_byte_range(offset - 1, offset) else {
        return TreeVerdict::Inconclusive;
    };
    loop {
        if node.is_error() || node.is_missing() {
            return TreeVerdict::Inconclusive;
        }
        if matches!(node.kind(), "start_tag" | "self_closing_tag") {
            if node.has_error() {
                return TreeVerdict::Inconclusive;
            }
            return if node.start_byte() < offset && offset < node.end_byte() {
                TreeVerdict::InTag(node.start_byte())
            } else {
                TreeVerdict::OutsideTag
            };
        }
        match node.parent() {
            Some(parent) => node = parent,
            None => break,
        }
    }
    if root.has_error() {
        TreeVerdict::Inconclusive
    } else {
        TreeVerdict::OutsideTag
    }
}

/// Byte of the nearest unclosed `<` on the cursor's line.
fn line_tag_start(markup: &str, offset: usize) -> Option<usize> {
    let line_start = markup[..offset].rfind('\n').map_or(0, |i| i + 1);
    markup[line_start..offset].rfind('<').map(|i| line_start + i)
}

/// Classify the cursor in HTML `markup` (a whole document or one template's content).
fn classify_markup(
    markup: &str,
    tree: Option<&Tree>,
    offset: usize,
    in_template: bool,
) -> Option<TagCompletion> {
    let offset = elements_core::position::floor_char_boundary(markup, offset);
    let tree_tag = match tree.map(|tree| locate_tag(tree, offset)) {
        Some(TreeVerdict::InTag(start)) => Some(start),
        Some(TreeVerdict::OutsideTag | TreeVerdict::Inconclusive) | None => None,
    };

    let tag_start = match tree_tag {
        Some(start) => start,
        None => line_tag_start(markup, offset)?,
    };
    let mut completion = classify_fragment(&markup[tag_start + 1..offset], in_template)?;

    if completion.kind == CompletionKind::AttributeValue
        && completion.attribute_name.as_deref() == Some("slot")
    {
        completion.parent_tag = enclosing_open_tag(&markup[..tag_start]);
    }
    Some(completion)
}

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][\w:.-]*)(?:[^<>"']|"[^"]*"|'[^']*')*?(/?)>"#)
        .expect("valid tag regex")
});

/// Name of the innermost element still open at the end of `markup`.
fn enclosing_open_tag(markup: &str) -> Option<String> {
    let mut stack: Vec<String> = Vec::new();
    for captures in TAG_RE.captures_iter(markup) {
        let closing = captures.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = captures.get(3).is_some_and(|m| !m.as_str().is_empty());
        let Some(name) = captures.get(2).map(|m| m.as_str().to_ascii_lowercase()) else {
            continue;
        };
        if closing {
            if let Some(pos) = stack.iter().rposition(|open| *open == name) {
                stack.truncate(pos);
            }
        } else if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
            stack.push(name);
        }
    }
    stack.pop()
}

/// Classifies cursor positions in document snapshots.
#[derive(Debug, Default)]
pub struct CompletionContextAnalyzer {
    templates: TemplateParser,
}

impl CompletionContextAnalyzer {
    /// Create an analyzer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze `position` in `snapshot`.
    pub fn analyze(
        &self,
        snapshot: &DocumentSnapshot,
        position: Position,
        trigger_char: Option<char>,
    ) -> CompletionContext {
        let content = snapshot.content();
        let offset = position_to_byte(content, position);

        let (completion, in_template) = match snapshot.language {
            LanguageId::Html => (
                classify_markup(content, snapshot.tree.as_ref(), offset, false),
                false,
            ),
            LanguageId::TypeScript | LanguageId::Tsx => {
                self.classify_script(content, snapshot.tree.as_ref(), offset)
            }
        };

        let mut context = CompletionContext {
            in_template,
            trigger_char,
            line_content: line_at(content, position.line as usize)
                .unwrap_or_default()
                .to_string(),
            ..CompletionContext::default()
        };
        if let Some(completion) = completion {
            context.kind = completion.kind;
            context.tag_name = completion.tag_name;
            context.attribute_name = completion.attribute_name;
            context.prefix = completion.prefix;
            context.parent_tag = completion.parent_tag;
        }

        tracing::trace!(
            uri = %snapshot.uri,
            line = position.line,
            character = position.character,
            kind = ?context.kind,
            in_template,
            "completion context"
        );
        context
    }

    fn classify_script(
        &self,
        content: &str,
        tree: Option<&Tree>,
        offset: usize,
    ) -> (Option<TagCompletion>, bool) {
        if let Some(tree) = tree
            && let Some(region) = template_at(tree, content, offset)
        {
            let markup = region.masked_text(content);
            let embedded = self.templates.parse(&markup);
            let relative = offset - region.span.start;
            return (
                classify_markup(&markup, embedded.as_ref(), relative, region.tagged),
                region.tagged,
            );
        }

        // A complete script tree that puts the cursor outside every template is authoritative.
        if tree.is_some_and(|tree| !tree.root_node().has_error()) {
            return (None, false);
        }
        match in_unterminated_template(content, offset) {
            Some(start) => (
                classify_markup(&content[start..], None, offset - start, true),
                true,
            ),
            None => (None, false),
        }
    }
}
