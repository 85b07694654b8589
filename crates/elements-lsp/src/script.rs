//! `<script>` tags, their imports, and import maps in markup documents.

use crate::syntax::{child_of_kind, node_text, tag_attributes, walk_nodes};
use elements_core::change::ChangeEvent;
use elements_core::position::{Range, bytes_to_range};
use elements_treesitter::{replay_edits, shift_offset};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ops::Range as ByteRange;
use std::sync::LazyLock;
use tree_sitter::{InputEdit, Tree};

/// How a module is imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `import ... from 'x'`, `import 'x'`, `export ... from 'x'`.
    Static,
    /// `import('x')`.
    Dynamic,
}

/// An import found in inline script content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Module specifier, as written.
    pub specifier: String,
    /// Static or dynamic import.
    pub kind: ImportKind,
}

/// A `<script>` element in a markup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    /// Bytes of the whole element, from `<script` to `</script>`.
    pub byte_range: ByteRange<usize>,
    /// Position range of the whole element.
    pub range: Range,
    /// Bytes of the inline content, if any.
    pub content_byte_range: Option<ByteRange<usize>>,
    /// Position range of the inline content, if any.
    pub content_range: Option<Range>,
    /// Value of the `type` attribute.
    pub script_type: Option<String>,
    /// Value of the `src` attribute.
    pub src: Option<String>,
    /// Whether `type="module"`.
    pub is_module: bool,
    /// Imports in the inline content.
    pub imports: Vec<ImportStatement>,
}

impl ScriptTag {
    /// Whether this is a `<script type="importmap">`.
    pub fn is_import_map(&self) -> bool {
        self.script_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("importmap"))
    }

    /// Whether this is an inline (no `src`) module script.
    pub fn is_inline_module(&self) -> bool {
        self.is_module && self.src.is_none()
    }
}

/// Collect every `<script>` element of an HTML tree.
pub fn extract_script_tags(tree: &Tree, content: &str) -> Vec<ScriptTag> {
    let mut tags = Vec::new();
    walk_nodes(tree.root_node(), |node| {
        if node.kind() != "script_element" {
            return true;
        }

        let mut script_type = None;
        let mut src = None;
        if let Some(start_tag) = child_of_kind(node, "start_tag") {
            for attribute in tag_attributes(start_tag, content) {
                let name = node_text(attribute.name, content);
                if name.eq_ignore_ascii_case("type") {
                    script_type = attribute.value;
                } else if name.eq_ignore_ascii_case("src") {
                    src = attribute.value;
                }
            }
        }

        let content_byte_range = child_of_kind(node, "raw_text").map(|raw| raw.byte_range());
        let imports = content_byte_range
            .as_ref()
            .and_then(|span| content.get(span.clone()))
            .map(parse_import_statements)
            .unwrap_or_default();

        tags.push(ScriptTag {
            byte_range: node.byte_range(),
            range: bytes_to_range(content, node.byte_range()),
            content_range: content_byte_range
                .clone()
                .map(|span| bytes_to_range(content, span)),
            content_byte_range,
            is_module: script_type.as_deref() == Some("module"),
            script_type,
            src,
            imports,
        });
        false
    });
    tags
}

static STATIC_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:type\s+)?(?:[\w$*{},\s]+?\s+from\s+)?["']([^"'\n]+)["']"#)
        .expect("valid static import regex")
});

static EXPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*export\s+(?:type\s+)?[\w$*{},\s]+?\s+from\s+["']([^"'\n]+)["']"#)
        .expect("valid export-from regex")
});

static DYNAMIC_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#).expect("valid dynamic import regex")
});

/// Find module imports in script source, in source order.
pub fn parse_import_statements(source: &str) -> Vec<ImportStatement> {
    let mut found: Vec<(usize, ImportStatement)> = Vec::new();
    let patterns = [
        (&*STATIC_IMPORT_RE, ImportKind::Static),
        (&*EXPORT_FROM_RE, ImportKind::Static),
        (&*DYNAMIC_IMPORT_RE, ImportKind::Dynamic),
    ];
    for (re, kind) in patterns {
        for captures in re.captures_iter(source) {
            if let Some(specifier) = captures.get(1) {
                found.push((
                    specifier.start(),
                    ImportStatement {
                        specifier: specifier.as_str().to_string(),
                        kind,
                    },
                ));
            }
        }
    }
    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, import)| import).collect()
}

/// A parsed `<script type="importmap">`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportMap {
    /// Top-level specifier map.
    #[serde(default)]
    pub imports: BTreeMap<String, String>,
    /// Specifier maps applied to referrers under a URL prefix.
    #[serde(default)]
    pub scopes: BTreeMap<String, BTreeMap<String, String>>,
}

impl ImportMap {
    /// Parse import map JSON.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Whether the map has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.scopes.values().all(BTreeMap::is_empty)
    }

    /// Resolve `specifier` against the top-level `imports`.
    pub fn resolve(&self, specifier: &str) -> Option<String> {
        resolve_in(&self.imports, specifier)
    }

    /// Resolve `specifier` for a module at `referrer`, consulting matching scopes first.
    ///
    /// Scopes are tried from the longest matching prefix to the shortest.
    pub fn resolve_from(&self, specifier: &str, referrer: &str) -> Option<String> {
        let mut scopes: Vec<_> = self
            .scopes
            .iter()
            .filter(|(prefix, _)| referrer.starts_with(prefix.as_str()))
            .collect();
        scopes.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));

        scopes
            .into_iter()
            .find_map(|(_, table)| resolve_in(table, specifier))
            .or_else(|| self.resolve(specifier))
    }
}

fn resolve_in(table: &BTreeMap<String, String>, specifier: &str) -> Option<String> {
    if let Some(target) = table.get(specifier) {
        return Some(target.clone());
    }
    table
        .iter()
        .filter(|(key, target)| {
            key.ends_with('/') && target.ends_with('/') && specifier.starts_with(key.as_str())
        })
        .max_by_key(|(key, _)| key.len())
        .map(|(key, target)| format!("{target}{}", &specifier[key.len()..]))
}

/// Parse the first import map among `tags`.
///
/// Returns `Ok(None)` when the document has no inline import map.
pub fn import_map_from_tags(
    tags: &[ScriptTag],
    content: &str,
) -> Result<Option<ImportMap>, serde_json::Error> {
    let Some(source) = tags
        .iter()
        .filter(|tag| tag.is_import_map())
        .find_map(|tag| content.get(tag.content_byte_range.clone()?))
    else {
        return Ok(None);
    };
    ImportMap::from_json(source).map(Some)
}

/// Carry script tags across a change batch without re-extracting them.
///
/// Returns `None` when the batch may have changed any script: it inserts `<script` (or
/// `</script>` while scripts exist), touches an existing script element, or cannot be replayed as
/// ranged edits. Otherwise returns the tags with byte ranges shifted by the edits and positions
/// recomputed against `new_content`.
pub fn carry_script_tags(
    tags: &[ScriptTag],
    old_content: &str,
    new_content: &str,
    changes: &[ChangeEvent],
) -> Option<Vec<ScriptTag>> {
    if changes.is_empty() {
        return (old_content == new_content).then(|| tags.to_vec());
    }
    let opens_script = changes.iter().any(|change| change.text.contains("<script"));
    let closes_script =
        !tags.is_empty() && changes.iter().any(|change| change.text.contains("</script>"));
    if opens_script || closes_script {
        return None;
    }

    let replay = replay_edits(old_content, changes)?;
    if replay.text != new_content {
        return None;
    }

    let mut shifted = tags.to_vec();
    for edit in &replay.edits {
        for tag in &mut shifted {
            shift_tag(tag, edit)?;
        }
    }
    for tag in &mut shifted {
        tag.range = bytes_to_range(new_content, tag.byte_range.clone());
        tag.content_range = tag
            .content_byte_range
            .clone()
            .map(|span| bytes_to_range(new_content, span));
    }
    Some(shifted)
}

fn shift_tag(tag: &mut ScriptTag, edit: &InputEdit) -> Option<()> {
    // Edges count as touching: typing right before `<script` or right after `</script>` may
    // change how the element parses.
    if edit.start_byte <= tag.byte_range.end && tag.byte_range.start <= edit.old_end_byte {
        return None;
    }
    tag.byte_range = shift_span(&tag.byte_range, edit)?;
    if let Some(span) = tag.content_byte_range.as_mut() {
        *span = shift_span(span, edit)?;
    }
    Some(())
}

fn shift_span(span: &ByteRange<usize>, edit: &InputEdit) -> Option<ByteRange<usize>> {
    Some(shift_offset(span.start, edit)?..shift_offset(span.end, edit)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_import_statements() {
        let source = r#"
import { LitElement } from 'lit';
import "./side-effect.js";
import type { Foo } from "./types.js";
export { Bar } from './bar.js';
const lazy = () => import('./lazy.js');
const s = "import nothing";
"#;
        let specifiers: Vec<_> = parse_import_statements(source)
            .into_iter()
            .map(|i| (i.specifier, i.kind))
            .collect();
        assert_eq!(
            specifiers,
            vec![
                ("lit".to_string(), ImportKind::Static),
                ("./side-effect.js".to_string(), ImportKind::Static),
                ("./types.js".to_string(), ImportKind::Static),
                ("./bar.js".to_string(), ImportKind::Static),
                ("./lazy.js".to_string(), ImportKind::Dynamic),
            ]
        );
    }

    #[test]
    fn test_multiline_named_import() {
        let source = "import {\n  a,\n  b,\n} from '@scope/pkg';\n";
        let imports = parse_import_statements(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "@scope/pkg");
    }

    #[test]
    fn test_import_map_resolution() {
        let map = ImportMap::from_json(
            r#"{
                "imports": {
                    "lit": "/node_modules/lit/index.js",
                    "lit/": "/node_modules/lit/",
                    "@rhds/elements/": "/assets/rhds/"
                },
                "scopes": {
                    "/legacy/": { "lit": "/vendor/lit-2.js" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(map.resolve("lit").as_deref(), Some("/node_modules/lit/index.js"));
        assert_eq!(
            map.resolve("lit/decorators.js").as_deref(),
            Some("/node_modules/lit/decorators.js")
        );
        assert_eq!(
            map.resolve("@rhds/elements/rh-button/rh-button.js").as_deref(),
            Some("/assets/rhds/rh-button/rh-button.js")
        );
        assert_eq!(map.resolve("react"), None);

        assert_eq!(
            map.resolve_from("lit", "/legacy/page.js").as_deref(),
            Some("/vendor/lit-2.js")
        );
        assert_eq!(
            map.resolve_from("lit", "/modern/page.js").as_deref(),
            Some("/node_modules/lit/index.js")
        );
    }

    #[test]
    fn test_import_map_without_scopes() {
        let map = ImportMap::from_json(r#"{ "imports": {} }"#).unwrap();
        assert!(map.is_empty());
        assert!(ImportMap::from_json("{ not json").is_err());
    }
}
