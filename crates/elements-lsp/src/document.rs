//! Open documents and the snapshots handed out to callers.

use crate::script::{ImportMap, ScriptTag};
use elements_core::LanguageId;
use elements_treesitter::SyntaxTarget;
use std::sync::Arc;
use tree_sitter::{Parser, Tree};

/// Markup-only state, derived from the syntax tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupMetadata {
    /// `<script>` elements in document order.
    pub script_tags: Vec<ScriptTag>,
    /// The inline import map, if the document has one.
    pub import_map: Option<ImportMap>,
}

/// Language-specific part of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// An HTML document.
    Markup(MarkupMetadata),
    /// A TypeScript (or JavaScript) module.
    Script,
    /// A TSX (or JSX) module.
    ScriptWithMarkup,
}

impl DocumentKind {
    /// The empty kind for documents of `language`.
    pub fn for_language(language: LanguageId) -> Self {
        match language {
            LanguageId::Html => Self::Markup(MarkupMetadata::default()),
            LanguageId::TypeScript => Self::Script,
            LanguageId::Tsx => Self::ScriptWithMarkup,
        }
    }
}

/// One open file: its text, version, syntax tree and the parser that maintains it.
///
/// The tree, when present, is always a complete parse of `content`.
pub struct Document {
    uri: String,
    content: Arc<str>,
    version: i32,
    language: LanguageId,
    tree: Option<Tree>,
    parser: Option<Parser>,
    kind: DocumentKind,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("language", &self.language)
            .field("content_len", &self.content.len())
            .field("has_tree", &self.tree.is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Document {
    /// Assemble a document from its parts.
    pub fn new(
        uri: impl Into<String>,
        content: impl Into<Arc<str>>,
        version: i32,
        language: LanguageId,
        tree: Option<Tree>,
        parser: Parser,
    ) -> Self {
        Self {
            uri: uri.into(),
            content: content.into(),
            version,
            language,
            tree,
            parser: Some(parser),
            kind: DocumentKind::for_language(language),
        }
    }

    /// Document URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Current text.
    pub fn content(&self) -> &Arc<str> {
        &self.content
    }

    /// Client-supplied version of the current text.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Document language.
    pub fn language(&self) -> LanguageId {
        self.language
    }

    /// Current syntax tree.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Language-specific state.
    pub fn kind(&self) -> &DocumentKind {
        &self.kind
    }

    /// Script tags (always empty for non-markup documents).
    pub fn script_tags(&self) -> &[ScriptTag] {
        match &self.kind {
            DocumentKind::Markup(meta) => &meta.script_tags,
            _ => &[],
        }
    }

    /// Inline import map, if any.
    pub fn import_map(&self) -> Option<&ImportMap> {
        match &self.kind {
            DocumentKind::Markup(meta) => meta.import_map.as_ref(),
            _ => None,
        }
    }

    /// Whether the document has been closed.
    pub fn is_closed(&self) -> bool {
        self.parser.is_none()
    }

    /// Replace content, version and tree together.
    pub(crate) fn install(&mut self, content: Arc<str>, version: i32, tree: Tree) {
        self.content = content;
        self.version = version;
        self.tree = Some(tree);
    }

    pub(crate) fn markup_mut(&mut self) -> Option<&mut MarkupMetadata> {
        match &mut self.kind {
            DocumentKind::Markup(meta) => Some(meta),
            _ => None,
        }
    }

    /// Release the tree and hand back the parser. Later calls return `None`.
    pub fn close(&mut self) -> Option<Parser> {
        self.tree = None;
        self.parser.take()
    }

    /// Immutable copy of the observable state.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            uri: self.uri.clone(),
            version: self.version,
            language: self.language,
            content: Arc::clone(&self.content),
            tree: self.tree.clone(),
            script_tags: self.script_tags().to_vec(),
            import_map: self.import_map().cloned(),
        }
    }
}

impl SyntaxTarget for Document {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn text(&self) -> &str {
        &self.content
    }

    fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    fn parser_mut(&mut self) -> Option<&mut Parser> {
        self.parser.as_mut()
    }
}

/// Read-only view of a [`Document`] at one version.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    /// Document URI.
    pub uri: String,
    /// Version the snapshot was taken at.
    pub version: i32,
    /// Document language.
    pub language: LanguageId,
    /// Text at that version.
    pub content: Arc<str>,
    /// Syntax tree of `content`.
    pub tree: Option<Tree>,
    /// Script tags (markup only).
    pub script_tags: Vec<ScriptTag>,
    /// Inline import map (markup only).
    pub import_map: Option<ImportMap>,
}

impl DocumentSnapshot {
    /// Text at the snapshot's version.
    pub fn content(&self) -> &str {
        &self.content
    }
}
