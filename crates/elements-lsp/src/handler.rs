//! Language handlers: per-language document construction and parser pooling.

use crate::document::Document;
use crate::script::{ImportMap, ScriptTag, extract_script_tags, import_map_from_tags};
use elements_core::LanguageId;
use parking_lot::Mutex;
use thiserror::Error;
use tree_sitter::{Language, Parser};

/// Parsers kept per handler for reuse.
pub const MAX_POOLED_PARSERS: usize = 4;

/// Errors produced by [`LanguageHandler`].
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to load the {language} grammar: {message}")]
    /// The grammar could not be assigned to a parser (ABI mismatch).
    Language {
        /// Language whose grammar failed.
        language: LanguageId,
        /// Tree-sitter's message.
        message: String,
    },

    #[error("{0} documents have no markup metadata")]
    /// Script-tag or import-map extraction was requested for a non-markup document.
    NotMarkup(LanguageId),

    #[error("document {0} has no syntax tree")]
    /// The document has no tree to extract from.
    NoTree(String),

    #[error("invalid import map: {0}")]
    /// The inline import map is not valid JSON (or not an import map).
    ImportMap(#[from] serde_json::Error),
}

/// The tree-sitter grammar for `language`.
pub fn grammar(language: LanguageId) -> Language {
    match language {
        LanguageId::Html => tree_sitter_html::LANGUAGE.into(),
        LanguageId::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        LanguageId::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
    }
}

/// A parser with `language`'s grammar loaded.
pub fn new_parser(language: LanguageId) -> Result<Parser, HandlerError> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar(language))
        .map_err(|e| HandlerError::Language {
            language,
            message: e.to_string(),
        })?;
    Ok(parser)
}

/// Which family of documents a handler serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// HTML.
    Markup,
    /// TypeScript / JavaScript.
    Script,
    /// TSX / JSX.
    ScriptWithMarkup,
}

/// Creates documents of one language and lends them parsers.
pub struct LanguageHandler {
    kind: HandlerKind,
    language: LanguageId,
    pool: Mutex<Vec<Parser>>,
}

impl std::fmt::Debug for LanguageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageHandler")
            .field("kind", &self.kind)
            .field("language", &self.language)
            .field("pooled_parsers", &self.pooled_parsers())
            .finish()
    }
}

impl LanguageHandler {
    /// HTML handler.
    pub fn markup() -> Self {
        Self::new(HandlerKind::Markup, LanguageId::Html)
    }

    /// TypeScript handler (also serves JavaScript).
    pub fn script() -> Self {
        Self::new(HandlerKind::Script, LanguageId::TypeScript)
    }

    /// TSX handler (also serves JSX).
    pub fn script_with_markup() -> Self {
        Self::new(HandlerKind::ScriptWithMarkup, LanguageId::Tsx)
    }

    /// Handler for `language`.
    pub fn for_language(language: LanguageId) -> Self {
        match language {
            LanguageId::Html => Self::markup(),
            LanguageId::TypeScript => Self::script(),
            LanguageId::Tsx => Self::script_with_markup(),
        }
    }

    fn new(kind: HandlerKind, language: LanguageId) -> Self {
        Self {
            kind,
            language,
            pool: Mutex::new(Vec::new()),
        }
    }

    /// Handler family.
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Language this handler parses.
    pub fn language(&self) -> LanguageId {
        self.language
    }

    /// Take a parser from the pool, or create one.
    pub fn checkout_parser(&self) -> Result<Parser, HandlerError> {
        if let Some(parser) = self.pool.lock().pop() {
            return Ok(parser);
        }
        new_parser(self.language)
    }

    /// Return a parser to the pool. Extra parsers are dropped.
    pub fn release_parser(&self, mut parser: Parser) {
        parser.reset();
        let mut pool = self.pool.lock();
        if pool.len() < MAX_POOLED_PARSERS {
            pool.push(parser);
        }
    }

    /// Number of idle pooled parsers.
    pub fn pooled_parsers(&self) -> usize {
        self.pool.lock().len()
    }

    /// Parse `content` into a new document.
    ///
    /// Returns `None` only when no parser can be set up for the language. A parse that yields no
    /// tree still produces a document (without a tree).
    pub fn create_document(&self, uri: &str, content: &str, version: i32) -> Option<Document> {
        let mut parser = match self.checkout_parser() {
            Ok(parser) => parser,
            Err(err) => {
                tracing::warn!(uri, error = %err, "cannot create document");
                return None;
            }
        };

        let tree = parser.parse(content, None);
        if tree.is_none() {
            tracing::warn!(uri, language = %self.language, "parser produced no tree");
        }

        let mut document = Document::new(uri, content, version, self.language, tree, parser);
        if self.kind == HandlerKind::Markup {
            self.refresh_markup_metadata(&mut document);
        }
        tracing::debug!(uri, version, language = %self.language, "document created");
        Some(document)
    }

    /// Extract `<script>` elements from a markup document's tree.
    pub fn parse_script_tags(&self, document: &Document) -> Result<Vec<ScriptTag>, HandlerError> {
        if self.kind != HandlerKind::Markup || document.language() != LanguageId::Html {
            return Err(HandlerError::NotMarkup(document.language()));
        }
        let tree = document
            .tree()
            .ok_or_else(|| HandlerError::NoTree(document.uri().to_string()))?;
        Ok(extract_script_tags(tree, document.content()))
    }

    /// Parse the inline import map of a markup document from its current script tags.
    pub fn parse_import_map(&self, document: &Document) -> Result<Option<ImportMap>, HandlerError> {
        if self.kind != HandlerKind::Markup || document.language() != LanguageId::Html {
            return Err(HandlerError::NotMarkup(document.language()));
        }
        Ok(import_map_from_tags(
            document.script_tags(),
            document.content(),
        )?)
    }

    /// Re-extract script tags and the import map into the document.
    ///
    /// An invalid import map keeps the previous one.
    pub(crate) fn refresh_markup_metadata(&self, document: &mut Document) {
        match self.parse_script_tags(document) {
            Ok(tags) => {
                if let Some(meta) = document.markup_mut() {
                    meta.script_tags = tags;
                }
            }
            Err(err) => {
                tracing::debug!(uri = document.uri(), error = %err, "script tags not extracted");
                return;
            }
        }

        match self.parse_import_map(document) {
            Ok(import_map) => {
                if let Some(meta) = document.markup_mut() {
                    meta.import_map = import_map;
                }
            }
            Err(err) => {
                tracing::warn!(uri = document.uri(), error = %err, "keeping previous import map");
            }
        }
    }

    /// Close a document and take its parser back.
    pub fn close_document(&self, document: &mut Document) {
        if let Some(parser) = document.close() {
            self.release_parser(parser);
        }
    }

    /// Drop every pooled parser.
    pub fn close(&self) {
        let drained = std::mem::take(&mut *self.pool.lock());
        tracing::debug!(language = %self.language, parsers = drained.len(), "handler closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parser_pool_reuses_and_bounds() {
        let handler = LanguageHandler::markup();
        let parsers: Vec<_> = (0..MAX_POOLED_PARSERS + 2)
            .map(|_| handler.checkout_parser().unwrap())
            .collect();
        for parser in parsers {
            handler.release_parser(parser);
        }
        assert_eq!(handler.pooled_parsers(), MAX_POOLED_PARSERS);

        let _parser = handler.checkout_parser().unwrap();
        assert_eq!(handler.pooled_parsers(), MAX_POOLED_PARSERS - 1);

        handler.close();
        assert_eq!(handler.pooled_parsers(), 0);
    }

    #[test]
    fn test_close_document_returns_parser_once() {
        let handler = LanguageHandler::script();
        let mut doc = handler
            .create_document("file:///a.ts", "const a = 1;", 1)
            .unwrap();
        assert!(doc.tree().is_some());

        handler.close_document(&mut doc);
        handler.close_document(&mut doc);
        assert!(doc.is_closed());
        assert!(doc.tree().is_none());
        assert_eq!(handler.pooled_parsers(), 1);
    }

    #[test]
    fn test_markup_document_extracts_scripts() {
        let handler = LanguageHandler::markup();
        let html = r#"<html><head>
<script type="importmap">{ "imports": { "lit": "/lit.js" } }</script>
<script type="module">import 'lit';</script>
<script src="/x.js"></script>
</head></html>"#;
        let doc = handler.create_document("file:///i.html", html, 1).unwrap();

        let tags = doc.script_tags();
        assert_eq!(tags.len(), 3);
        assert!(tags[0].is_import_map());
        assert!(tags[1].is_inline_module());
        assert_eq!(tags[1].imports[0].specifier, "lit");
        assert_eq!(tags[2].src.as_deref(), Some("/x.js"));
        assert_eq!(
            doc.import_map().and_then(|m| m.resolve("lit")).as_deref(),
            Some("/lit.js")
        );
    }

    #[test]
    fn test_script_metadata_requires_markup() {
        let handler = LanguageHandler::script();
        let doc = handler.create_document("file:///a.ts", "", 1).unwrap();
        assert!(matches!(
            handler.parse_script_tags(&doc),
            Err(HandlerError::NotMarkup(LanguageId::TypeScript))
        ));
    }
}
