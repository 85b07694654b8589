//! The document registry.
//!
//! Locking has two tiers. Each URI has its own mutex that serializes open, update and close for
//! that URI; the registry map is locked only for lookups, inserts and removals. Parsing happens
//! under the URI lock (and the document's own cell lock) but never under the registry lock, so
//! different URIs are parsed in parallel.
//!
//! Lock order is always URI lock, then registry, then document cell. The registry lock is released
//! before a document cell is locked.

use crate::completion::{CompletionContext, CompletionContextAnalyzer};
use crate::config::ServerConfig;
use crate::document::{Document, DocumentSnapshot};
use crate::elements::{self, AttributeMatch, CustomElementMatch};
use crate::handler::{HandlerKind, LanguageHandler};
use crate::script::carry_script_tags;
use crate::template::TemplateParser;
use elements_core::{ChangeEvent, LanguageId, Position, apply_changes};
use elements_treesitter::IncrementalParser;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

type DocumentCell = Arc<Mutex<Document>>;
type UriLock = Arc<Mutex<()>>;

/// All open documents, keyed by URI.
pub struct DocumentStore {
    documents: RwLock<HashMap<String, DocumentCell>>,
    uri_locks: Mutex<HashMap<String, UriLock>>,
    handlers: HashMap<LanguageId, LanguageHandler>,
    parser: IncrementalParser,
    completion: CompletionContextAnalyzer,
    templates: TemplateParser,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("documents", &self.documents.read().len())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// A store with every built-in handler and default settings.
    pub fn new() -> Self {
        Self::with_config(&ServerConfig::default())
    }

    /// A store with every built-in handler.
    pub fn with_config(config: &ServerConfig) -> Self {
        Self::with_handlers(
            config,
            LanguageId::ALL.into_iter().map(LanguageHandler::for_language),
        )
    }

    /// A store with exactly `handlers`. A later handler for the same language replaces an earlier
    /// one.
    pub fn with_handlers(
        config: &ServerConfig,
        handlers: impl IntoIterator<Item = LanguageHandler>,
    ) -> Self {
        let handlers = handlers
            .into_iter()
            .map(|handler| (handler.language(), handler))
            .collect();
        Self {
            documents: RwLock::new(HashMap::new()),
            uri_locks: Mutex::new(HashMap::new()),
            handlers,
            parser: config.incremental_parser(),
            completion: CompletionContextAnalyzer::new(),
            templates: TemplateParser::new(),
        }
    }

    /// The handler registered for `language`.
    pub fn handler(&self, language: LanguageId) -> Option<&LanguageHandler> {
        self.handlers.get(&language)
    }

    /// The parse policy used for updates.
    pub fn parser(&self) -> &IncrementalParser {
        &self.parser
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether no documents are open.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Whether `uri` is open.
    pub fn contains(&self, uri: &str) -> bool {
        self.documents.read().contains_key(uri)
    }

    /// Number of live per-URI locks.
    pub fn uri_lock_count(&self) -> usize {
        self.uri_locks.lock().len()
    }

    /// Open `uri`, replacing (and closing) any document already open under it.
    ///
    /// The language comes from the URI's extension; unknown extensions are treated as markup.
    /// Returns `None` when no handler can serve the document.
    pub fn open(&self, uri: &str, content: &str, version: i32) -> Option<DocumentSnapshot> {
        self.with_uri_lock(uri, || self.open_locked(uri, content, version))
    }

    /// Bring `uri` to `content` at `version`.
    ///
    /// `changes` is the batch that produced `content` from the stored text; it decides whether the
    /// tree is updated incrementally. An untracked URI is opened instead.
    pub fn update(
        &self,
        uri: &str,
        content: &str,
        version: i32,
        changes: &[ChangeEvent],
    ) -> Option<DocumentSnapshot> {
        self.with_uri_lock(uri, || {
            self.update_locked(uri, content, version, changes)
        })
    }

    /// Apply `changes` to the stored text of `uri` and update to the result.
    ///
    /// Returns `None` for an untracked URI.
    pub fn apply_changes(
        &self,
        uri: &str,
        version: i32,
        changes: &[ChangeEvent],
    ) -> Option<DocumentSnapshot> {
        self.with_uri_lock(uri, || {
            let Some(cell) = self.cell(uri) else {
                tracing::debug!(uri, version, "changes for untracked document ignored");
                return None;
            };
            let content = apply_changes(cell.lock().content(), changes);
            self.update_locked(uri, &content, version, changes)
        })
    }

    /// Close `uri`, releasing its tree and returning its parser to the handler.
    ///
    /// Closing an unknown or already closed URI does nothing.
    pub fn close(&self, uri: &str) {
        self.with_uri_lock(uri, || {
            let removed = self.documents.write().remove(uri);
            if let Some(cell) = removed {
                self.release(&mut cell.lock());
                tracing::debug!(uri, "document closed");
            }
        });
    }

    /// Snapshot of `uri`.
    pub fn get(&self, uri: &str) -> Option<DocumentSnapshot> {
        self.cell(uri).map(|cell| cell.lock().snapshot())
    }

    /// Snapshots of every open document, in no particular order.
    pub fn all(&self) -> Vec<DocumentSnapshot> {
        let cells: Vec<DocumentCell> = self.documents.read().values().cloned().collect();
        cells.iter().map(|cell| cell.lock().snapshot()).collect()
    }

    /// Classify the completion context at `position` in `uri`.
    pub fn analyze_completion(
        &self,
        uri: &str,
        position: Position,
        trigger_char: Option<char>,
    ) -> Option<CompletionContext> {
        let snapshot = self.get(uri)?;
        Some(self.completion.analyze(&snapshot, position, trigger_char))
    }

    /// Every custom element in `uri`.
    pub fn custom_elements(&self, uri: &str) -> Option<Vec<CustomElementMatch>> {
        let snapshot = self.get(uri)?;
        Some(elements::find_custom_elements(&snapshot, &self.templates))
    }

    /// The custom element whose tag name contains `position`.
    pub fn element_at(&self, uri: &str, position: Position) -> Option<CustomElementMatch> {
        elements::element_at(&self.get(uri)?, &self.templates, position)
    }

    /// The custom element attribute whose name contains `position`, with its tag name.
    pub fn attribute_at(&self, uri: &str, position: Position) -> Option<(AttributeMatch, String)> {
        elements::attribute_at(&self.get(uri)?, &self.templates, position)
    }

    /// Where a module import would be inserted in `uri`.
    pub fn module_script_insertion(&self, uri: &str) -> Option<Position> {
        elements::module_script_insertion(&self.get(uri)?)
    }

    /// Start of the line holding `</head>` in `uri`.
    pub fn head_insertion_point(&self, uri: &str) -> Option<Position> {
        elements::head_insertion_point(&self.get(uri)?)
    }

    /// Close every document, then every handler.
    pub fn shutdown(&self) {
        let uris: Vec<String> = self.documents.read().keys().cloned().collect();
        for uri in &uris {
            self.close(uri);
        }
        for handler in self.handlers.values() {
            handler.close();
        }
        tracing::debug!(closed = uris.len(), "document store shut down");
    }

    fn cell(&self, uri: &str) -> Option<DocumentCell> {
        self.documents.read().get(uri).cloned()
    }

    /// Run `f` holding the lock for `uri`.
    ///
    /// A lock acquired after another caller removed it from the table is dropped and the lookup
    /// retried. The entry is removed before the lock is released whenever `uri` is left without a
    /// document, so the table only holds entries for open URIs.
    fn with_uri_lock<R>(&self, uri: &str, f: impl FnOnce() -> R) -> R {
        loop {
            let lock = Arc::clone(self.uri_locks.lock().entry(uri.to_string()).or_default());
            let _guard = lock.lock();
            let current = self
                .uri_locks
                .lock()
                .get(uri)
                .is_some_and(|entry| Arc::ptr_eq(entry, &lock));
            if !current {
                continue;
            }

            let result = f();
            if !self.contains(uri) {
                let mut locks = self.uri_locks.lock();
                if locks
                    .get(uri)
                    .is_some_and(|entry| Arc::ptr_eq(entry, &lock))
                {
                    locks.remove(uri);
                }
            }
            return result;
        }
    }

    fn handler_for_uri(&self, uri: &str) -> Option<&LanguageHandler> {
        let language = LanguageId::from_uri(uri).unwrap_or(LanguageId::Html);
        self.handlers.get(&language).or_else(|| {
            tracing::debug!(uri, %language, "no handler registered, falling back to markup");
            self.handlers.get(&LanguageId::Html)
        })
    }

    fn release(&self, document: &mut Document) {
        match self.handlers.get(&document.language()) {
            Some(handler) => handler.close_document(document),
            None => drop(document.close()),
        }
    }

    fn open_locked(&self, uri: &str, content: &str, version: i32) -> Option<DocumentSnapshot> {
        let Some(handler) = self.handler_for_uri(uri) else {
            tracing::warn!(uri, "no markup handler registered, document not opened");
            return None;
        };

        let previous = self.documents.write().remove(uri);
        if let Some(cell) = previous {
            tracing::debug!(uri, "replacing open document");
            self.release(&mut cell.lock());
        }

        let document = handler.create_document(uri, content, version)?;
        let snapshot = document.snapshot();
        self.documents
            .write()
            .insert(uri.to_string(), Arc::new(Mutex::new(document)));
        tracing::debug!(uri, version, language = %snapshot.language, "document opened");
        Some(snapshot)
    }

    fn update_locked(
        &self,
        uri: &str,
        content: &str,
        version: i32,
        changes: &[ChangeEvent],
    ) -> Option<DocumentSnapshot> {
        let Some(cell) = self.cell(uri) else {
            tracing::debug!(uri, version, "update of untracked document, opening it");
            return self.open_locked(uri, content, version);
        };
        let mut document = cell.lock();

        if version < document.version() {
            tracing::warn!(
                uri,
                previous = document.version(),
                version,
                "document version decreased"
            );
        }

        let handler = self.handlers.get(&document.language());
        let outcome = match self.parser.parse_with_strategy(&mut *document, content, changes) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(uri, error = %err, "parse failed, rebuilding document");
                let handler = handler?;
                handler.close_document(&mut document);
                return match handler.create_document(uri, content, version) {
                    Some(rebuilt) => {
                        *document = rebuilt;
                        Some(document.snapshot())
                    }
                    None => {
                        drop(document);
                        self.documents.write().remove(uri);
                        None
                    }
                };
            }
        };

        let carried = match handler.map(LanguageHandler::kind) {
            Some(HandlerKind::Markup) => Some(carry_script_tags(
                document.script_tags(),
                document.content(),
                content,
                changes,
            )),
            _ => None,
        };

        document.install(Arc::from(content), version, outcome.tree);

        match (carried, handler) {
            (Some(Some(tags)), _) => {
                if let Some(meta) = document.markup_mut() {
                    meta.script_tags = tags;
                }
            }
            (Some(None), Some(handler)) => {
                tracing::trace!(uri, "script tags affected, re-extracting");
                handler.refresh_markup_metadata(&mut document);
            }
            _ => {}
        }

        tracing::debug!(
            uri,
            version,
            changes = changes.len(),
            incremental = outcome.used_incremental,
            "document updated"
        );
        Some(document.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_uri_lock_removed_on_close() {
        let store = DocumentStore::new();
        store.open("file:///a.html", "<p></p>", 1).unwrap();
        assert_eq!(store.uri_lock_count(), 1);

        store.close("file:///a.html");
        store.close("file:///a.html");
        assert_eq!(store.uri_lock_count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_extension_uses_markup() {
        let store = DocumentStore::new();
        let snapshot = store.open("file:///notes.txt", "<x-a></x-a>", 1).unwrap();
        assert_eq!(snapshot.language, LanguageId::Html);
    }
}
