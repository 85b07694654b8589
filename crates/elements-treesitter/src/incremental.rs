use crate::analyzer::ChangeAnalyzer;
use crate::edit::replay_edits;
use elements_core::change::ChangeEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

/// Errors produced by [`IncrementalParser`] when no tree could be produced at all.
///
/// A failed incremental attempt is never an error; it falls back to a full parse.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no parser available for {uri}")]
    /// The target has no parser (it was closed or never initialized).
    NoParser {
        /// Document URI.
        uri: String,
    },

    #[error("tree-sitter produced no tree for {uri}")]
    /// The parser returned no tree (no language set, or parsing was cancelled).
    NoTree {
        /// Document URI.
        uri: String,
    },
}

/// How updates are parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrategy {
    /// Let [`ChangeAnalyzer`] decide per batch.
    #[default]
    Auto,
    /// Always try the incremental path first (still validated).
    Incremental,
    /// Always parse from scratch.
    Full,
}

/// Something that owns a syntax tree and the parser that produced it.
pub trait SyntaxTarget {
    /// Identifier used in logs and errors.
    fn uri(&self) -> &str;
    /// Text the current tree was parsed from.
    fn text(&self) -> &str;
    /// Current tree, if any.
    fn tree(&self) -> Option<&Tree>;
    /// Parser to reparse with.
    fn parser_mut(&mut self) -> Option<&mut Parser>;
}

/// Result of a successful parse.
#[derive(Debug)]
pub struct ParseOutcome {
    /// The new tree. It is always a complete parse of the new content.
    pub tree: Tree,
    /// Whether the new tree came from the incremental path.
    pub used_incremental: bool,
    /// The tree that was current before this parse.
    pub previous: Option<Tree>,
}

/// Keeps a target's tree current with incremental reparsing and a full-parse safety net.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalParser {
    strategy: ParseStrategy,
    analyzer: ChangeAnalyzer,
}

impl IncrementalParser {
    /// Create a parser policy.
    pub fn new(strategy: ParseStrategy, analyzer: ChangeAnalyzer) -> Self {
        Self { strategy, analyzer }
    }

    /// Configured strategy.
    pub fn strategy(&self) -> ParseStrategy {
        self.strategy
    }

    /// Configured change analyzer.
    pub fn analyzer(&self) -> &ChangeAnalyzer {
        &self.analyzer
    }

    /// Parse `new_content`, picking the incremental or full path.
    ///
    /// `changes` is the batch that turned the target's current text into `new_content`. The
    /// target itself is not modified apart from using its parser; installing the returned tree is
    /// up to the caller.
    pub fn parse_with_strategy<T: SyntaxTarget + ?Sized>(
        &self,
        target: &mut T,
        new_content: &str,
        changes: &[ChangeEvent],
    ) -> Result<ParseOutcome, ParseError> {
        if target.tree().is_none() {
            tracing::debug!(uri = target.uri(), "no existing tree, parsing from scratch");
            return self.parse_full(target, new_content);
        }

        let incremental = match self.strategy {
            ParseStrategy::Full => false,
            ParseStrategy::Incremental => true,
            ParseStrategy::Auto => self
                .analyzer
                .should_use_incremental(target.text(), changes),
        };

        tracing::trace!(
            uri = target.uri(),
            strategy = ?self.strategy,
            changes = changes.len(),
            incremental,
            "selected parse path"
        );

        if incremental {
            self.parse_incremental(target, new_content, changes)
        } else {
            self.parse_full(target, new_content)
        }
    }

    /// Parse `new_content` from scratch.
    pub fn parse_full<T: SyntaxTarget + ?Sized>(
        &self,
        target: &mut T,
        new_content: &str,
    ) -> Result<ParseOutcome, ParseError> {
        let previous = target.tree().cloned();
        let uri = target.uri().to_string();
        let Some(parser) = target.parser_mut() else {
            return Err(ParseError::NoParser { uri });
        };
        let tree = parser
            .parse(new_content, None)
            .ok_or(ParseError::NoTree { uri })?;
        Ok(ParseOutcome {
            tree,
            used_incremental: false,
            previous,
        })
    }

    /// Try an incremental reparse; fall back to a full parse if the result is not trustworthy.
    pub fn parse_incremental<T: SyntaxTarget + ?Sized>(
        &self,
        target: &mut T,
        new_content: &str,
        changes: &[ChangeEvent],
    ) -> Result<ParseOutcome, ParseError> {
        let Some(previous) = target.tree().cloned() else {
            return self.parse_full(target, new_content);
        };
        let Some(replay) = replay_edits(target.text(), changes) else {
            tracing::debug!(uri = target.uri(), "batch has a whole-document change");
            return self.parse_full(target, new_content);
        };
        if replay.text != new_content {
            tracing::debug!(
                uri = target.uri(),
                "change batch does not reproduce the new content"
            );
            return self.parse_full(target, new_content);
        }

        let mut edited = previous.clone();
        for edit in &replay.edits {
            edited.edit(edit);
        }

        let uri = target.uri().to_string();
        let Some(parser) = target.parser_mut() else {
            return Err(ParseError::NoParser { uri });
        };
        let candidate = parser.parse(new_content, Some(&edited));

        match candidate {
            Some(tree) if validate_tree(&tree, new_content) => {
                tracing::debug!(uri = %uri, edits = replay.edits.len(), "incremental parse accepted");
                Ok(ParseOutcome {
                    tree,
                    used_incremental: true,
                    previous: Some(previous),
                })
            }
            _ => {
                tracing::debug!(uri = %uri, "incremental parse rejected, reparsing from scratch");
                self.parse_full(target, new_content)
            }
        }
    }
}

/// Whether `tree` is a complete, error-free parse of `content`.
pub fn validate_tree(tree: &Tree, content: &str) -> bool {
    let root = tree.root_node();
    if root.end_byte() < content.len() {
        return false;
    }
    first_error_node(root).is_none()
}

/// First `ERROR` or missing node in document order.
pub fn first_error_node(root: Node<'_>) -> Option<Node<'_>> {
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        // Only descend into subtrees that contain an error.
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}
