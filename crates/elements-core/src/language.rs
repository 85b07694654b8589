//! Supported source languages.

use crate::uri::uri_extension;
use std::fmt;

/// A language the server can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LanguageId {
    /// HTML markup.
    Html,
    /// TypeScript (also used for plain JavaScript).
    TypeScript,
    /// TypeScript with JSX (also used for `.jsx`).
    Tsx,
}

impl LanguageId {
    /// All supported languages.
    pub const ALL: [LanguageId; 3] = [LanguageId::Html, LanguageId::TypeScript, LanguageId::Tsx];

    /// Stable identifier string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
        }
    }

    /// Detect the language from a URI's file extension.
    ///
    /// Returns `None` for unrecognized extensions; callers decide on a fallback.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri_extension(uri)?.as_str() {
            "html" | "htm" => Some(Self::Html),
            "ts" | "mts" | "cts" | "js" | "mjs" | "cjs" => Some(Self::TypeScript),
            "tsx" | "jsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    /// Map an LSP `languageId` to a language.
    pub fn from_lsp_language_id(id: &str) -> Option<Self> {
        match id {
            "html" => Some(Self::Html),
            "typescript" | "javascript" => Some(Self::TypeScript),
            "typescriptreact" | "javascriptreact" | "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    /// Whether documents of this language may embed markup in tagged templates.
    pub fn is_script(self) -> bool {
        matches!(self, Self::TypeScript | Self::Tsx)
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_uri() {
        assert_eq!(LanguageId::from_uri("file:///a/index.html"), Some(LanguageId::Html));
        assert_eq!(LanguageId::from_uri("file:///a/b.HTM"), Some(LanguageId::Html));
        assert_eq!(LanguageId::from_uri("file:///a/el.ts"), Some(LanguageId::TypeScript));
        assert_eq!(LanguageId::from_uri("file:///a/el.mjs"), Some(LanguageId::TypeScript));
        assert_eq!(LanguageId::from_uri("file:///a/el.jsx"), Some(LanguageId::Tsx));
        assert_eq!(LanguageId::from_uri("file:///a/readme.md"), None);
    }

    #[test]
    fn test_from_lsp_language_id() {
        assert_eq!(
            LanguageId::from_lsp_language_id("typescriptreact"),
            Some(LanguageId::Tsx)
        );
        assert_eq!(LanguageId::from_lsp_language_id("css"), None);
        assert_eq!(LanguageId::Tsx.to_string(), "tsx");
    }
}
