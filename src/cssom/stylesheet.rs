//! `CascadingStyleSheet`, `@import`, `@namespace` (spec.md §3).

use crate::location::SourceLocation;

use super::rule::TopLevelRule;

/// An `@import` rule: URI plus an ordered media-query list.
///
/// Invariant (spec.md §3): the URI is non-null — enforced by
/// [`ImportRule::new`] taking an owned, non-optional `String`. Bare-string
/// imports (`@import "x.css";`) are unified with the `url(...)` form at
/// interpretation time (spec.md's supplemented feature, see `DESIGN.md`):
/// both end up here as a plain URI string, with [`ImportRule::was_string_form`]
/// recording which syntax the source used, purely for round-trip
/// serialization fidelity.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRule {
    uri: String,
    was_string_form: bool,
    pub media_queries: Vec<super::media::CssMediaQuery>,
    pub location: Option<SourceLocation>,
}

impl ImportRule {
    pub fn new(uri: impl Into<String>, was_string_form: bool) -> Self {
        ImportRule {
            uri: uri.into(),
            was_string_form,
            media_queries: Vec::new(),
            location: None,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = uri.into();
    }

    pub fn was_string_form(&self) -> bool {
        self.was_string_form
    }

    /// Every import rule's location string is non-empty, since the URI is
    /// guaranteed non-empty by construction; this just exposes it under its
    /// conventional name.
    pub fn get_location_string(&self) -> &str {
        &self.uri
    }
}

/// An `@namespace` rule: optional prefix, URI.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceRule {
    pub prefix: Option<String>,
    pub uri: String,
    pub location: Option<SourceLocation>,
}

impl NamespaceRule {
    pub fn new(prefix: Option<String>, uri: impl Into<String>) -> Self {
        NamespaceRule {
            prefix,
            uri: uri.into(),
            location: None,
        }
    }
}

/// The root of the CSSOM (spec.md §3 "CSSOM — top-level entities").
///
/// Owns, in declaration order: an informational charset, the `@import`
/// rules, the `@namespace` rules, and every other top-level rule. The
/// grammar enforces `@import` before `@namespace` before everything else;
/// the interpreter accepts out-of-order input but reports a warning (see
/// `crate::interpreter`).
#[derive(Debug, Clone, Default)]
pub struct CascadingStyleSheet {
    /// Informational only: actual decoding happens in `crate::reader`
    /// before the parser ever sees the text (spec.md §6 encoding
    /// resolution order).
    pub charset: Option<String>,
    pub imports: Vec<ImportRule>,
    pub namespaces: Vec<NamespaceRule>,
    pub rules: Vec<TopLevelRule>,
}

impl CascadingStyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.charset.is_none() && self.imports.is_empty() && self.namespaces.is_empty() && self.rules.is_empty()
    }

    /// A deep clone producing an independent subtree. `#[derive(Clone)]` on
    /// every owned CSSOM type already gives us this; the named method
    /// exists so callers have a stable, discoverable name for the
    /// operation rather than reaching for `.clone()` directly.
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_rule_rejects_construction_without_a_uri_type() {
        let import = ImportRule::new("a.css", false);
        assert_eq!(import.get_location_string(), "a.css");
        assert!(!import.get_location_string().is_empty());
    }

    #[test]
    fn deep_clone_is_independent() {
        let mut sheet = CascadingStyleSheet::new();
        sheet.imports.push(ImportRule::new("a.css", false));
        let mut clone = sheet.deep_clone();
        clone.imports.push(ImportRule::new("b.css", false));
        assert_eq!(sheet.imports.len(), 1);
        assert_eq!(clone.imports.len(), 2);
    }
}
