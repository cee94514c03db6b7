//! The visitor framework (spec.md §4.6).
//!
//! Two traversals live here: a general-purpose `Visitor` (`enter`/`exit`
//! per rule type plus `on_declaration`, read-only) and a narrower
//! `UrlVisitor` that only stops at URL-bearing positions — `@import` URIs
//! and URI-valued expression terms inside declarations — and exposes each
//! URI by mutable reference so rewriting (e.g. resolving relative URLs
//! against a base) is observable after the walk.

use crate::cssom::expression::{CalcTerm, CssExpression, CssExpressionMember};
use crate::cssom::rule::CssDeclarationOnlyRule;
use crate::cssom::{
    CascadingStyleSheet, CssDeclaration, CssKeyframesRule, CssLayerRule, CssMediaRule, CssPageRule, CssPageSelector,
    CssSelector, CssStyleRule, CssSupportsRule, CssUnknownRule, PageRuleMember, TopLevelRule,
};

/// Read-only, document-order traversal of a [`CascadingStyleSheet`].
///
/// Every method has a no-op default, so a caller overrides only the rule
/// kinds it cares about (spec.md §4.6: "`enter → [children visited] →
/// exit`. No re-entry.").
pub trait Visitor {
    fn enter_style_rule(&mut self, _rule: &CssStyleRule) {}
    fn exit_style_rule(&mut self, _rule: &CssStyleRule) {}
    fn enter_media_rule(&mut self, _rule: &CssMediaRule) {}
    fn exit_media_rule(&mut self, _rule: &CssMediaRule) {}
    fn enter_supports_rule(&mut self, _rule: &CssSupportsRule) {}
    fn exit_supports_rule(&mut self, _rule: &CssSupportsRule) {}
    fn enter_layer_rule(&mut self, _rule: &CssLayerRule) {}
    fn exit_layer_rule(&mut self, _rule: &CssLayerRule) {}
    fn enter_keyframes_rule(&mut self, _rule: &CssKeyframesRule) {}
    fn exit_keyframes_rule(&mut self, _rule: &CssKeyframesRule) {}
    fn enter_page_rule(&mut self, _rule: &CssPageRule) {}
    fn exit_page_rule(&mut self, _rule: &CssPageRule) {}
    fn enter_font_face_rule(&mut self, _rule: &CssDeclarationOnlyRule) {}
    fn exit_font_face_rule(&mut self, _rule: &CssDeclarationOnlyRule) {}
    fn enter_viewport_rule(&mut self, _rule: &CssDeclarationOnlyRule) {}
    fn exit_viewport_rule(&mut self, _rule: &CssDeclarationOnlyRule) {}
    fn enter_unknown_rule(&mut self, _rule: &CssUnknownRule) {}
    fn exit_unknown_rule(&mut self, _rule: &CssUnknownRule) {}
    fn on_declaration(&mut self, _declaration: &CssDeclaration) {}
}

/// Walks every rule in `sheet`, in source order, invoking `visitor`'s
/// callbacks. `@import`/`@namespace` carry no declarations and no nested
/// rules, so they have no callback of their own.
pub fn walk(sheet: &CascadingStyleSheet, visitor: &mut dyn Visitor) {
    for rule in &sheet.rules {
        walk_rule(rule, visitor);
    }
}

fn walk_rule(rule: &TopLevelRule, visitor: &mut dyn Visitor) {
    match rule {
        TopLevelRule::Style(style) => {
            visitor.enter_style_rule(style);
            for decl in &style.declarations {
                visitor.on_declaration(decl);
            }
            visitor.exit_style_rule(style);
        }
        TopLevelRule::Media(media) => {
            visitor.enter_media_rule(media);
            for nested in &media.rules {
                walk_rule(nested, visitor);
            }
            visitor.exit_media_rule(media);
        }
        TopLevelRule::Supports(supports) => {
            visitor.enter_supports_rule(supports);
            for nested in &supports.rules {
                walk_rule(nested, visitor);
            }
            visitor.exit_supports_rule(supports);
        }
        TopLevelRule::Layer(layer) => {
            visitor.enter_layer_rule(layer);
            for nested in &layer.rules {
                walk_rule(nested, visitor);
            }
            visitor.exit_layer_rule(layer);
        }
        TopLevelRule::Keyframes(keyframes) => {
            visitor.enter_keyframes_rule(keyframes);
            for block in &keyframes.blocks {
                for decl in &block.declarations {
                    visitor.on_declaration(decl);
                }
            }
            visitor.exit_keyframes_rule(keyframes);
        }
        TopLevelRule::Page(page) => {
            visitor.enter_page_rule(page);
            for member in &page.members {
                match member {
                    PageRuleMember::Declaration(decl) => visitor.on_declaration(decl),
                    PageRuleMember::MarginBlock(block) => {
                        for decl in &block.declarations {
                            visitor.on_declaration(decl);
                        }
                    }
                }
            }
            visitor.exit_page_rule(page);
        }
        TopLevelRule::FontFace(rule) => {
            visitor.enter_font_face_rule(rule);
            for decl in &rule.declarations {
                visitor.on_declaration(decl);
            }
            visitor.exit_font_face_rule(rule);
        }
        TopLevelRule::Viewport(rule) => {
            visitor.enter_viewport_rule(rule);
            for decl in &rule.declarations {
                visitor.on_declaration(decl);
            }
            visitor.exit_viewport_rule(rule);
        }
        TopLevelRule::Unknown(rule) => {
            visitor.enter_unknown_rule(rule);
            visitor.exit_unknown_rule(rule);
        }
    }
}

/// Identifying context for the rule directly enclosing a declaration during
/// a URL visit (spec.md §4.6: "the visitor keeps a stack of the
/// currently-enclosing top-level rule"). Carries only the fields that don't
/// overlap with `declarations` itself, so a caller can inspect which
/// selector(s)/name a rewritten URI belongs to without this module needing
/// to hold a second borrow of the same rule it is mutating.
#[derive(Debug, Clone, Copy)]
pub enum EnclosingRule<'a> {
    Style { selectors: &'a [CssSelector] },
    Page { selectors: &'a [CssPageSelector] },
    FontFace,
    Viewport,
    Keyframes { name: &'a str },
}

/// Visits only URL-bearing positions, with each URI exposed by mutable
/// reference (spec.md §4.6: "Mutation of the URI via the callback must be
/// observable after traversal completes").
pub trait UrlVisitor {
    /// An `@import` URI. Imports are never nested inside a top-level rule,
    /// so there is no enclosing context to pass.
    fn visit_import_uri(&mut self, _uri: &mut String) {}

    /// A URI-valued expression term inside a declaration, nested arbitrarily
    /// deep inside function-call/`calc()` arguments. `enclosing` is `None`
    /// only when this crate is extended to visit a stand-alone declaration
    /// list with no owning rule (not currently possible through the public
    /// API, but kept `Option` per spec.md's "or `null` when visiting a
    /// stand-alone declaration list").
    fn visit_expression_uri(&mut self, _uri: &mut String, _enclosing: Option<EnclosingRule<'_>>) {}
}

/// Rewrites every URI in `sheet` in place (spec.md §4.6 / §8: "Applying a
/// URL-rewriting visitor that returns the input URI unchanged produces a
/// byte-identical serialization").
pub fn rewrite_urls(sheet: &mut CascadingStyleSheet, visitor: &mut dyn UrlVisitor) {
    for import in &mut sheet.imports {
        let mut uri = import.uri().to_string();
        visitor.visit_import_uri(&mut uri);
        import.set_uri(uri);
    }
    for rule in &mut sheet.rules {
        rewrite_rule_urls(rule, visitor);
    }
}

fn rewrite_rule_urls(rule: &mut TopLevelRule, visitor: &mut dyn UrlVisitor) {
    match rule {
        TopLevelRule::Style(style) => {
            let selectors: &[CssSelector] = &style.selectors;
            let enclosing = EnclosingRule::Style { selectors };
            for decl in &mut style.declarations {
                rewrite_declaration_uris(decl, Some(enclosing), visitor);
            }
        }
        TopLevelRule::Media(media) => {
            for nested in &mut media.rules {
                rewrite_rule_urls(nested, visitor);
            }
        }
        TopLevelRule::Supports(supports) => {
            for nested in &mut supports.rules {
                rewrite_rule_urls(nested, visitor);
            }
        }
        TopLevelRule::Layer(layer) => {
            for nested in &mut layer.rules {
                rewrite_rule_urls(nested, visitor);
            }
        }
        TopLevelRule::Keyframes(keyframes) => {
            let name: &str = &keyframes.name;
            for block in &mut keyframes.blocks {
                let enclosing = EnclosingRule::Keyframes { name };
                for decl in &mut block.declarations {
                    rewrite_declaration_uris(decl, Some(enclosing), visitor);
                }
            }
        }
        TopLevelRule::Page(page) => {
            let selectors: &[CssPageSelector] = &page.selectors;
            let enclosing = EnclosingRule::Page { selectors };
            for member in &mut page.members {
                match member {
                    PageRuleMember::Declaration(decl) => {
                        rewrite_declaration_uris(decl, Some(enclosing), visitor);
                    }
                    PageRuleMember::MarginBlock(block) => {
                        for decl in &mut block.declarations {
                            rewrite_declaration_uris(decl, Some(enclosing), visitor);
                        }
                    }
                }
            }
        }
        TopLevelRule::FontFace(rule) => {
            for decl in &mut rule.declarations {
                rewrite_declaration_uris(decl, Some(EnclosingRule::FontFace), visitor);
            }
        }
        TopLevelRule::Viewport(rule) => {
            for decl in &mut rule.declarations {
                rewrite_declaration_uris(decl, Some(EnclosingRule::Viewport), visitor);
            }
        }
        TopLevelRule::Unknown(_) => {}
    }
}

fn rewrite_declaration_uris(decl: &mut CssDeclaration, enclosing: Option<EnclosingRule<'_>>, visitor: &mut dyn UrlVisitor) {
    rewrite_expression_uris(&mut decl.expression, enclosing, visitor);
}

fn rewrite_expression_uris(expr: &mut CssExpression, enclosing: Option<EnclosingRule<'_>>, visitor: &mut dyn UrlVisitor) {
    for member in &mut expr.members {
        rewrite_member_uris(member, enclosing, visitor);
    }
}

fn rewrite_member_uris(member: &mut CssExpressionMember, enclosing: Option<EnclosingRule<'_>>, visitor: &mut dyn UrlVisitor) {
    match member {
        CssExpressionMember::UriTerm(uri) => visitor.visit_expression_uri(uri, enclosing),
        CssExpressionMember::FunctionCall { arguments, .. } => {
            for arg in arguments {
                rewrite_expression_uris(arg, enclosing, visitor);
            }
        }
        CssExpressionMember::Calc(sum) => rewrite_calc_sum_uris(sum, enclosing, visitor),
        CssExpressionMember::SimpleTerm(_) | CssExpressionMember::LineNames(_) => {}
    }
}

fn rewrite_calc_sum_uris(sum: &mut crate::cssom::expression::CalcSum, enclosing: Option<EnclosingRule<'_>>, visitor: &mut dyn UrlVisitor) {
    rewrite_calc_product_uris(&mut sum.first, enclosing, visitor);
    for (_, product) in &mut sum.rest {
        rewrite_calc_product_uris(product, enclosing, visitor);
    }
}

fn rewrite_calc_product_uris(
    product: &mut crate::cssom::expression::CalcProduct,
    enclosing: Option<EnclosingRule<'_>>,
    visitor: &mut dyn UrlVisitor,
) {
    rewrite_calc_term_uris(&mut product.first, enclosing, visitor);
    for (_, term) in &mut product.rest {
        rewrite_calc_term_uris(term, enclosing, visitor);
    }
}

fn rewrite_calc_term_uris(term: &mut CalcTerm, enclosing: Option<EnclosingRule<'_>>, visitor: &mut dyn UrlVisitor) {
    match term {
        CalcTerm::Nested(sum) => rewrite_calc_sum_uris(sum, enclosing, visitor),
        CalcTerm::Function { arguments, .. } => {
            for arg in arguments {
                rewrite_expression_uris(arg, enclosing, visitor);
            }
        }
        CalcTerm::Number(_) | CalcTerm::Dimension(_) | CalcTerm::Percentage(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cssom::declaration::CssDeclaration;
    use crate::cssom::expression::CssExpression;
    use crate::cssom::stylesheet::ImportRule;

    #[derive(Default)]
    struct CountingVisitor {
        style_rules: u32,
        declarations: u32,
    }

    impl Visitor for CountingVisitor {
        fn enter_style_rule(&mut self, _rule: &CssStyleRule) {
            self.style_rules += 1;
        }

        fn on_declaration(&mut self, _declaration: &CssDeclaration) {
            self.declarations += 1;
        }
    }

    fn sheet_with_one_style_rule() -> CascadingStyleSheet {
        let mut sheet = CascadingStyleSheet::new();
        let mut style = CssStyleRule::new();
        style.selectors.push(CssSelector::new());
        let mut expr = CssExpression::new();
        expr.push(CssExpressionMember::UriTerm("a.png".to_string()));
        style.declarations.push(CssDeclaration::new("background-image", expr, false));
        sheet.rules.push(TopLevelRule::Style(style));
        sheet
    }

    #[test]
    fn walk_visits_declarations_inside_nested_media_rules() {
        let mut sheet = CascadingStyleSheet::new();
        let mut media = CssMediaRule::new();
        media.rules.push(TopLevelRule::Style({
            let mut style = CssStyleRule::new();
            style.declarations.push(CssDeclaration::new("color", CssExpression::new(), false));
            style
        }));
        sheet.rules.push(TopLevelRule::Media(media));

        let mut visitor = CountingVisitor::default();
        walk(&sheet, &mut visitor);
        assert_eq!(visitor.style_rules, 1);
        assert_eq!(visitor.declarations, 1);
    }

    struct AppendSuffix;

    impl UrlVisitor for AppendSuffix {
        fn visit_import_uri(&mut self, uri: &mut String) {
            uri.push_str("?v=1");
        }

        fn visit_expression_uri(&mut self, uri: &mut String, enclosing: Option<EnclosingRule<'_>>) {
            assert!(matches!(enclosing, Some(EnclosingRule::Style { .. })));
            uri.push_str("?v=1");
        }
    }

    #[test]
    fn rewrite_urls_mutates_import_and_expression_uris() {
        let mut sheet = sheet_with_one_style_rule();
        sheet.imports.push(ImportRule::new("base.css", false));

        rewrite_urls(&mut sheet, &mut AppendSuffix);

        assert_eq!(sheet.imports[0].uri(), "base.css?v=1");
        match &sheet.rules[0] {
            TopLevelRule::Style(style) => match &style.declarations[0].expression.members[0] {
                CssExpressionMember::UriTerm(uri) => assert_eq!(uri, "a.png?v=1"),
                other => panic!("expected a URI term, got {other:?}"),
            },
            other => panic!("expected a style rule, got {other:?}"),
        }
    }

    struct Noop;
    impl UrlVisitor for Noop {}

    #[test]
    fn identity_rewrite_leaves_uris_unchanged() {
        let mut sheet = sheet_with_one_style_rule();
        let before = sheet.clone();
        rewrite_urls(&mut sheet, &mut Noop);
        assert_eq!(format!("{sheet:?}"), format!("{before:?}"));
    }
}
