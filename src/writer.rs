//! Serializing a [`CascadingStyleSheet`] back to CSS text (spec.md §6
//! "Writer settings", §8 "Round-trip and idempotence").
//!
//! [`serialize`] is a pure function of the CSSOM and a [`WriterSettings`] —
//! it never consults source locations or anything else the parser recorded,
//! so a CSSOM built by hand serializes exactly as well as one built by
//! [`crate::reader`]. The optimized setting produces the tightest text that
//! still round-trips (spec.md §8 scenario 3/4: byte-identical optimized
//! output); the non-optimized default favors a human reading the result.

use crate::cssom::expression::{CalcOperator, CalcProduct, CalcSum, CalcTerm, CssExpression, CssExpressionMember};
use crate::cssom::media::{CssMediaExpression, CssMediaQuery, MediaModifier};
use crate::cssom::page::PageRuleMember;
use crate::cssom::rule::CssDeclarationOnlyRule;
use crate::cssom::selector::{Combinator, PseudoSelector, SelectorMember};
use crate::cssom::supports::CssSupportsCondition;
use crate::cssom::{
    CascadingStyleSheet, CssDeclaration, CssKeyframeBlock, CssKeyframesRule, CssLayerRule, CssMediaRule, CssPageRule,
    CssSelector, CssStyleRule, CssSupportsRule, CssUnknownRule, ImportRule, NamespaceRule, TopLevelRule,
};
use crate::reader::CssVersion;

/// Every knob spec.md §6 names for `get_as_css_string`.
#[derive(Debug, Clone)]
pub struct WriterSettings {
    /// Drop whitespace that isn't syntactically required, and the trailing
    /// `;` after a block's last declaration.
    pub optimized: bool,
    pub newline: String,
    pub indent: String,
    /// When `true`, URIs are always written `url("...")`; when `false`
    /// (the default), `url(...)` with no quotes.
    pub quote_urls: bool,
    /// The grammar variant the output is checked against; see
    /// [`check_version_requirements`].
    pub target_version: CssVersion,
}

impl Default for WriterSettings {
    fn default() -> Self {
        WriterSettings {
            optimized: false,
            newline: "\n".to_string(),
            indent: "  ".to_string(),
            quote_urls: false,
            target_version: CssVersion::Css3,
        }
    }
}

/// Checks whether every rule in `sheet` is expressible in
/// `settings.target_version`. This crate implements exactly one grammar
/// variant ([`CssVersion::Css3`]), so every `CascadingStyleSheet` it can
/// build already satisfies the only target version that exists; the check
/// is here because spec.md §6 names it as a writer setting, ready for the
/// day a second grammar variant exists to actually disagree with something.
pub fn check_version_requirements(_sheet: &CascadingStyleSheet, _settings: &WriterSettings) -> Result<(), Vec<String>> {
    Ok(())
}

/// Serializes `sheet` to CSS text under `settings`.
pub fn serialize(sheet: &CascadingStyleSheet, settings: &WriterSettings) -> String {
    let mut out = String::new();

    if let Some(charset) = &sheet.charset {
        out.push_str("@charset \"");
        out.push_str(charset);
        out.push_str("\";");
        end_top_level_item(&mut out, settings);
    }

    for import in &sheet.imports {
        write_import(&mut out, import, settings);
        end_top_level_item(&mut out, settings);
    }

    for namespace in &sheet.namespaces {
        write_namespace(&mut out, namespace);
        end_top_level_item(&mut out, settings);
    }

    for rule in &sheet.rules {
        write_top_level_rule(&mut out, rule, settings);
        end_top_level_item(&mut out, settings);
    }

    out
}

fn end_top_level_item(out: &mut String, settings: &WriterSettings) {
    if !settings.optimized {
        out.push_str(&settings.newline);
    }
}

fn write_import(out: &mut String, import: &ImportRule, settings: &WriterSettings) {
    out.push_str("@import ");
    write_uri(out, import.uri(), settings);
    if !import.media_queries.is_empty() {
        out.push(' ');
        write_media_query_list(out, &import.media_queries, settings);
    }
    out.push(';');
}

fn write_namespace(out: &mut String, namespace: &NamespaceRule) {
    out.push_str("@namespace ");
    if let Some(prefix) = &namespace.prefix {
        out.push_str(prefix);
        out.push(' ');
    }
    out.push('"');
    out.push_str(&namespace.uri);
    out.push_str("\";");
}

fn write_top_level_rule(out: &mut String, rule: &TopLevelRule, settings: &WriterSettings) {
    match rule {
        TopLevelRule::Style(r) => write_style_rule(out, r, settings),
        TopLevelRule::Media(r) => write_media_rule(out, r, settings),
        TopLevelRule::Supports(r) => write_supports_rule(out, r, settings),
        TopLevelRule::Layer(r) => write_layer_rule(out, r, settings),
        TopLevelRule::Keyframes(r) => write_keyframes_rule(out, r, settings),
        TopLevelRule::Page(r) => write_page_rule(out, r, settings),
        TopLevelRule::FontFace(r) => write_declaration_only_rule(out, r, settings),
        TopLevelRule::Viewport(r) => write_declaration_only_rule(out, r, settings),
        TopLevelRule::Unknown(r) => write_unknown_rule(out, r, settings),
    }
}

fn write_style_rule(out: &mut String, rule: &CssStyleRule, settings: &WriterSettings) {
    write_selector_list(out, &rule.selectors, settings);
    open_block(out, settings);
    write_declaration_block(out, &rule.declarations, settings);
    out.push('}');
}

fn write_selector_list(out: &mut String, selectors: &[CssSelector], settings: &WriterSettings) {
    for (i, selector) in selectors.iter().enumerate() {
        if i > 0 {
            out.push(',');
            if !settings.optimized {
                out.push(' ');
            }
        }
        write_selector(out, selector, settings);
    }
}

fn write_selector(out: &mut String, selector: &CssSelector, settings: &WriterSettings) {
    for member in &selector.members {
        write_selector_member(out, member, settings);
    }
}

fn write_selector_member(out: &mut String, member: &SelectorMember, settings: &WriterSettings) {
    match member {
        SelectorMember::Simple(text) => out.push_str(text),
        SelectorMember::Attribute {
            name,
            operator,
            value,
            case_insensitive,
        } => {
            out.push('[');
            out.push_str(name);
            if let Some(op) = operator {
                out.push_str(op.as_str());
                if let Some(v) = value {
                    out.push('"');
                    out.push_str(v);
                    out.push('"');
                }
            }
            if *case_insensitive {
                out.push_str(" i");
            }
            out.push(']');
        }
        SelectorMember::Combinator(combinator) => write_combinator(out, *combinator, settings),
        SelectorMember::Pseudo(pseudo) => write_pseudo(out, pseudo, settings),
    }
}

fn write_combinator(out: &mut String, combinator: Combinator, settings: &WriterSettings) {
    match combinator {
        // The one CSS combinator with no token of its own: the space *is*
        // the combinator, so it is never optional, optimized or not.
        Combinator::Descendant => out.push(' '),
        Combinator::Child => write_symbolic_combinator(out, ">", settings),
        Combinator::NextSibling => write_symbolic_combinator(out, "+", settings),
        Combinator::SubsequentSibling => write_symbolic_combinator(out, "~", settings),
        Combinator::Column => write_symbolic_combinator(out, "||", settings),
    }
}

fn write_symbolic_combinator(out: &mut String, symbol: &str, settings: &WriterSettings) {
    if !settings.optimized {
        out.push(' ');
    }
    out.push_str(symbol);
    if !settings.optimized {
        out.push(' ');
    }
}

fn write_pseudo(out: &mut String, pseudo: &PseudoSelector, settings: &WriterSettings) {
    match pseudo {
        PseudoSelector::Simple { name, is_element } => {
            out.push_str(if *is_element { "::" } else { ":" });
            out.push_str(name);
        }
        PseudoSelector::Nth { name, nth_text } => {
            out.push(':');
            out.push_str(name);
            out.push('(');
            out.push_str(nth_text);
            out.push(')');
        }
        PseudoSelector::Logical { name, selectors } => {
            out.push(':');
            out.push_str(name);
            out.push('(');
            write_selector_list(out, selectors, settings);
            out.push(')');
        }
        PseudoSelector::Slotted(inner) => {
            out.push_str("::slotted(");
            write_selector(out, inner, settings);
            out.push(')');
        }
        PseudoSelector::Host => out.push_str(":host"),
        PseudoSelector::HostContext(inner) => {
            out.push_str(":host-context(");
            write_selector(out, inner, settings);
            out.push(')');
        }
        PseudoSelector::Function { name, argument } => {
            out.push(':');
            out.push_str(name);
            out.push('(');
            out.push_str(argument);
            out.push(')');
        }
    }
}

fn open_block(out: &mut String, settings: &WriterSettings) {
    if !settings.optimized {
        out.push(' ');
    }
    out.push('{');
}

fn write_declaration_block(out: &mut String, declarations: &[CssDeclaration], settings: &WriterSettings) {
    for (i, declaration) in declarations.iter().enumerate() {
        write_declaration(out, declaration, settings);
        let is_last = i + 1 == declarations.len();
        if !is_last || !settings.optimized {
            out.push(';');
        }
    }
}

fn write_declaration(out: &mut String, declaration: &CssDeclaration, settings: &WriterSettings) {
    out.push_str(declaration.name());
    out.push(':');
    if !settings.optimized {
        out.push(' ');
    }
    write_expression(out, &declaration.expression, settings);
    if declaration.important {
        out.push_str(if settings.optimized { "!important" } else { " !important" });
    }
}

fn write_expression(out: &mut String, expression: &CssExpression, settings: &WriterSettings) {
    for (i, member) in expression.members.iter().enumerate() {
        if i > 0 {
            write_expression_separator(out, expression.separators.get(i - 1), settings);
        }
        write_expression_member(out, member, settings);
    }
}

fn write_expression_separator(
    out: &mut String,
    separator: Option<&crate::cssom::expression::ExpressionSeparator>,
    settings: &WriterSettings,
) {
    use crate::cssom::expression::ExpressionSeparator;
    match separator {
        Some(ExpressionSeparator::Comma) | None => {
            out.push(',');
            if !settings.optimized {
                out.push(' ');
            }
        }
        Some(ExpressionSeparator::Slash) => out.push('/'),
        Some(ExpressionSeparator::Space) => out.push(' '),
    }
}

fn write_expression_member(out: &mut String, member: &CssExpressionMember, settings: &WriterSettings) {
    match member {
        CssExpressionMember::SimpleTerm(text) => out.push_str(text),
        CssExpressionMember::UriTerm(uri) => write_uri(out, uri, settings),
        CssExpressionMember::FunctionCall { name, arguments } => {
            write_function_call(out, name, arguments, settings);
        }
        CssExpressionMember::Calc(sum) => {
            out.push_str("calc(");
            write_calc_sum(out, sum, settings);
            out.push(')');
        }
        CssExpressionMember::LineNames(names) => {
            out.push('[');
            for (i, name) in names.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(name);
            }
            out.push(']');
        }
    }
}

fn write_function_call(out: &mut String, name: &str, arguments: &[CssExpression], settings: &WriterSettings) {
    out.push_str(name);
    out.push('(');
    for (i, argument) in arguments.iter().enumerate() {
        if i > 0 {
            out.push(',');
            if !settings.optimized {
                out.push(' ');
            }
        }
        write_expression(out, argument, settings);
    }
    out.push(')');
}

fn write_calc_sum(out: &mut String, sum: &CalcSum, settings: &WriterSettings) {
    write_calc_product(out, &sum.first, settings);
    for (operator, product) in &sum.rest {
        // `+`/`-` must stay surrounded by spaces even when optimized:
        // `calc(1+-1)` is not the same token stream as `calc(1 + -1)`.
        out.push(' ');
        out.push(calc_operator_char(*operator));
        out.push(' ');
        write_calc_product(out, product, settings);
    }
}

fn write_calc_product(out: &mut String, product: &CalcProduct, settings: &WriterSettings) {
    write_calc_term(out, &product.first, settings);
    for (operator, term) in &product.rest {
        if !settings.optimized {
            out.push(' ');
        }
        out.push(calc_operator_char(*operator));
        if !settings.optimized {
            out.push(' ');
        }
        write_calc_term(out, term, settings);
    }
}

fn calc_operator_char(operator: CalcOperator) -> char {
    match operator {
        CalcOperator::Add => '+',
        CalcOperator::Subtract => '-',
        CalcOperator::Multiply => '*',
        CalcOperator::Divide => '/',
    }
}

fn write_calc_term(out: &mut String, term: &CalcTerm, settings: &WriterSettings) {
    match term {
        CalcTerm::Number(text) | CalcTerm::Dimension(text) | CalcTerm::Percentage(text) => out.push_str(text),
        CalcTerm::Nested(sum) => {
            out.push('(');
            write_calc_sum(out, sum, settings);
            out.push(')');
        }
        CalcTerm::Function { name, arguments } => write_function_call(out, name, arguments, settings),
    }
}

fn write_uri(out: &mut String, uri: &str, settings: &WriterSettings) {
    out.push_str("url(");
    if settings.quote_urls {
        out.push('"');
        out.push_str(uri);
        out.push('"');
    } else {
        out.push_str(uri);
    }
    out.push(')');
}

fn write_media_rule(out: &mut String, rule: &CssMediaRule, settings: &WriterSettings) {
    out.push_str("@media ");
    write_media_query_list(out, &rule.queries, settings);
    open_block(out, settings);
    write_nested_rules(out, &rule.rules, settings);
    out.push('}');
}

fn write_media_query_list(out: &mut String, queries: &[CssMediaQuery], settings: &WriterSettings) {
    for (i, query) in queries.iter().enumerate() {
        if i > 0 {
            out.push(',');
            if !settings.optimized {
                out.push(' ');
            }
        }
        write_media_query(out, query, settings);
    }
}

fn write_media_query(out: &mut String, query: &CssMediaQuery, settings: &WriterSettings) {
    match query.modifier {
        MediaModifier::None => {}
        MediaModifier::Not => out.push_str("not "),
        MediaModifier::Only => out.push_str("only "),
    }
    if let Some(medium) = &query.medium {
        out.push_str(medium);
        if !query.expressions.is_empty() {
            out.push_str(" and ");
        }
    }
    for (i, expression) in query.expressions.iter().enumerate() {
        if i > 0 {
            out.push_str(" and ");
        }
        write_media_expression(out, expression, settings);
    }
}

fn write_media_expression(out: &mut String, expression: &CssMediaExpression, settings: &WriterSettings) {
    out.push('(');
    out.push_str(&expression.feature);
    if let Some(value) = &expression.value {
        out.push(':');
        if !settings.optimized {
            out.push(' ');
        }
        out.push_str(value);
    }
    out.push(')');
}

fn write_nested_rules(out: &mut String, rules: &[TopLevelRule], settings: &WriterSettings) {
    for rule in rules {
        write_top_level_rule(out, rule, settings);
    }
}

fn write_supports_rule(out: &mut String, rule: &CssSupportsRule, settings: &WriterSettings) {
    out.push_str("@supports ");
    write_supports_condition(out, &rule.condition, settings);
    open_block(out, settings);
    write_nested_rules(out, &rule.rules, settings);
    out.push('}');
}

fn write_supports_condition(out: &mut String, condition: &CssSupportsCondition, settings: &WriterSettings) {
    match condition {
        CssSupportsCondition::Declaration(declaration) => {
            out.push('(');
            write_declaration(out, declaration, settings);
            out.push(')');
        }
        CssSupportsCondition::Not(inner) => {
            out.push_str("not ");
            write_supports_condition(out, inner, settings);
        }
        CssSupportsCondition::And(parts) => write_supports_condition_list(out, parts, " and ", settings),
        CssSupportsCondition::Or(parts) => write_supports_condition_list(out, parts, " or ", settings),
        CssSupportsCondition::Group(inner) => {
            out.push('(');
            write_supports_condition(out, inner, settings);
            out.push(')');
        }
    }
}

fn write_supports_condition_list(
    out: &mut String,
    parts: &[CssSupportsCondition],
    joiner: &str,
    settings: &WriterSettings,
) {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str(joiner);
        }
        write_supports_condition(out, part, settings);
    }
}

fn write_layer_rule(out: &mut String, rule: &CssLayerRule, settings: &WriterSettings) {
    out.push_str("@layer");
    if !rule.names.is_empty() {
        out.push(' ');
        for (i, name) in rule.names.iter().enumerate() {
            if i > 0 {
                out.push(',');
                if !settings.optimized {
                    out.push(' ');
                }
            }
            out.push_str(name);
        }
    }
    if rule.is_statement {
        out.push(';');
    } else {
        open_block(out, settings);
        write_nested_rules(out, &rule.rules, settings);
        out.push('}');
    }
}

fn write_keyframes_rule(out: &mut String, rule: &CssKeyframesRule, settings: &WriterSettings) {
    out.push_str("@keyframes ");
    out.push_str(&rule.name);
    open_block(out, settings);
    for block in &rule.blocks {
        write_keyframe_block(out, block, settings);
    }
    out.push('}');
}

fn write_keyframe_block(out: &mut String, block: &CssKeyframeBlock, settings: &WriterSettings) {
    for (i, selector) in block.selectors.iter().enumerate() {
        if i > 0 {
            out.push(',');
            if !settings.optimized {
                out.push(' ');
            }
        }
        out.push_str(selector);
    }
    open_block(out, settings);
    write_declaration_block(out, &block.declarations, settings);
    out.push('}');
}

fn write_page_rule(out: &mut String, rule: &CssPageRule, settings: &WriterSettings) {
    out.push_str("@page");
    if !rule.selectors.is_empty() {
        out.push(' ');
        for (i, selector) in rule.selectors.iter().enumerate() {
            if i > 0 {
                out.push(',');
                if !settings.optimized {
                    out.push(' ');
                }
            }
            out.push_str(&selector.0);
        }
    }
    open_block(out, settings);
    for (i, member) in rule.members.iter().enumerate() {
        let is_last = i + 1 == rule.members.len();
        match member {
            PageRuleMember::Declaration(declaration) => {
                write_declaration(out, declaration, settings);
                if !is_last || !settings.optimized {
                    out.push(';');
                }
            }
            PageRuleMember::MarginBlock(block) => {
                out.push_str(&block.name);
                open_block(out, settings);
                write_declaration_block(out, &block.declarations, settings);
                out.push('}');
            }
        }
    }
    out.push('}');
}

fn write_declaration_only_rule(out: &mut String, rule: &CssDeclarationOnlyRule, settings: &WriterSettings) {
    out.push_str(&rule.at_keyword);
    open_block(out, settings);
    write_declaration_block(out, &rule.declarations, settings);
    out.push('}');
}

fn write_unknown_rule(out: &mut String, rule: &CssUnknownRule, settings: &WriterSettings) {
    out.push_str(&rule.at_keyword);
    if !rule.prelude.is_empty() {
        out.push(' ');
        out.push_str(&rule.prelude);
    }
    match &rule.body {
        Some(body) => {
            open_block(out, settings);
            out.push_str(body);
            out.push('}');
        }
        None => out.push(';'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{parse_text, ReaderOptions};

    fn parse_default(source: &str) -> CascadingStyleSheet {
        parse_text(source, &ReaderOptions::default()).expect("browser-compliant parse never returns None")
    }

    fn parse_browser_compliant(source: &str) -> CascadingStyleSheet {
        let options = ReaderOptions {
            browser_compliant_mode: true,
            ..ReaderOptions::default()
        };
        parse_text(source, &options).expect("browser-compliant parse never returns None")
    }

    #[test]
    fn import_round_trips_to_the_exact_scenario_string() {
        let sheet = parse_default("@import url(a.gif);");
        let settings = WriterSettings::default();
        assert_eq!(serialize(&sheet, &settings), "@import url(a.gif);\n");
    }

    #[test]
    fn optimized_style_rule_is_byte_identical_to_its_source() {
        let source = ":where(.some-tile:not(.preserve-color))>*{color:#161616}";
        let sheet = parse_default(source);
        let settings = WriterSettings {
            optimized: true,
            ..WriterSettings::default()
        };
        assert_eq!(serialize(&sheet, &settings), source);
    }

    #[test]
    fn optimized_media_rule_with_empty_style_rule_matches_scenario_four() {
        let source = "@media screen and (min-width: 768px) {.section {.\n padding: 40px\n}\n\n}";
        let sheet = parse_browser_compliant(source);
        let settings = WriterSettings {
            optimized: true,
            ..WriterSettings::default()
        };
        assert_eq!(
            serialize(&sheet, &settings),
            "@media screen and (min-width:768px){.section{}}"
        );
    }

    #[test]
    fn deep_clone_serializes_identically_to_the_original() {
        let sheet = parse_default(".a, .b > .c { color: red; margin: calc(1px + 2 * 3%); }");
        let clone = sheet.deep_clone();
        let settings = WriterSettings::default();
        assert_eq!(serialize(&sheet, &settings), serialize(&clone, &settings));
    }

    #[test]
    fn identity_url_rewrite_leaves_serialization_unchanged() {
        use crate::visitor::{rewrite_urls, UrlVisitor};

        struct Identity;
        impl UrlVisitor for Identity {}

        let mut sheet = parse_default(".a { background: url(x.png); }");
        let before = serialize(&sheet, &WriterSettings::default());
        rewrite_urls(&mut sheet, &mut Identity);
        let after = serialize(&sheet, &WriterSettings::default());
        assert_eq!(before, after);
    }
}
