//! `CSSExpression` and its member types (spec.md §3, §4.4 "Calc expression").

use crate::location::SourceLocation;

/// The operator separating two expression members (spec.md §3: "ordered
/// sequence of members separated by operators `,` `/` (space)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionSeparator {
    Comma,
    Slash,
    Space,
}

/// A `calc()` sum: products separated by `+`/`-` (spec.md §4.4 "Calc
/// expression"). An unrecognized operator token is reported as a warning by
/// the interpreter and the offending operator is skipped rather than
/// failing the whole expression (spec.md: "Unknown operator text → warning;
/// operator skipped").
#[derive(Debug, Clone, PartialEq)]
pub struct CalcSum {
    pub first: CalcProduct,
    /// `(operator, product)` pairs following `first`, in source order.
    pub rest: Vec<(CalcOperator, CalcProduct)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// A `calc()` product: a sequence of calc terms separated by `*`/`/`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcProduct {
    pub first: CalcTerm,
    pub rest: Vec<(CalcOperator, CalcTerm)>,
}

/// A single leaf of a calc expression.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcTerm {
    Number(String),
    Dimension(String),
    Percentage(String),
    /// A parenthesized nested calc expression, e.g. `(100% - 2 * 10px)`.
    Nested(Box<CalcSum>),
    /// Any other function call appearing inside `calc()`, e.g. `var(--x)`.
    Function { name: String, arguments: Vec<CssExpression> },
}

/// One member of a [`CssExpression`] (spec.md §3: "Members are one of:
/// simple term (string/number/ident), URI term, function-call, calc
/// expression, line-names").
#[derive(Debug, Clone, PartialEq)]
pub enum CssExpressionMember {
    /// A bare string/number/identifier term, stored as its source text.
    SimpleTerm(String),
    /// An already-unquoted, unescaped URI (spec.md §4.5 "URI term").
    UriTerm(String),
    FunctionCall {
        name: String,
        arguments: Vec<CssExpression>,
    },
    Calc(CalcSum),
    /// A CSS Grid `[line-name ...]` production, carried as the raw list of
    /// names between the brackets.
    LineNames(Vec<String>),
}

impl CssExpressionMember {
    /// Mutable access to the URI string, when this member is a
    /// [`CssExpressionMember::UriTerm`]. Used by the URL-rewriting visitor
    /// (spec.md §4.6: "the visitor exposes the URI term by reference, not
    /// by value").
    pub fn as_uri_mut(&mut self) -> Option<&mut String> {
        match self {
            CssExpressionMember::UriTerm(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            CssExpressionMember::UriTerm(uri) => Some(uri),
            _ => None,
        }
    }
}

/// An ordered sequence of `(member, trailing separator)` entries; the last
/// member has no trailing separator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CssExpression {
    pub members: Vec<CssExpressionMember>,
    pub separators: Vec<ExpressionSeparator>,
    pub location: Option<SourceLocation>,
}

impl CssExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, member: CssExpressionMember) {
        self.members.push(member);
    }

    pub fn push_separator(&mut self, separator: ExpressionSeparator) {
        self.separators.push(separator);
    }

    /// All URI terms in this expression, mutably, for the URL-rewriting
    /// visitor — only the top level; nested function-call arguments are
    /// walked separately by `crate::visitor`.
    pub fn uri_terms_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.members.iter_mut().filter_map(|m| m.as_uri_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_terms_mut_exposes_uri_by_reference() {
        let mut expr = CssExpression::new();
        expr.push(CssExpressionMember::UriTerm("a.png".to_string()));
        expr.push(CssExpressionMember::SimpleTerm("no-repeat".to_string()));
        for uri in expr.uri_terms_mut() {
            uri.push_str("?v=2");
        }
        assert_eq!(expr.members[0].as_uri(), Some("a.png?v=2"));
    }
}
