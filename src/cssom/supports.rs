//! `CSSSupportsRule` and its condition tree (spec.md §3, §4.4 "Supports
//! condition").

use crate::location::SourceLocation;

use super::declaration::CssDeclaration;
use super::rule::TopLevelRule;

/// A boolean tree of parenthesized declarations connected by `and`/`or`/`not`
/// (spec.md's Glossary: "Supports condition").
///
/// Recursive per spec.md §4.4: "negation (one child), condition-in-parens
/// (one child: either a declaration or a nested condition), or an operator
/// leaf (AND/OR, case-insensitive)".
#[derive(Debug, Clone, PartialEq)]
pub enum CssSupportsCondition {
    Declaration(CssDeclaration),
    Not(Box<CssSupportsCondition>),
    And(Vec<CssSupportsCondition>),
    Or(Vec<CssSupportsCondition>),
    /// A parenthesized nested condition with no combining operator applied
    /// yet, e.g. the single operand before the parser sees whether an
    /// `and`/`or` keyword follows.
    Group(Box<CssSupportsCondition>),
}

/// An `@supports` rule: a supports-condition tree plus nested top-level
/// rules.
#[derive(Debug, Clone)]
pub struct CssSupportsRule {
    pub condition: CssSupportsCondition,
    pub rules: Vec<TopLevelRule>,
    pub location: Option<SourceLocation>,
}

impl CssSupportsRule {
    pub fn new(condition: CssSupportsCondition) -> Self {
        CssSupportsRule {
            condition,
            rules: Vec::new(),
            location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cssom::expression::CssExpression;

    #[test]
    fn condition_tree_nests_and_or_not() {
        let decl = CssDeclaration::new("display", CssExpression::new(), false);
        let condition = CssSupportsCondition::And(vec![
            CssSupportsCondition::Declaration(decl.clone()),
            CssSupportsCondition::Not(Box::new(CssSupportsCondition::Declaration(decl))),
        ]);
        match condition {
            CssSupportsCondition::And(parts) => assert_eq!(parts.len(), 2),
            _ => panic!("expected And"),
        }
    }
}
