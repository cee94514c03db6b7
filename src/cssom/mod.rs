//! The CSS object model (spec.md §3 "CSSOM — top-level entities", §4.5).
//!
//! Every type here is a plain, owned, mutable-in-place struct or enum —
//! no `Rc`/`RefCell` sharing, no cycles, one owner per node, matching
//! spec.md's ownership invariant verbatim. This is a deliberate departure
//! from the CST (`crate::cst`), which uses `rctree` because the parser
//! needs parent back-links while building it; the CSSOM needs none, since
//! mutation and traversal (`crate::visitor`) both work top-down from the
//! stylesheet root.

pub mod color;
pub mod declaration;
pub mod expression;
pub mod keyframes;
pub mod media;
pub mod page;
pub mod rule;
pub mod selector;
pub mod stylesheet;
pub mod supports;

pub use declaration::CssDeclaration;
pub use expression::{CssExpression, CssExpressionMember};
pub use keyframes::{CssKeyframeBlock, CssKeyframesRule};
pub use media::{CssMediaExpression, CssMediaQuery, CssMediaRule, MediaModifier};
pub use page::{CssPageRule, CssPageSelector, PageMarginBlock, PageRuleMember};
pub use rule::{CssDeclarationOnlyRule, CssLayerRule, CssStyleRule, CssUnknownRule, TopLevelRule};
pub use selector::{AttributeOperator, CssSelector, SelectorMember};
pub use stylesheet::{CascadingStyleSheet, ImportRule, NamespaceRule};
pub use supports::{CssSupportsCondition, CssSupportsRule};
