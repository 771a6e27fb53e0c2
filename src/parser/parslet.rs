//! Composable grammar rules ("parslets") over a tree position.
//!
//! A grammar is an arena of rules addressed by [`RuleId`]; recursive
//! grammars are expressed with [`GrammarBuilder::proxy`], a rule whose
//! target is bound after construction. Rules are assembled once, before
//! any document is parsed, and are immutable afterwards.
//!
//! Parsing is all-or-nothing: a rule either returns an [`AstNode`] or
//! `None`. There is no diagnostic payload on mismatch — "no match, try
//! the next alternative" is an ordinary outcome, not an error.

use smol_str::SmolStr;
use tracing::trace;

use super::ast::{AstKind, AstNode};
use crate::dom::TreeNode;

/// Builds a leaf node from a matched element, or rejects it.
///
/// Returning `None` lets a factory act as a predicate on attributes
/// beyond the tag-name match (e.g. "an `element` that carries `ref`").
pub type NodeFactory<N> = Box<dyn Fn(&N) -> Option<AstNode>>;

/// Combines a head result with its continuation's result.
pub type Merger = fn(&AstNode, &AstNode) -> AstNode;

fn merge_results(head: &AstNode, tail: &AstNode) -> AstNode {
    head.merge(tail)
}

/// Sibling nodes that are purely annotational and never significant.
fn is_annotation(local_name: &str) -> bool {
    matches!(local_name, "annotation" | "documentation")
}

/// How a continuation derives its position from the matched node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Descent {
    /// Continue at the matched node itself.
    Stay,
    /// Continue at the matched node's first child.
    FirstChild,
}

/// Index of a rule inside its [`Grammar`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleId(u32);

#[derive(Clone, Copy, Debug)]
struct Link {
    descent: Descent,
    target: RuleId,
}

/// Tag-name match plus leaf construction.
pub struct Terminal<N: TreeNode> {
    tag: SmolStr,
    factory: NodeFactory<N>,
}

impl<N: TreeNode> Terminal<N> {
    /// A terminal matching `name`'s part before any `:` as the tag.
    ///
    /// The suffix after a colon is free disambiguation text, so a grammar
    /// can hold several distinct terminals for the same tag
    /// (`"element:ref"`, `"element:typed"`, ...).
    pub fn new(name: &str, factory: impl Fn(&N) -> Option<AstNode> + 'static) -> Self {
        let tag = name.split(':').next().unwrap_or(name);
        Self {
            tag: SmolStr::from(tag),
            factory: Box::new(factory),
        }
    }

    /// The tag this terminal matches.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

enum Rule<N: TreeNode> {
    /// Bare tag match at the exact position, no sibling skipping.
    Terminal(Terminal<N>),
    /// Annotation-skipping terminal with an optional continuation chain.
    Matcher {
        terminal: Terminal<N>,
        merger: Merger,
        next: Option<Link>,
    },
    /// Ordered alternation; first success wins.
    OneOf { options: Vec<RuleId> },
    /// Collect recognized constructs across all significant siblings.
    Sibblings { options: Vec<RuleId> },
    /// Succeeds only where no node is present.
    Empty,
    /// Late-bound indirection for recursive grammars.
    Proxy { target: Option<RuleId> },
}

/// An assembled, immutable grammar.
pub struct Grammar<N: TreeNode> {
    rules: Vec<Rule<N>>,
    root: RuleId,
}

impl<N: TreeNode> Grammar<N> {
    /// Parse a document starting at its root element.
    pub fn parse(&self, node: &N) -> Option<AstNode> {
        self.parse_rule(self.root, Some(node.clone()))
    }

    /// The grammar's entry rule.
    pub fn root(&self) -> RuleId {
        self.root
    }

    /// Apply one rule at a position (`None` = end of sibling chain).
    pub fn parse_rule(&self, id: RuleId, position: Option<N>) -> Option<AstNode> {
        match &self.rules[id.0 as usize] {
            Rule::Terminal(terminal) => {
                let node = position?;
                if node.local_name() == terminal.tag {
                    (terminal.factory)(&node)
                } else {
                    None
                }
            }

            Rule::Matcher {
                terminal,
                merger,
                next,
            } => {
                // find the next significant sibling
                let mut position = position;
                while let Some(n) = &position {
                    if is_annotation(n.local_name()) {
                        position = n.next_sibling();
                    } else {
                        break;
                    }
                }
                let node = position?;
                if node.local_name() != terminal.tag {
                    return None;
                }
                let head = (terminal.factory)(&node)?;
                trace!(tag = terminal.tag.as_str(), "matcher: terminal matched");

                let Some(link) = next else {
                    return Some(head);
                };
                let next_position = match link.descent {
                    Descent::Stay => Some(node.clone()),
                    Descent::FirstChild => node.first_child(),
                };
                // a failing continuation fails the whole matcher;
                // partial matches never escape
                let tail = self.parse_rule(link.target, next_position)?;
                Some(merger(&head, &tail))
            }

            Rule::OneOf { options } => {
                for option in options {
                    if let Some(result) = self.parse_rule(*option, position.clone()) {
                        return Some(result);
                    }
                }
                None
            }

            Rule::Sibblings { options } => {
                let mut result = AstNode::new(AstKind::Sibblings);
                let mut position = position;
                while let Some(node) = position {
                    if !is_annotation(node.local_name()) {
                        for option in options {
                            if let Some(item) = self.parse_rule(*option, Some(node.clone())) {
                                result.children.push(item);
                                break;
                            }
                        }
                        // non-matching siblings are silently skipped
                    }
                    position = node.next_sibling();
                }
                Some(result)
            }

            Rule::Empty => match position {
                None => Some(AstNode::new(AstKind::Empty)),
                Some(_) => None,
            },

            Rule::Proxy { target } => match target {
                Some(target) => self.parse_rule(*target, position),
                None => {
                    trace!("unbound proxy rule treated as mismatch");
                    None
                }
            },
        }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Assembles rules into a [`Grammar`].
///
/// Chain-extension methods (`child`, `then_match`, `children`, ...) append
/// a continuation at the *end* of an existing matcher chain, mirroring how
/// sequential grammar composition reads: match this, then that below it.
pub struct GrammarBuilder<N: TreeNode> {
    rules: Vec<Rule<N>>,
}

impl<N: TreeNode> Default for GrammarBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: TreeNode> GrammarBuilder<N> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    fn push(&mut self, rule: Rule<N>) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(rule);
        id
    }

    /// A bare terminal rule (no sibling skipping, no continuation).
    pub fn terminal(&mut self, terminal: Terminal<N>) -> RuleId {
        self.push(Rule::Terminal(terminal))
    }

    /// A matcher with the default merge combination.
    pub fn matcher(&mut self, terminal: Terminal<N>) -> RuleId {
        self.matcher_with(terminal, merge_results)
    }

    /// A matcher whose head/continuation results combine via `merger`.
    pub fn matcher_with(&mut self, terminal: Terminal<N>, merger: Merger) -> RuleId {
        self.push(Rule::Matcher {
            terminal,
            merger,
            next: None,
        })
    }

    /// Ordered alternation over `options`.
    pub fn one_of(&mut self, options: Vec<RuleId>) -> RuleId {
        self.push(Rule::OneOf { options })
    }

    /// Sibling collection with first-match-wins alternatives per sibling.
    pub fn siblings(&mut self, options: Vec<RuleId>) -> RuleId {
        self.push(Rule::Sibblings { options })
    }

    /// Succeeds only at end-of-chain.
    pub fn empty(&mut self) -> RuleId {
        self.push(Rule::Empty)
    }

    /// A rule whose target is bound later with [`GrammarBuilder::bind`].
    pub fn proxy(&mut self) -> RuleId {
        self.push(Rule::Proxy { target: None })
    }

    /// Bind a proxy created with [`GrammarBuilder::proxy`].
    pub fn bind(&mut self, proxy: RuleId, target: RuleId) {
        match &mut self.rules[proxy.0 as usize] {
            Rule::Proxy { target: slot } => *slot = Some(target),
            _ => debug_assert!(false, "bind target is not a proxy"),
        }
    }

    // =========================================================================
    // Chain extension
    // =========================================================================

    /// Append a matcher for `terminal` below the chain's last match.
    pub fn child(&mut self, chain: RuleId, terminal: Terminal<N>) -> RuleId {
        let next = self.matcher(terminal);
        self.append(chain, Descent::FirstChild, next);
        chain
    }

    /// [`GrammarBuilder::child`] with a custom merger on the appended matcher.
    pub fn child_with(&mut self, chain: RuleId, terminal: Terminal<N>, merger: Merger) -> RuleId {
        let next = self.matcher_with(terminal, merger);
        self.append(chain, Descent::FirstChild, next);
        chain
    }

    /// Append a matcher at the same position as the chain's last match.
    pub fn then_match(&mut self, chain: RuleId, terminal: Terminal<N>) -> RuleId {
        let next = self.matcher(terminal);
        self.append(chain, Descent::Stay, next);
        chain
    }

    /// Append sibling collection over the last match's children.
    pub fn children(&mut self, chain: RuleId, options: Vec<RuleId>) -> RuleId {
        let next = self.siblings(options);
        self.append(chain, Descent::FirstChild, next);
        chain
    }

    /// Append ordered alternation over the last match's first child.
    pub fn child_is_one_of(&mut self, chain: RuleId, options: Vec<RuleId>) -> RuleId {
        let next = self.one_of(options);
        self.append(chain, Descent::FirstChild, next);
        chain
    }

    /// Assert the last match has no children.
    pub fn then_empty(&mut self, chain: RuleId) -> RuleId {
        let next = self.empty();
        self.append(chain, Descent::FirstChild, next);
        chain
    }

    fn append(&mut self, chain: RuleId, descent: Descent, target: RuleId) {
        let mut cursor = chain;
        loop {
            match &self.rules[cursor.0 as usize] {
                Rule::Matcher {
                    next: Some(link), ..
                } => cursor = link.target,
                Rule::Matcher { next: None, .. } => break,
                _ => {
                    debug_assert!(false, "chain extension requires a matcher head");
                    return;
                }
            }
        }
        if let Rule::Matcher { next, .. } = &mut self.rules[cursor.0 as usize] {
            *next = Some(Link { descent, target });
        }
    }

    /// Finish the grammar with `root` as its entry rule.
    pub fn build(self, root: RuleId) -> Grammar<N> {
        debug_assert!(
            self.rules
                .iter()
                .all(|r| !matches!(r, Rule::Proxy { target: None })),
            "grammar contains unbound proxies"
        );
        Grammar {
            rules: self.rules,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{TreeNode as _, XmlDocument};
    use crate::parser::ast::Attr;

    fn leaf(kind: AstKind) -> impl Fn(&crate::dom::XmlElement) -> Option<AstNode> {
        move |_| Some(AstNode::new(kind))
    }

    fn named_leaf(kind: AstKind) -> impl Fn(&crate::dom::XmlElement) -> Option<AstNode> {
        move |n| {
            Some(match n.attribute("name") {
                Some(name) => AstNode::new(kind).named(name),
                None => AstNode::new(kind),
            })
        }
    }

    #[test]
    fn test_terminal_matches_tag() {
        let doc = XmlDocument::parse(r#"<item name="a"/>"#).unwrap();
        let mut b = GrammarBuilder::new();
        let item = b.terminal(Terminal::new("item", named_leaf(AstKind::Field)));
        let g = b.build(item);

        let result = g.parse(&doc.root()).unwrap();
        assert_eq!(result.name.as_deref(), Some("a"));
        assert!(
            g.parse(&XmlDocument::parse("<other/>").unwrap().root())
                .is_none()
        );
    }

    #[test]
    fn test_factory_can_reject() {
        let doc = XmlDocument::parse("<item/>").unwrap();
        let mut b = GrammarBuilder::new();
        let item = b.terminal(Terminal::new("item", |n: &crate::dom::XmlElement| {
            n.attribute("name").map(|_| AstNode::new(AstKind::Field))
        }));
        let g = b.build(item);
        assert!(g.parse(&doc.root()).is_none());
    }

    #[test]
    fn test_matcher_skips_annotations() {
        let doc = XmlDocument::parse(
            "<root><annotation/><documentation/><item/></root>",
        )
        .unwrap();
        let mut b = GrammarBuilder::new();
        let item = b.matcher(Terminal::new("item", leaf(AstKind::Field)));
        let g = b.build(item);
        assert!(g.parse_rule(g.root(), doc.root().first_child()).is_some());
    }

    #[test]
    fn test_matcher_is_all_or_nothing() {
        // head matches but the continuation cannot: whole matcher fails
        let doc = XmlDocument::parse("<outer><wrong/></outer>").unwrap();
        let mut b = GrammarBuilder::new();
        let chain = b.matcher(Terminal::new("outer", leaf(AstKind::Class)));
        b.child(chain, Terminal::new("inner", leaf(AstKind::Field)));
        let g = b.build(chain);
        assert!(g.parse(&doc.root()).is_none());
    }

    #[test]
    fn test_one_of_ordered_precedence() {
        let doc = XmlDocument::parse(r#"<item kind="b"/>"#).unwrap();
        let mut b = GrammarBuilder::new();
        let first = b.terminal(Terminal::new("item", |n: &crate::dom::XmlElement| {
            (n.attribute("kind") == Some("a")).then(|| AstNode::new(AstKind::Field).named("first"))
        }));
        let second = b.terminal(Terminal::new("item", |_: &crate::dom::XmlElement| {
            Some(AstNode::new(AstKind::Field).named("second"))
        }));
        let third = b.terminal(Terminal::new("item", |_: &crate::dom::XmlElement| {
            Some(AstNode::new(AstKind::Field).named("third"))
        }));
        let alt = b.one_of(vec![first, second, third]);
        let g = b.build(alt);

        // first fails on its predicate, so the earliest succeeding
        // alternative (second) must win over third
        let result = g.parse(&doc.root()).unwrap();
        assert_eq!(result.name.as_deref(), Some("second"));
    }

    #[test]
    fn test_siblings_collects_and_skips() {
        let doc = XmlDocument::parse(
            "<root><item/><annotation/><unknown/><item/><other/></root>",
        )
        .unwrap();
        let mut b = GrammarBuilder::new();
        let item = b.matcher(Terminal::new("item", leaf(AstKind::Field)));
        let other = b.matcher(Terminal::new("other", leaf(AstKind::Reference)));
        let all = b.siblings(vec![item, other]);
        let g = b.build(all);

        let result = g.parse_rule(g.root(), doc.root().first_child()).unwrap();
        assert_eq!(result.kind, AstKind::Sibblings);
        let kinds: Vec<AstKind> = result.children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![AstKind::Field, AstKind::Field, AstKind::Reference]);
    }

    #[test]
    fn test_empty_asserts_exhaustion() {
        let doc = XmlDocument::parse("<root><item/></root>").unwrap();
        let mut b = GrammarBuilder::new();
        let e = b.empty();
        let g = b.build(e);
        assert!(g.parse_rule(g.root(), None).is_some());
        assert!(g.parse_rule(g.root(), doc.root().first_child()).is_none());
    }

    #[test]
    fn test_proxy_enables_recursion() {
        // item := <item> containing any number of items
        let doc = XmlDocument::parse(
            "<item><item><item/></item><item/></item>",
        )
        .unwrap();
        let mut b = GrammarBuilder::new();
        let self_ref = b.proxy();
        let item = b.matcher(Terminal::new("item", leaf(AstKind::Class)));
        b.children(item, vec![self_ref]);
        b.bind(self_ref, item);
        let g = b.build(item);

        let result = g.parse(&doc.root()).unwrap();
        assert_eq!(result.children.len(), 2);
        assert_eq!(result.children[0].children.len(), 1);
        assert_eq!(result.children[1].children.len(), 0);
    }

    #[test]
    fn test_merge_through_chain() {
        // the chained continuation's attributes refine the head's
        let doc =
            XmlDocument::parse(r#"<outer name="x"><inner base="b:T"/></outer>"#).unwrap();
        let mut b = GrammarBuilder::new();
        let chain = b.matcher(Terminal::new("outer", |n: &crate::dom::XmlElement| {
            Some(AstNode::new(AstKind::Class).add_attribs(n))
        }));
        b.child(chain, Terminal::new("inner", |n: &crate::dom::XmlElement| {
            Some(AstNode::new(AstKind::Empty).add_attribs(n))
        }));
        let g = b.build(chain);

        let result = g.parse(&doc.root()).unwrap();
        assert_eq!(result.kind, AstKind::Class);
        assert_eq!(result.name.as_deref(), Some("x"));
        assert_eq!(result.text(&Attr::Base), Some("b:T"));
    }

    #[test]
    fn test_unbound_proxy_fails_quietly() {
        let doc = XmlDocument::parse("<item/>").unwrap();
        let mut b = GrammarBuilder::new();
        let p = b.proxy();
        let g = Grammar {
            rules: b.rules,
            root: p,
        };
        assert!(g.parse(&doc.root()).is_none());
    }

    #[test]
    fn test_add_attribs_via_engine() {
        let doc = XmlDocument::parse(
            r#"<field name="n" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>"#,
        )
        .unwrap();
        let mut b = GrammarBuilder::new();
        let f = b.terminal(Terminal::new("field", |n: &crate::dom::XmlElement| {
            Some(crate::parser::ast::ast_field().add_field(n, None))
        }));
        let g = b.build(f);
        let result = g.parse(&doc.root()).unwrap();
        assert_eq!(result.text(&Attr::FieldName), Some("n"));
        assert_eq!(result.text(&Attr::FieldType), Some("string"));
        assert!(result.flag(&Attr::Array));
        assert!(result.flag(&Attr::Optional));
    }
}
