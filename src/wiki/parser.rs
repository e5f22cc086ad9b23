//! The content parser seam, plus a directive-level default implementation.
//!
//! The host owns wikitext parsing. [`DirectiveParser`] only recovers what
//! approval bookkeeping needs from a revision: the scope directives, category
//! memberships and plain link targets. Hosts with a real parser plug it in
//! through [`ContentParser`].

use crate::scope::{directives, PropertyKey};
use crate::wiki::types::{Namespace, RevisionId, Title};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// The graph a parse produces, as pushed to the link indexer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutput {
    pub properties: BTreeMap<PropertyKey, String>,
    /// Category names in storage form.
    pub categories: BTreeSet<String>,
    /// Link targets as prefixed titles.
    pub links: BTreeSet<String>,
}

pub trait ContentParser: Send + Sync {
    fn parse(&self, title: &Title, text: &str, revision: Option<RevisionId>) -> ParseOutput;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DirectiveParser;

impl DirectiveParser {
    pub fn new() -> Self {
        Self
    }
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[\[([^\[\]|#]+)(?:#[^\[\]|]*)?(?:\|[^\[\]]*)?\]\]")
            .expect("link pattern is valid")
    })
}

impl ContentParser for DirectiveParser {
    fn parse(&self, title: &Title, text: &str, revision: Option<RevisionId>) -> ParseOutput {
        let mut output = ParseOutput {
            properties: directives::extract(text),
            ..Default::default()
        };

        for caps in link_pattern().captures_iter(text) {
            let raw = caps[1].trim();
            // A leading colon links to a category page instead of joining it.
            let (forced_link, raw) = match raw.strip_prefix(':') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            if raw.is_empty() {
                continue;
            }
            let target = Title::parse(raw);
            if target.namespace == Namespace::CATEGORY && !forced_link {
                output.categories.insert(target.db_key);
            } else {
                output.links.insert(target.prefixed_text());
            }
        }

        tracing::debug!(
            "Parsed {} at {:?}: {} properties, {} categories, {} links",
            title,
            revision,
            output.properties.len(),
            output.categories.len(),
            output.links.len()
        );
        output
    }
}
