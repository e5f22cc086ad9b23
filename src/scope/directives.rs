//! In-content directives that set the scope properties of a title.
//!
//! Two directives are recognized:
//!
//! ```text
//! __APPROVEDREVS__
//! {{#approvable_by: users=Alice, Bob | groups=editors}}
//! ```
//!
//! The magic word sets the opt-in marker; the parser function sets the
//! approver lists. Several `#approvable_by` calls on one page are merged.

use crate::scope::properties::{join_list, PropertyKey, MARKER_AFFIRMATIVE};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const MAGIC_WORD: &str = "__APPROVEDREVS__";

fn approvable_by_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\{\{\s*#approvable_by\s*:([^{}]*)\}\}")
            .expect("approvable_by pattern is valid")
    })
}

/// Extract the scope properties a page's text declares.
pub fn extract(text: &str) -> BTreeMap<PropertyKey, String> {
    let mut properties = BTreeMap::new();

    if text.contains(MAGIC_WORD) {
        properties.insert(PropertyKey::Marker, MARKER_AFFIRMATIVE.to_string());
    }

    let mut users: Vec<String> = Vec::new();
    let mut groups: Vec<String> = Vec::new();
    for caps in approvable_by_pattern().captures_iter(text) {
        for param in caps[1].split('|') {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            let target = match name.trim().to_lowercase().as_str() {
                "users" | "user" => &mut users,
                "groups" | "group" => &mut groups,
                _ => continue,
            };
            target.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
            );
        }
    }

    if !users.is_empty() {
        properties.insert(
            PropertyKey::ApproverUsers,
            join_list(users.iter().map(String::as_str)),
        );
    }
    if !groups.is_empty() {
        properties.insert(
            PropertyKey::ApproverGroups,
            join_list(groups.iter().map(String::as_str)),
        );
    }

    properties
}
