//! Is a title under the approval regime at all?
//!
//! Checked in strict order, first match wins:
//!
//! 1. the title must exist;
//! 2. an installed [`ScopeOverride`] may answer for it;
//! 3. its namespace is statically approvable;
//! 4. it declares approver users or groups (any value counts);
//! 5. it carries the opt-in marker with the affirmative value.
//!
//! The classifier itself does not cache; the processing context memoizes
//! decisions for its own lifetime.

use crate::config::Config;
use crate::scope::properties::{PropertyKey, MARKER_AFFIRMATIVE};
use crate::wiki::types::Title;
use crate::wiki::{PropertySource, ScopeOverride};
use anyhow::Result;
use std::fmt;

/// Where a scope decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Override,
    StaticNamespace,
    ApproverProperty,
    Marker,
    /// Exists, but nothing puts it in scope.
    Unmarked,
    Nonexistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeDecision {
    pub approvable: bool,
    pub provenance: Provenance,
}

impl ScopeDecision {
    fn approvable(provenance: Provenance) -> Self {
        Self {
            approvable: true,
            provenance,
        }
    }

    fn excluded(provenance: Provenance) -> Self {
        Self {
            approvable: false,
            provenance,
        }
    }

    /// True when the decision came from the title's own content properties.
    pub fn is_content_declared(&self) -> bool {
        matches!(
            self.provenance,
            Provenance::ApproverProperty | Provenance::Marker
        )
    }
}

impl fmt::Display for ScopeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.approvable {
            "approvable"
        } else {
            "not approvable"
        };
        let why = match self.provenance {
            Provenance::Override => "decided by override hook",
            Provenance::StaticNamespace => "namespace is approvable",
            Provenance::ApproverProperty => "page declares approvers",
            Provenance::Marker => "page is marked __APPROVEDREVS__",
            Provenance::Unmarked => "no approval marker",
            Provenance::Nonexistent => "page does not exist",
        };
        write!(f, "{} ({})", verdict, why)
    }
}

pub struct ScopeClassifier<'a> {
    config: &'a Config,
    properties: &'a dyn PropertySource,
    hook: Option<&'a dyn ScopeOverride>,
}

impl<'a> ScopeClassifier<'a> {
    pub fn new(
        config: &'a Config,
        properties: &'a dyn PropertySource,
        hook: Option<&'a dyn ScopeOverride>,
    ) -> Self {
        Self {
            config,
            properties,
            hook,
        }
    }

    pub async fn classify(&self, title: &Title) -> Result<ScopeDecision> {
        if !title.exists() {
            return Ok(ScopeDecision::excluded(Provenance::Nonexistent));
        }

        if let Some(verdict) = self.hook.and_then(|hook| hook.is_approvable(title)) {
            return Ok(ScopeDecision {
                approvable: verdict,
                provenance: Provenance::Override,
            });
        }

        if self.config.is_approvable_namespace(title.namespace) {
            return Ok(ScopeDecision::approvable(Provenance::StaticNamespace));
        }

        for key in [PropertyKey::ApproverUsers, PropertyKey::ApproverGroups] {
            if self.properties.property(title, key).await?.is_some() {
                return Ok(ScopeDecision::approvable(Provenance::ApproverProperty));
            }
        }

        let marker = self.properties.property(title, PropertyKey::Marker).await?;
        if marker.as_deref() == Some(MARKER_AFFIRMATIVE) {
            return Ok(ScopeDecision::approvable(Provenance::Marker));
        }

        Ok(ScopeDecision::excluded(Provenance::Unmarked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::memory::MemoryWiki;
    use crate::wiki::types::Namespace;

    struct DenyHelp;

    impl ScopeOverride for DenyHelp {
        fn is_approvable(&self, title: &Title) -> Option<bool> {
            (title.namespace == Namespace::HELP).then_some(false)
        }
    }

    async fn classify(config: &Config, wiki: &MemoryWiki, title: &Title) -> ScopeDecision {
        ScopeClassifier::new(config, wiki, None)
            .classify(title)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_static_namespace_needs_no_properties() {
        let wiki = MemoryWiki::new();
        let title = wiki.add_page(&Title::new(Namespace::MAIN, "Home"), "alice", "plain");
        let decision = classify(&Config::default(), &wiki, &title).await;
        assert!(decision.approvable);
        assert_eq!(decision.provenance, Provenance::StaticNamespace);
    }

    #[tokio::test]
    async fn test_approver_property_any_value() {
        let wiki = MemoryWiki::new();
        let title = wiki.add_page(&Title::new(Namespace::TALK, "Home"), "alice", "x");
        wiki.set_property(&title, PropertyKey::ApproverUsers, Some(""))
            .await
            .unwrap();
        let decision = classify(&Config::default(), &wiki, &title).await;
        assert!(decision.approvable);
        assert!(decision.is_content_declared());
    }

    #[tokio::test]
    async fn test_marker_must_be_affirmative() {
        let wiki = MemoryWiki::new();
        let title = wiki.add_page(&Title::new(Namespace::TALK, "Drafts"), "alice", "x");
        wiki.set_property(&title, PropertyKey::Marker, Some("n"))
            .await
            .unwrap();
        assert!(!classify(&Config::default(), &wiki, &title).await.approvable);

        wiki.set_property(&title, PropertyKey::Marker, Some("y"))
            .await
            .unwrap();
        let decision = classify(&Config::default(), &wiki, &title).await;
        assert_eq!(decision.provenance, Provenance::Marker);
    }

    #[tokio::test]
    async fn test_unmarked_title_outside_namespaces() {
        let wiki = MemoryWiki::new();
        let title = wiki.add_page(&Title::new(Namespace::TALK, "Chat"), "alice", "x");
        let decision = classify(&Config::default(), &wiki, &title).await;
        assert_eq!(decision, ScopeDecision::excluded(Provenance::Unmarked));
    }

    #[tokio::test]
    async fn test_nonexistent_is_never_approvable() {
        let wiki = MemoryWiki::new();
        let decision = classify(&Config::default(), &wiki, &Title::new(Namespace::MAIN, "Nope")).await;
        assert!(!decision.approvable);
        assert_eq!(decision.provenance, Provenance::Nonexistent);
    }

    #[tokio::test]
    async fn test_override_wins_over_namespace() {
        let wiki = MemoryWiki::new();
        let title = wiki.add_page(&Title::new(Namespace::HELP, "Editing"), "alice", "x");
        let config = Config::default();
        let hook = DenyHelp;
        let decision = ScopeClassifier::new(&config, &wiki, Some(&hook))
            .classify(&title)
            .await
            .unwrap();
        assert_eq!(
            decision,
            ScopeDecision {
                approvable: false,
                provenance: Provenance::Override
            }
        );
    }
}
