//! In-process host wiki. Holds pages, revisions, file versions and
//! properties in memory and records every index push, so tests can see
//! exactly which side effects ran.

use crate::scope::PropertyKey;
use crate::wiki::parser::ParseOutput;
use crate::wiki::types::*;
use crate::wiki::{LinkIndexer, PropertySource, RevisionSource, SearchIndexer};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
struct StoredPage {
    id: PageId,
    revisions: Vec<(RevisionInfo, String)>,
    files: Vec<FileVersion>,
    properties: BTreeMap<PropertyKey, String>,
}

impl StoredPage {
    fn new(id: PageId) -> Self {
        Self {
            id,
            revisions: Vec::new(),
            files: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    pages: HashMap<TitleKey, StoredPage>,
    next_page_id: i64,
    next_rev_id: i64,
    pushed: Vec<(Title, ParseOutput)>,
    indexed: Vec<(Title, String)>,
}

#[derive(Debug, Default)]
pub struct MemoryWiki {
    state: Mutex<State>,
    fail_indexing: AtomicBool,
}

impl MemoryWiki {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create a page with its first revision. Returns the resolved title.
    pub fn add_page(&self, title: &Title, author: &str, text: &str) -> Title {
        let mut state = self.lock();
        state.next_page_id += 1;
        let id = PageId(state.next_page_id);
        state.pages.insert(title.key(), StoredPage::new(id));
        drop(state);
        self.add_revision(title, author, text);
        title.clone().with_page_id(id)
    }

    /// Append a revision, creating the page if needed.
    pub fn add_revision(&self, title: &Title, author: &str, text: &str) -> RevisionId {
        let mut state = self.lock();
        state.next_rev_id += 1;
        let rev = RevisionId(state.next_rev_id);
        if !state.pages.contains_key(&title.key()) {
            state.next_page_id += 1;
            let id = PageId(state.next_page_id);
            state.pages.insert(title.key(), StoredPage::new(id));
        }
        if let Some(page) = state.pages.get_mut(&title.key()) {
            let timestamp = format!("2024010100{:04}", rev.0);
            page.revisions.push((
                RevisionInfo {
                    id: rev,
                    author: normalize_user_name(author),
                    timestamp,
                },
                text.to_string(),
            ));
        }
        rev
    }

    /// Upload a new version of a file, creating its description page if needed.
    pub fn upload_file(&self, title: &Title, sha1: &str, timestamp: &str, author: &str) -> Title {
        let exists = self.lock().pages.contains_key(&title.key());
        if !exists {
            self.add_page(title, author, "");
        }
        let mut state = self.lock();
        let page = state
            .pages
            .get_mut(&title.key())
            .map(|page| {
                page.files.push(FileVersion {
                    sha1: sha1.to_string(),
                    timestamp: timestamp.to_string(),
                });
                page.id
            });
        match page {
            Some(id) => title.clone().with_page_id(id),
            None => title.clone(),
        }
    }

    /// Make index pushes and search updates fail until switched back.
    pub fn fail_indexing(&self, fail: bool) {
        self.fail_indexing.store(fail, Ordering::SeqCst);
    }

    pub fn pushed(&self) -> Vec<(Title, ParseOutput)> {
        self.lock().pushed.clone()
    }

    pub fn indexed(&self) -> Vec<(Title, String)> {
        self.lock().indexed.clone()
    }
}

#[async_trait]
impl RevisionSource for MemoryWiki {
    async fn resolve(&self, title: &Title) -> Result<Title> {
        let state = self.lock();
        let mut resolved = title.clone();
        resolved.page_id = state.pages.get(&title.key()).map(|p| p.id);
        Ok(resolved)
    }

    async fn page_text(
        &self,
        title: &Title,
        revision: Option<RevisionId>,
    ) -> Result<Option<String>> {
        let state = self.lock();
        let Some(page) = state.pages.get(&title.key()) else {
            return Ok(None);
        };
        let found = match revision {
            Some(id) => page.revisions.iter().find(|(info, _)| info.id == id),
            None => page.revisions.last(),
        };
        Ok(found.map(|(_, text)| text.clone()))
    }

    async fn revisions(&self, title: &Title) -> Result<Vec<RevisionInfo>> {
        let state = self.lock();
        Ok(state
            .pages
            .get(&title.key())
            .map(|p| p.revisions.iter().map(|(info, _)| info.clone()).collect())
            .unwrap_or_default())
    }

    async fn file_versions(&self, title: &Title) -> Result<Vec<FileVersion>> {
        let state = self.lock();
        Ok(state
            .pages
            .get(&title.key())
            .map(|p| p.files.clone())
            .unwrap_or_default())
    }

    async fn latest(&self, title: &Title) -> Result<Option<RevisionPointer>> {
        let state = self.lock();
        let Some(page) = state.pages.get(&title.key()) else {
            return Ok(None);
        };
        Ok(match title.content_kind() {
            ContentKind::Page => page
                .revisions
                .last()
                .map(|(info, _)| RevisionPointer::Page(info.id)),
            ContentKind::File => page.files.last().cloned().map(RevisionPointer::File),
        })
    }
}

#[async_trait]
impl PropertySource for MemoryWiki {
    async fn property(&self, title: &Title, key: PropertyKey) -> Result<Option<String>> {
        let state = self.lock();
        Ok(state
            .pages
            .get(&title.key())
            .and_then(|p| p.properties.get(&key).cloned()))
    }

    async fn set_property(
        &self,
        title: &Title,
        key: PropertyKey,
        value: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock();
        let page = state
            .pages
            .get_mut(&title.key())
            .ok_or_else(|| anyhow!("No such page: {}", title))?;
        match value {
            Some(v) => page.properties.insert(key, v.to_string()),
            None => page.properties.remove(&key),
        };
        Ok(())
    }
}

#[async_trait]
impl LinkIndexer for MemoryWiki {
    async fn push(&self, title: &Title, output: &ParseOutput) -> Result<()> {
        if self.fail_indexing.load(Ordering::SeqCst) {
            bail!("link index unavailable");
        }
        let mut state = self.lock();
        if let Some(page) = state.pages.get_mut(&title.key()) {
            page.properties = output.properties.clone();
        }
        state.pushed.push((title.clone(), output.clone()));
        Ok(())
    }
}

#[async_trait]
impl SearchIndexer for MemoryWiki {
    async fn index(&self, title: &Title, text: &str) -> Result<()> {
        if self.fail_indexing.load(Ordering::SeqCst) {
            bail!("search index unavailable");
        }
        self.lock().indexed.push((title.clone(), text.to_string()));
        Ok(())
    }
}
