//! What a reader sees when they open a title.

use crate::approval::ApprovalContext;
use crate::permission::Capability;
use crate::wiki::types::*;
use anyhow::Result;

/// The parts of a page request that decide which revision is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRequest {
    /// An explicitly requested revision.
    pub oldid: Option<RevisionId>,
    pub action: Option<String>,
}

impl ViewRequest {
    pub fn latest() -> Self {
        Self::default()
    }

    pub fn revision(oldid: RevisionId) -> Self {
        Self {
            oldid: Some(oldid),
            action: None,
        }
    }

    /// A plain view of the page: no explicit revision, and an action that
    /// renders the page. Only these show the approved revision.
    pub fn is_default(&self) -> bool {
        self.oldid.is_none()
            && matches!(
                self.action.as_deref(),
                None | Some("view") | Some("purge") | Some("render")
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOutcome {
    /// Page text to render; `None` when there is nothing to show.
    pub text: Option<String>,
    /// The revision the text comes from; `None` for the blank placeholder.
    pub shown: Option<RevisionPointer>,
    pub latest: Option<RevisionPointer>,
    /// Offer the reader a link to the latest revision.
    pub link_to_latest: bool,
}

impl ViewOutcome {
    pub fn is_latest(&self) -> bool {
        self.shown.is_some() && self.shown == self.latest
    }
}

impl<'a> ApprovalContext<'a> {
    /// Text shown for `request` on `title`.
    pub async fn displayed_text(
        &mut self,
        title: &Title,
        request: &ViewRequest,
    ) -> Result<Option<String>> {
        Ok(self.shown(title, request).await?.0)
    }

    /// Full view outcome for `viewer`.
    pub async fn view(
        &mut self,
        title: &Title,
        request: &ViewRequest,
        viewer: &User,
    ) -> Result<ViewOutcome> {
        let title = self.resolve(title).await?;
        let latest = self.platform.revisions.latest(&title).await?;
        let (text, shown) = self.shown(&title, request).await?;

        let link_to_latest = request.is_default()
            && latest.is_some()
            && shown != latest
            && self.platform.authorizer.has_capability(
                viewer,
                Capability::ViewLinkToLatest,
                Some(&title),
            );

        Ok(ViewOutcome {
            text,
            shown,
            latest,
            link_to_latest,
        })
    }

    async fn shown(
        &mut self,
        title: &Title,
        request: &ViewRequest,
    ) -> Result<(Option<String>, Option<RevisionPointer>)> {
        let title = self.resolve(title).await?;
        let revisions = self.platform.revisions.clone();

        if !request.is_default() || !self.is_approvable(&title).await? {
            let text = revisions.page_text(&title, request.oldid).await?;
            let shown = match request.oldid {
                Some(id) => text.as_ref().map(|_| RevisionPointer::Page(id)),
                None => revisions.latest(&title).await?,
            };
            return Ok((text, shown));
        }

        let approved = self.approved_revision(&title).await?;
        if title.content_kind() == ContentKind::File {
            // The description page always shows its latest text; the
            // approval picks the file version.
            let text = revisions.page_text(&title, None).await?;
            let shown = match approved {
                Some(pointer) => Some(pointer),
                None => revisions.latest(&title).await?,
            };
            return Ok((text, shown));
        }

        let text = self.approved_content(&title).await?;
        let shown = match approved {
            Some(pointer) => Some(pointer),
            None if self.platform.config.blank_if_unapproved => None,
            None => revisions.latest(&title).await?,
        };
        Ok((text, shown))
    }
}
