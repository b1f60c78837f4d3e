//! Structural history edits that keep the chain unbroken.

use crate::builder::RevisionVerificationBuilder;
use crate::cascade::{self, required_parent_data};
use crate::error::ChainError;
use crate::ChainStore;
use aqua_hash::HashingService;
use aqua_model::{PageRef, Revision, RevisionId, RevisionVerificationData, VerificationEntity};
use tracing::info;

/// Outcome of a delete or squash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManipulationReport {
    pub page: PageRef,
    /// Revisions whose rows and records were removed.
    pub removed: Vec<RevisionId>,
    /// Surviving revisions whose records were re-derived.
    pub rederived: Vec<RevisionId>,
    /// The page's latest revision afterwards; `None` when the page is gone.
    pub latest: Option<RevisionId>,
}

/// Deletes and squashes revisions of one page.
///
/// Both operations plan every new record before touching the store. A lookup
/// failure while planning aborts the operation with nothing written.
pub struct RevisionManipulator<'a, S: ?Sized> {
    store: &'a mut S,
    hashing: &'a HashingService,
}

impl<'a, S: ChainStore + ?Sized> RevisionManipulator<'a, S> {
    pub fn new(store: &'a mut S, hashing: &'a HashingService) -> Self {
        Self { store, hashing }
    }

    /// Delete `ids` and re-link every later revision to its new predecessor.
    pub fn delete_revisions(
        &mut self,
        ids: &[RevisionId],
    ) -> Result<ManipulationReport, ChainError> {
        let (page, revisions, ids) = self.resolve(ids)?;
        let first_deleted = ids[0];

        let survivors: Vec<&Revision> = revisions
            .iter()
            .filter(|r| !ids.contains(&r.id()))
            .collect();
        let predecessor = survivors
            .iter()
            .rev()
            .find(|r| r.id() < first_deleted)
            .map(|r| r.id());
        let affected: Vec<&Revision> = survivors
            .iter()
            .copied()
            .filter(|r| r.id() > first_deleted)
            .collect();

        let relinked = relink(&affected, predecessor);
        let parent = match predecessor {
            Some(id) => required_parent_data(&*self.store, id)?,
            None => RevisionVerificationData::default(),
        };
        let entities = cascade::rederive(&*self.store, self.hashing, &relinked, parent)?;
        let latest = survivors.last().map(|r| r.id());

        for &id in &ids {
            self.store.delete_revision(id)?;
            self.store.delete_for_rev_id(id)?;
        }
        let rederived = self.write(relinked, entities)?;
        self.store.set_latest(&page, latest)?;

        info!(
            page = %page,
            removed = ?ids,
            rederived = rederived.len(),
            ?latest,
            "deleted revisions"
        );
        Ok(ManipulationReport {
            page,
            removed: ids,
            rederived,
            latest,
        })
    }

    /// Collapse a contiguous range into one revision.
    ///
    /// The replacement keeps the last id of the range and its slot content,
    /// and its record is rebuilt from scratch against the range's predecessor.
    /// Later revisions are re-derived on top of it.
    pub fn squash_revisions(
        &mut self,
        ids: &[RevisionId],
    ) -> Result<ManipulationReport, ChainError> {
        let (page, revisions, ids) = self.resolve(ids)?;

        let start = position(&revisions, ids[0])?;
        let end = position(&revisions, ids[ids.len() - 1])?;
        if end - start + 1 != ids.len() {
            return Err(ChainError::Validation(format!(
                "revisions {ids:?} are not contiguous on {page}"
            )));
        }

        let predecessor = start.checked_sub(1).map(|i| revisions[i].id());
        if let Some(id) = predecessor {
            // The builder would silently treat a missing record as genesis.
            required_parent_data(&*self.store, id)?;
        }
        let squashed = revisions[end].clone().with_parent(predecessor);
        let squashed_entity = {
            let builder =
                RevisionVerificationBuilder::new(&*self.store, &*self.store, self.hashing);
            builder.build_verification_data(&squashed)?
        };

        let later: Vec<&Revision> = revisions[end + 1..].iter().collect();
        let relinked = relink(&later, Some(squashed.id()));
        let entities = cascade::rederive(
            &*self.store,
            self.hashing,
            &relinked,
            squashed_entity.to_verification_data(),
        )?;
        let latest = revisions.last().map(Revision::id);

        for &id in &ids {
            if id != squashed.id() {
                self.store.delete_revision(id)?;
            }
            self.store.delete_for_rev_id(id)?;
        }
        self.store.put_revision(squashed.clone())?;
        self.store.upsert_verification_entity(squashed_entity)?;
        let mut rederived = vec![squashed.id()];
        rederived.extend(self.write(relinked, entities)?);
        self.store.set_latest(&page, latest)?;

        let removed: Vec<RevisionId> = ids.into_iter().filter(|&id| id != squashed.id()).collect();
        info!(page = %page, ?removed, into = squashed.id(), "squashed revisions");
        Ok(ManipulationReport {
            page,
            removed,
            rederived,
            latest,
        })
    }

    /// Sort and dedupe `ids` and check they all exist on one page.
    fn resolve(
        &self,
        ids: &[RevisionId],
    ) -> Result<(PageRef, Vec<Revision>, Vec<RevisionId>), ChainError> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        let Some(&first) = ids.first() else {
            return Err(ChainError::Validation("no revisions given".to_string()));
        };
        let page = self
            .store
            .revision(first)?
            .ok_or_else(|| ChainError::revision_not_found(first))?
            .page()
            .clone();
        let revisions = self.store.page_revisions(&page)?;
        for id in &ids {
            if !revisions.iter().any(|r| r.id() == *id) {
                return Err(ChainError::NotFound(format!("revision {id} on {page}")));
            }
        }
        Ok((page, revisions, ids))
    }

    fn write(
        &mut self,
        revisions: Vec<Revision>,
        entities: Vec<VerificationEntity>,
    ) -> Result<Vec<RevisionId>, ChainError> {
        let ids = revisions.iter().map(Revision::id).collect();
        for revision in revisions {
            self.store.put_revision(revision)?;
        }
        cascade::commit(&mut *self.store, entities)?;
        Ok(ids)
    }
}

/// Point each revision at the one before it, the first at `predecessor`.
fn relink(revisions: &[&Revision], predecessor: Option<RevisionId>) -> Vec<Revision> {
    let mut parent = predecessor;
    revisions
        .iter()
        .map(|r| {
            let linked = (*r).clone().with_parent(parent);
            parent = Some(r.id());
            linked
        })
        .collect()
}

fn position(revisions: &[Revision], id: RevisionId) -> Result<usize, ChainError> {
    revisions
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| ChainError::revision_not_found(id))
}
