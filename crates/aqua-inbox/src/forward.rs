use crate::error::InboxError;
use crate::tree::{ChangeType, NodeSource, TreeBuilder};
use aqua_chain::{export_page, import_export, ChainStore};
use aqua_model::{PageRef, RevisionId};
use aqua_store::WitnessEventStore;
use tracing::info;

/// Outcome of [`fast_forward`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastForward {
    /// `(remote id, new local id)` pairs in chain order.
    pub imported: Vec<(RevisionId, RevisionId)>,
    pub latest: Option<RevisionId>,
}

/// Append the remote tail to `local` when only the remote side moved on.
///
/// The tail is exported and re-imported, so every appended revision
/// reproduces its remote verification hash. Histories that branched on the
/// local side are left alone and reported as [`InboxError::Diverged`].
pub fn fast_forward<S>(
    store: &mut S,
    remote: &PageRef,
    local: &PageRef,
) -> Result<FastForward, InboxError>
where
    S: ChainStore + WitnessEventStore + ?Sized,
{
    let tree = TreeBuilder::new(&*store).build_pre_import_tree(remote, local)?;
    match tree.change_type {
        None => {
            return Ok(FastForward {
                imported: Vec::new(),
                latest: store.latest_revision_id(local)?,
            })
        }
        Some(ChangeType::Remote) => {}
        Some(other) => return Err(InboxError::Diverged(other)),
    }

    let tail: Vec<RevisionId> = tree
        .divergent(NodeSource::Remote)
        .filter_map(|node| node.revisions.first().copied())
        .collect();
    let (Some(&from), Some(&to)) = (tail.first(), tail.last()) else {
        return Err(InboxError::Diverged(ChangeType::Remote));
    };
    let domain_id = store
        .verification_entity_from_rev_id(from)?
        .map(|entity| entity.domain_id().to_string())
        .unwrap_or_default();

    let file = export_page(&*store, remote, Some((from, to)), &domain_id)?;
    let imported: Vec<(RevisionId, RevisionId)> = import_export(store, &file, Some(local))?
        .into_iter()
        .flat_map(|report| report.imported)
        .collect();
    info!(%remote, %local, imported = imported.len(), "fast-forwarded");
    Ok(FastForward {
        imported,
        latest: store.latest_revision_id(local)?,
    })
}
