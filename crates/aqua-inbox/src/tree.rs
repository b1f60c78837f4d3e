use crate::error::InboxError;
use aqua_model::{PageRef, RevisionId, VerificationEntity};
use aqua_store::{VerificationLookup, VerificationQuery};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeSource {
    Local,
    Remote,
}

/// Which side has revisions the other lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Local,
    Remote,
    Both,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Local => write!(f, "local"),
            ChangeType::Remote => write!(f, "remote"),
            ChangeType::Both => write!(f, "both"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub verification_hash: String,
    /// Local id first for shared nodes, then the remote id.
    pub revisions: Vec<RevisionId>,
    /// Set when only one side has this revision.
    pub diff: bool,
    pub source: NodeSource,
    /// Key of the preceding node on the same side.
    pub parent: Option<String>,
}

/// Shared prefix, then the local tail, then the remote tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeTree {
    pub nodes: Vec<TreeNode>,
    pub change_type: Option<ChangeType>,
}

impl MergeTree {
    pub fn node(&self, verification_hash: &str) -> Option<&TreeNode> {
        self.nodes
            .iter()
            .find(|n| n.verification_hash == verification_hash)
    }

    pub fn shared(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter(|n| !n.diff)
    }

    pub fn divergent(&self, source: NodeSource) -> impl Iterator<Item = &TreeNode> {
        self.nodes
            .iter()
            .filter(move |n| n.diff && n.source == source)
    }
}

/// Lines up two pages' chains position by position.
pub struct TreeBuilder<'a, L: ?Sized> {
    lookup: &'a L,
}

impl<'a, L: VerificationLookup + ?Sized> TreeBuilder<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Compare the chain of `remote` with the chain of `local`.
    ///
    /// Entries at the same position with the same verification hash are
    /// shared history. From the first mismatch on, each side's remaining
    /// entries become divergent nodes chained by `parent`.
    pub fn build_pre_import_tree(
        &self,
        remote: &PageRef,
        local: &PageRef,
    ) -> Result<MergeTree, InboxError> {
        let remote_chain = self.chain(remote)?;
        let local_chain = self.chain(local)?;

        let shared_len = local_chain
            .iter()
            .zip(&remote_chain)
            .take_while(|(l, r)| l.verification_hash() == r.verification_hash())
            .count();

        let mut nodes = Vec::with_capacity(local_chain.len() + remote_chain.len() - shared_len);
        let mut last_shared: Option<String> = None;
        for (l, r) in local_chain.iter().zip(&remote_chain).take(shared_len) {
            let hash = l.verification_hash().to_string();
            nodes.push(TreeNode {
                verification_hash: hash.clone(),
                revisions: vec![l.rev_id(), r.rev_id()],
                diff: false,
                source: NodeSource::Local,
                parent: last_shared.replace(hash),
            });
        }

        let local_tail =
            divergent_nodes(&local_chain[shared_len..], NodeSource::Local, &last_shared);
        let remote_tail =
            divergent_nodes(&remote_chain[shared_len..], NodeSource::Remote, &last_shared);
        let change_type = match (local_tail.is_empty(), remote_tail.is_empty()) {
            (true, true) => None,
            (false, true) => Some(ChangeType::Local),
            (true, false) => Some(ChangeType::Remote),
            (false, false) => Some(ChangeType::Both),
        };
        nodes.extend(local_tail);
        nodes.extend(remote_tail);

        debug!(
            %remote,
            %local,
            shared = shared_len,
            change_type = ?change_type,
            "built pre-import tree"
        );
        Ok(MergeTree { nodes, change_type })
    }

    fn chain(&self, page: &PageRef) -> Result<Vec<VerificationEntity>, InboxError> {
        Ok(self
            .lookup
            .all_verification_entities_from_query(&VerificationQuery::for_page(page))?)
    }
}

fn divergent_nodes(
    tail: &[VerificationEntity],
    source: NodeSource,
    fork: &Option<String>,
) -> Vec<TreeNode> {
    let mut parent = fork.clone();
    tail.iter()
        .map(|entity| {
            let hash = entity.verification_hash().to_string();
            TreeNode {
                verification_hash: hash.clone(),
                revisions: vec![entity.rev_id()],
                diff: true,
                source,
                parent: parent.replace(hash),
            }
        })
        .collect()
}
