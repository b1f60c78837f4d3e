//! Export and import of verified page histories.
//!
//! The export file is a JSON object with a `site_info` header and one entry
//! per page listing its revisions oldest first. Each revision carries its slot
//! content, every stored hash, its signature and the witness data of its own
//! witness event, which is everything needed to recompute the chain on the
//! importing side.

use crate::builder::compute_entity;
use crate::error::ChainError;
use crate::signing::verify_entity_signature;
use crate::ChainStore;
use aqua_hash::{is_digest, timestamp_string, HashingService, TIMESTAMP_FORMAT};
use aqua_model::{
    PageRef, Revision, RevisionId, RevisionVerificationData, SignatureMaterial, Slot, SlotRole,
    SourceTag, VerificationEntity, WitnessData,
};
use aqua_store::WitnessEventStore;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

const GENERATOR: &str = concat!("aqua-chain ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub site_info: SiteInfo,
    pub pages: Vec<ExportedPage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub domain_id: String,
    pub generator: String,
    pub exported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedPage {
    pub title: String,
    pub namespace: i32,
    /// Record of the revision just before the exported range, when the range
    /// does not start at genesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ExportedParent>,
    pub revisions: Vec<ExportedRevision>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedParent {
    pub verification_hash: String,
    #[serde(default)]
    pub genesis_hash: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub witness: Option<WitnessData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedRevision {
    pub content: ExportedContent,
    pub metadata: ExportedMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<ExportedSignature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<WitnessData>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedContent {
    pub rev_id: RevisionId,
    pub content: BTreeMap<SlotRole, Slot>,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedMetadata {
    pub domain_id: String,
    pub time_stamp: String,
    pub previous_verification_hash: String,
    pub metadata_hash: String,
    pub verification_hash: String,
    #[serde(default)]
    pub genesis_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedSignature {
    pub signature: String,
    pub public_key: String,
    pub wallet_address: String,
    pub signature_hash: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub page: PageRef,
    /// `(exported id, local id)` pairs in chain order.
    pub imported: Vec<(RevisionId, RevisionId)>,
    pub latest: Option<RevisionId>,
}

/// Export the revisions of `page`, optionally limited to an inclusive id range.
pub fn export_page<S: ChainStore + ?Sized>(
    store: &S,
    page: &PageRef,
    range: Option<(RevisionId, RevisionId)>,
    domain_id: &str,
) -> Result<ExportFile, ChainError> {
    let all = store.page_revisions(page)?;
    if all.is_empty() {
        return Err(ChainError::NotFound(format!("page {page}")));
    }
    let in_range = |id: RevisionId| range.map_or(true, |(from, to)| from <= id && id <= to);

    let mut parent = None;
    let mut revisions = Vec::new();
    for revision in &all {
        let entity = store
            .verification_entity_from_rev_id(revision.id())?
            .ok_or_else(|| ChainError::Inconsistent {
                rev_id: revision.id(),
                reason: "revision has no verification record".to_string(),
            })?;
        if !in_range(revision.id()) {
            if revisions.is_empty() {
                parent = Some(entity);
            }
            continue;
        }
        revisions.push(export_revision(store, revision, &entity)?);
    }
    if revisions.is_empty() {
        return Err(ChainError::NotFound(format!(
            "revisions in range {range:?} on {page}"
        )));
    }

    let parent = match parent {
        Some(entity) => Some(ExportedParent {
            verification_hash: entity.verification_hash().to_string(),
            genesis_hash: entity.genesis_hash().to_string(),
            signature: entity.signature().to_string(),
            public_key: entity.public_key().to_string(),
            witness: own_witness(store, &entity)?,
        }),
        None => None,
    };

    Ok(ExportFile {
        site_info: SiteInfo {
            domain_id: domain_id.to_string(),
            generator: GENERATOR.to_string(),
            exported_at: Utc::now(),
        },
        pages: vec![ExportedPage {
            title: page.prefixed_dbkey(),
            namespace: page.namespace,
            parent,
            revisions,
        }],
    })
}

fn own_witness<S: ChainStore + ?Sized>(
    store: &S,
    entity: &VerificationEntity,
) -> Result<Option<WitnessData>, ChainError> {
    match entity.witness_event_id() {
        Some(id) => Ok(store.get_witness_data(id)?),
        None => Ok(None),
    }
}

fn export_revision<S: ChainStore + ?Sized>(
    store: &S,
    revision: &Revision,
    entity: &VerificationEntity,
) -> Result<ExportedRevision, ChainError> {
    let signature = entity.is_signed().then(|| ExportedSignature {
        signature: entity.signature().to_string(),
        public_key: entity.public_key().to_string(),
        wallet_address: entity.wallet_address().to_string(),
        signature_hash: entity.signature_hash().to_string(),
    });
    Ok(ExportedRevision {
        content: ExportedContent {
            rev_id: revision.id(),
            content: revision.slots().clone(),
            content_hash: entity.content_hash().to_string(),
        },
        metadata: ExportedMetadata {
            domain_id: entity.domain_id().to_string(),
            time_stamp: timestamp_string(revision.timestamp()),
            previous_verification_hash: entity.previous_verification_hash().to_string(),
            metadata_hash: entity.metadata_hash().to_string(),
            verification_hash: entity.verification_hash().to_string(),
            genesis_hash: entity.genesis_hash().to_string(),
        },
        signature,
        witness: own_witness(store, entity)?,
        context: entity.verification_context().clone(),
    })
}

/// Parse an export file, rejecting payloads with missing or malformed fields.
pub fn parse_export(json: &str) -> Result<ExportFile, ChainError> {
    let file: ExportFile = serde_json::from_str(json)
        .map_err(|e| ChainError::Validation(format!("malformed export file: {e}")))?;
    validate(&file)?;
    Ok(file)
}

fn validate(file: &ExportFile) -> Result<(), ChainError> {
    if file.pages.is_empty() {
        return Err(ChainError::Validation("export contains no pages".to_string()));
    }
    for page in &file.pages {
        PageRef::parse(&page.title)
            .map_err(|e| ChainError::Validation(format!("page title {:?}: {e}", page.title)))?;
        if page.revisions.is_empty() {
            return Err(ChainError::Validation(format!(
                "page {} has no revisions",
                page.title
            )));
        }
        for revision in &page.revisions {
            let rev_id = revision.content.rev_id;
            let invalid = |what: &str| {
                ChainError::Validation(format!("revision {rev_id} of {}: {what}", page.title))
            };
            if revision.content.content.is_empty() {
                return Err(invalid("no slot content"));
            }
            parse_timestamp(&revision.metadata.time_stamp)
                .ok_or_else(|| invalid("time_stamp is not YYYYMMDDHHMMSS"))?;
            let metadata = &revision.metadata;
            for (name, value) in [
                ("content_hash", revision.content.content_hash.as_str()),
                ("metadata_hash", metadata.metadata_hash.as_str()),
                ("verification_hash", metadata.verification_hash.as_str()),
            ] {
                if !is_digest(value) {
                    return Err(invalid(&format!("{name} is not a digest")));
                }
            }
            if metadata.domain_id.is_empty() {
                return Err(invalid("domain_id is empty"));
            }
        }
    }
    Ok(())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Import every page of `file`, into `target` when given or else under the
/// exported titles.
///
/// Each exported chain must either start a new page at genesis or extend the
/// target page's current tip. Every hash of every page is recomputed and
/// compared before anything is written; imported records keep their original
/// domain id, signatures and timestamps, so the local chains reproduce the
/// exported hashes exactly.
pub fn import_export<S>(
    store: &mut S,
    file: &ExportFile,
    target: Option<&PageRef>,
) -> Result<Vec<ImportReport>, ChainError>
where
    S: ChainStore + WitnessEventStore + ?Sized,
{
    validate(file)?;
    if target.is_some() && file.pages.len() > 1 {
        return Err(ChainError::Validation(format!(
            "export holds {} pages; a target title needs exactly one",
            file.pages.len()
        )));
    }

    let mut plans: Vec<PagePlan> = Vec::with_capacity(file.pages.len());
    for exported in &file.pages {
        let page = match target {
            Some(page) => page.clone(),
            None => PageRef::parse(&exported.title)
                .map_err(|e| ChainError::Validation(format!("page title: {e}")))?,
        };
        if plans.iter().any(|plan| plan.page == page) {
            return Err(ChainError::Validation(format!(
                "export lists {page} more than once"
            )));
        }
        plans.push(plan_page(&*store, exported, page)?);
    }

    let mut reports = Vec::with_capacity(plans.len());
    for plan in plans {
        let report = commit_page(store, plan)?;
        info!(page = %report.page, revisions = report.imported.len(), "imported revisions");
        reports.push(report);
    }
    Ok(reports)
}

/// Recomputed records of one exported page, ready to be written.
struct PagePlan {
    page: PageRef,
    revisions: Vec<(RevisionId, Revision, VerificationEntity, Option<WitnessData>)>,
}

fn plan_page<S>(store: &S, exported: &ExportedPage, page: PageRef) -> Result<PagePlan, ChainError>
where
    S: ChainStore + WitnessEventStore + ?Sized,
{
    let first_previous = &exported.revisions[0].metadata.previous_verification_hash;
    let local_tip = store.verification_entity_from_title(&page)?;
    let (mut parent, mut parent_witness) = match (&local_tip, &exported.parent) {
        (Some(tip), exported_parent) => {
            let parent_hash = exported_parent
                .as_ref()
                .map_or(first_previous, |p| &p.verification_hash);
            if tip.verification_hash() != first_previous || tip.verification_hash() != parent_hash
            {
                return Err(ChainError::Validation(format!(
                    "export does not extend the tip of {page}"
                )));
            }
            let witness = match tip.witness_event_id() {
                Some(id) => store.get_witness_data(id)?,
                None => None,
            };
            (tip.to_verification_data(), witness)
        }
        (None, Some(_)) => {
            return Err(ChainError::Validation(format!(
                "export of {page} starts after genesis and {page} has no revisions here"
            )))
        }
        (None, None) => (RevisionVerificationData::default(), None),
    };

    let mut revisions = Vec::with_capacity(exported.revisions.len());
    for exported_revision in &exported.revisions {
        let rev_id = exported_revision.content.rev_id;
        let metadata = &exported_revision.metadata;
        let timestamp = parse_timestamp(&metadata.time_stamp).ok_or_else(|| {
            ChainError::Validation(format!("revision {rev_id}: bad time_stamp"))
        })?;
        let revision = Revision::new(
            0,
            page.clone(),
            None,
            timestamp,
            exported_revision.content.content.clone(),
        );
        let hashing = HashingService::new(&metadata.domain_id);
        let computed = compute_entity(&hashing, &revision, &parent, parent_witness.as_ref());

        let checks = [
            (
                "content_hash",
                &exported_revision.content.content_hash,
                computed.content_hash(),
            ),
            (
                "previous_verification_hash",
                &metadata.previous_verification_hash,
                computed.previous_verification_hash(),
            ),
            ("metadata_hash", &metadata.metadata_hash, computed.metadata_hash()),
            (
                "verification_hash",
                &metadata.verification_hash,
                computed.verification_hash(),
            ),
        ];
        for (field, exported_hash, computed_hash) in checks {
            if exported_hash != computed_hash {
                warn!(rev_id, field, "imported hash does not recompute");
                return Err(ChainError::Inconsistent {
                    rev_id,
                    reason: format!("{field} does not match its recomputed value"),
                });
            }
        }

        let signature = exported_revision
            .signature
            .as_ref()
            .map(|s| SignatureMaterial {
                signature: s.signature.clone(),
                public_key: s.public_key.clone(),
                wallet_address: s.wallet_address.clone(),
            })
            .unwrap_or_default();
        let entity = computed
            .with_signature(signature)
            .with_context(exported_revision.context.clone())
            .with_source(SourceTag::Import);
        if entity.is_signed() && !verify_entity_signature(&entity) {
            return Err(ChainError::Inconsistent {
                rev_id,
                reason: "signature does not verify".to_string(),
            });
        }

        parent = entity.to_verification_data();
        parent_witness = exported_revision.witness.clone();
        revisions.push((rev_id, revision, entity, exported_revision.witness.clone()));
    }
    Ok(PagePlan { page, revisions })
}

fn commit_page<S>(store: &mut S, plan: PagePlan) -> Result<ImportReport, ChainError>
where
    S: ChainStore + WitnessEventStore + ?Sized,
{
    let mut parent_id = store.latest_revision_id(&plan.page)?;
    let mut imported = Vec::with_capacity(plan.revisions.len());
    for (exported_id, revision, entity, witness) in plan.revisions {
        let witness_event_id = match witness {
            Some(data) => Some(store.store_witness_event(data)?),
            None => None,
        };
        let local_id = store.allocate_revision_id()?;
        store.put_revision(revision.with_id(local_id).with_parent(parent_id))?;
        store.upsert_verification_entity(
            entity
                .with_rev_id(local_id)
                .with_witness_event(witness_event_id),
        )?;
        parent_id = Some(local_id);
        imported.push((exported_id, local_id));
    }
    store.set_latest(&plan.page, parent_id)?;
    Ok(ImportReport {
        page: plan.page,
        imported,
        latest: parent_id,
    })
}
