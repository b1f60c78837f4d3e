use aqua_model::{PageRef, RevisionId, VerificationEntity};

/// Criteria for resolving verification entities.
///
/// Every field left as `None` matches anything; set fields must all match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationQuery {
    pub page: Option<PageRef>,
    pub rev_id: Option<RevisionId>,
    pub domain_id: Option<String>,
    pub content_hash: Option<String>,
    pub verification_hash: Option<String>,
    pub previous_verification_hash: Option<String>,
    pub genesis_hash: Option<String>,
}

impl VerificationQuery {
    pub fn for_page(page: &PageRef) -> Self {
        Self {
            page: Some(page.clone()),
            ..Self::default()
        }
    }

    pub fn by_verification_hash(hash: impl Into<String>) -> Self {
        Self {
            verification_hash: Some(hash.into()),
            ..Self::default()
        }
    }

    pub fn with_verification_hash(mut self, hash: impl Into<String>) -> Self {
        self.verification_hash = Some(hash.into());
        self
    }

    pub fn with_previous_verification_hash(mut self, hash: impl Into<String>) -> Self {
        self.previous_verification_hash = Some(hash.into());
        self
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    pub fn with_genesis_hash(mut self, hash: impl Into<String>) -> Self {
        self.genesis_hash = Some(hash.into());
        self
    }

    pub fn with_domain_id(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = Some(domain_id.into());
        self
    }

    pub fn matches(&self, entity: &VerificationEntity) -> bool {
        fn field(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().map_or(true, |e| e == actual)
        }

        self.page.as_ref().map_or(true, |p| p == entity.page())
            && self.rev_id.map_or(true, |r| r == entity.rev_id())
            && field(&self.domain_id, entity.domain_id())
            && field(&self.content_hash, entity.content_hash())
            && field(&self.verification_hash, entity.verification_hash())
            && field(
                &self.previous_verification_hash,
                entity.previous_verification_hash(),
            )
            && field(&self.genesis_hash, entity.genesis_hash())
    }
}
