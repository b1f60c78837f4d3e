use crate::error::TransclusionError;
use aqua_model::{PageRef, Slot, TransclusionHashes, TransclusionRecord};
use aqua_store::VerificationLookup;
use aqua_wikitext::{RenderOutput, Renderer, WikitextRenderer};
use std::collections::HashSet;
use tracing::debug;

/// Collects the transclusion records of one page.
///
/// The records are computed on the first call to
/// [`get_hashmap`](Self::get_hashmap) and reused afterwards.
pub struct TransclusionHashExtractor<'a, L: ?Sized> {
    page_text: String,
    title: PageRef,
    render_output: Option<RenderOutput>,
    lookup: &'a L,
    hashmap: Option<Vec<TransclusionRecord>>,
}

impl<'a, L: VerificationLookup + ?Sized> TransclusionHashExtractor<'a, L> {
    /// Without `render_output` the page text is scanned with
    /// [`WikitextRenderer`].
    pub fn new(
        page_text: impl Into<String>,
        title: PageRef,
        render_output: Option<RenderOutput>,
        lookup: &'a L,
    ) -> Self {
        Self {
            page_text: page_text.into(),
            title,
            render_output,
            lookup,
            hashmap: None,
        }
    }

    /// Records for every distinct resource the page references.
    ///
    /// Files come first, then templates, then links, each in render order.
    /// The page itself is skipped and a resource referenced twice keeps its
    /// first position. Resources that do not exist get a `None` hash.
    pub fn get_hashmap(&mut self) -> Result<&[TransclusionRecord], TransclusionError> {
        if self.hashmap.is_none() {
            let records = self.compute()?;
            self.hashmap = Some(records);
        }
        Ok(self.hashmap.as_deref().unwrap_or_default())
    }

    /// The records wrapped as slot content.
    pub fn to_slot(&mut self) -> Result<Slot, TransclusionError> {
        let records = self.get_hashmap()?.to_vec();
        Ok(Slot::TransclusionHashes(TransclusionHashes(records)))
    }

    fn compute(&self) -> Result<Vec<TransclusionRecord>, TransclusionError> {
        let scanned;
        let output = match &self.render_output {
            Some(output) => output,
            None => {
                scanned = WikitextRenderer.render(&self.page_text, &self.title);
                &scanned
            }
        };

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let referenced = output
            .files
            .iter()
            .chain(&output.templates)
            .chain(&output.links);
        for page in referenced {
            if *page == self.title || !seen.insert(page.prefixed_dbkey()) {
                continue;
            }
            let hash = self
                .lookup
                .verification_entity_from_title(page)?
                .map(|entity| entity.verification_hash().to_string());
            records.push(TransclusionRecord::new(page, hash));
        }
        debug!(page = %self.title, resources = records.len(), "extracted transclusions");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqua_chain::save_revision;
    use aqua_hash::HashingService;
    use aqua_model::{RevisionId, SlotRole, VerificationEntity};
    use aqua_store::{InMemoryStore, StoreError, VerificationQuery};
    use chrono::Utc;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    fn page(title: &str) -> PageRef {
        PageRef::parse(title).unwrap()
    }

    fn save(store: &mut InMemoryStore, title: &str, text: &str) -> String {
        let hashing = HashingService::new("a1b2c3d4e5");
        let slots = BTreeMap::from([(SlotRole::Main, Slot::text(text))]);
        save_revision(store, &hashing, &page(title), slots, Utc::now())
            .unwrap()
            .verification_hash()
            .to_string()
    }

    struct CountingLookup<'a> {
        inner: &'a InMemoryStore,
        title_lookups: Cell<usize>,
    }

    impl VerificationLookup for CountingLookup<'_> {
        fn verification_entity_from_rev_id(
            &self,
            rev_id: RevisionId,
        ) -> Result<Option<VerificationEntity>, StoreError> {
            self.inner.verification_entity_from_rev_id(rev_id)
        }

        fn all_verification_entities_from_query(
            &self,
            query: &VerificationQuery,
        ) -> Result<Vec<VerificationEntity>, StoreError> {
            self.inner.all_verification_entities_from_query(query)
        }

        fn get_all_revision_ids(&self, page: &PageRef) -> Result<Vec<RevisionId>, StoreError> {
            self.inner.get_all_revision_ids(page)
        }

        fn delete_for_rev_id(&mut self, _rev_id: RevisionId) -> Result<bool, StoreError> {
            Ok(false)
        }

        fn verification_entity_from_title(
            &self,
            page: &PageRef,
        ) -> Result<Option<VerificationEntity>, StoreError> {
            self.title_lookups.set(self.title_lookups.get() + 1);
            self.inner.verification_entity_from_title(page)
        }
    }

    #[test]
    fn test_orders_files_templates_links() {
        let mut store = InMemoryStore::new();
        let logo = save(&mut store, "File:Logo.png", "png bytes");
        let nav = save(&mut store, "Template:Nav", "nav");

        let text = "[[Intro]] {{Nav}} [[File:Logo.png]] [[Missing]]";
        let mut extractor = TransclusionHashExtractor::new(text, page("Host"), None, &store);
        let records = extractor.get_hashmap().unwrap();

        let titles: Vec<_> = records.iter().map(|r| r.page().prefixed_dbkey()).collect();
        assert_eq!(titles, vec!["File:Logo.png", "Template:Nav", "Intro", "Missing"]);
        assert_eq!(records[0].verification_hash.as_deref(), Some(logo.as_str()));
        assert_eq!(records[1].verification_hash.as_deref(), Some(nav.as_str()));
        assert_eq!(records[2].verification_hash, None);
        assert_eq!(records[3].verification_hash, None);
    }

    #[test]
    fn test_excludes_self_and_duplicates() {
        let store = InMemoryStore::new();
        let text = "[[Host]] [[Other|one]] [[other]] {{Nav}} {{Template:Nav}}";
        let mut extractor = TransclusionHashExtractor::new(text, page("Host"), None, &store);
        let titles: Vec<_> = extractor
            .get_hashmap()
            .unwrap()
            .iter()
            .map(|r| r.page().prefixed_dbkey())
            .collect();
        assert_eq!(titles, vec!["Template:Nav", "Other"]);
    }

    #[test]
    fn test_uses_supplied_render_output() {
        let store = InMemoryStore::new();
        let output = RenderOutput {
            files: vec![],
            templates: vec![page("Template:Given")],
            links: vec![],
        };
        let mut extractor =
            TransclusionHashExtractor::new("[[Ignored]]", page("Host"), Some(output), &store);
        let records = extractor.get_hashmap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].page(), page("Template:Given"));
    }

    #[test]
    fn test_hashmap_is_cached() {
        let store = InMemoryStore::new();
        let lookup = CountingLookup {
            inner: &store,
            title_lookups: Cell::new(0),
        };
        let mut extractor =
            TransclusionHashExtractor::new("[[A]] [[B]]", page("Host"), None, &lookup);
        extractor.get_hashmap().unwrap();
        extractor.get_hashmap().unwrap();
        let slot = extractor.to_slot().unwrap();
        assert_eq!(lookup.title_lookups.get(), 2);
        assert_eq!(slot.as_transclusions().map(|t| t.records().len()), Some(2));
    }
}
