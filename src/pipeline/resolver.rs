//! Picks the collection a run works on.

use super::filter::{filter_entries, FilteredItems};
use super::models::{CollectionRef, SourceCandidate};
use super::PipelineError;
use crate::catalog_api::{ApiError, CatalogApi};
use tracing::{debug, info, warn};

/// The winning candidate together with its usable items.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub collection: CollectionRef,
    pub items: FilteredItems,
    /// Raw entries received for the winning collection, before filtering.
    pub entries_received: usize,
    /// Candidates attempted, including the winner.
    pub candidates_tried: usize,
}

pub struct SourceResolver<'a, A: CatalogApi + ?Sized> {
    api: &'a A,
    page_size: usize,
}

/// Why a single candidate did not produce a collection.
enum CandidateMiss {
    NoMatch,
    NoUsableItems(CollectionRef),
    Api(ApiError),
}

impl<'a, A: CatalogApi + ?Sized> SourceResolver<'a, A> {
    pub fn new(api: &'a A, page_size: usize) -> Self {
        Self { api, page_size }
    }

    /// Try candidates in order and return the first one with usable items.
    pub fn resolve(&self, candidates: &[SourceCandidate]) -> Result<ResolvedSource, PipelineError> {
        let mut attempted = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            attempted.push(candidate.to_string());

            match self.try_candidate(candidate) {
                Ok((collection, items, entries_received)) => {
                    info!(
                        "Resolved {} to collection {} ({:?}) with {} usable items",
                        candidate,
                        collection.id,
                        collection.name,
                        items.len()
                    );
                    return Ok(ResolvedSource {
                        collection,
                        items,
                        entries_received,
                        candidates_tried: attempted.len(),
                    });
                }
                Err(CandidateMiss::NoMatch) => {
                    debug!("Candidate {} matched no collection", candidate);
                }
                Err(CandidateMiss::NoUsableItems(collection)) => {
                    warn!(
                        "Collection {} for candidate {} has no usable items, trying next",
                        collection.id, candidate
                    );
                }
                Err(CandidateMiss::Api(e)) => {
                    warn!("Candidate {} failed: {}", candidate, e);
                }
            }
        }

        Err(PipelineError::SourceUnavailable { attempted })
    }

    fn try_candidate(
        &self,
        candidate: &SourceCandidate,
    ) -> Result<(CollectionRef, FilteredItems, usize), CandidateMiss> {
        let collection = match candidate {
            SourceCandidate::Collection(id) => {
                self.api.get_collection(id).map_err(CandidateMiss::Api)?
            }
            SourceCandidate::Search(query) => self
                .api
                .search_collection(query)
                .map_err(CandidateMiss::Api)?
                .ok_or(CandidateMiss::NoMatch)?,
        };

        let entries = self
            .api
            .collection_entries(&collection.id, self.page_size)
            .map_err(CandidateMiss::Api)?;
        let items = filter_entries(&entries);
        if items.is_empty() {
            return Err(CandidateMiss::NoUsableItems(collection));
        }

        Ok((collection, items, entries.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_api::{ApiErrorKind, MockCatalogApi, RawEntry, RawTrack};
    use mockall::predicate::eq;

    fn collection(id: &str) -> CollectionRef {
        CollectionRef {
            id: id.to_string(),
            name: format!("Playlist {}", id),
        }
    }

    fn entries(ids: &[&str]) -> Vec<RawEntry> {
        ids.iter()
            .map(|id| RawEntry {
                track: Some(RawTrack {
                    id: Some(id.to_string()),
                    name: format!("Track {}", id),
                    ..Default::default()
                }),
                is_local: false,
            })
            .collect()
    }

    #[test]
    fn test_first_candidate_wins() {
        let mut api = MockCatalogApi::new();
        api.expect_get_collection()
            .with(eq("pl-1"))
            .times(1)
            .returning(|id| Ok(collection(id)));
        api.expect_collection_entries()
            .with(eq("pl-1"), eq(80))
            .times(1)
            .returning(|_, _| Ok(entries(&["a", "b"])));
        api.expect_search_collection().never();

        let candidates = vec![
            SourceCandidate::Collection("pl-1".to_string()),
            SourceCandidate::Search("never tried".to_string()),
        ];
        let resolved = SourceResolver::new(&api, 80).resolve(&candidates).unwrap();

        assert_eq!(resolved.collection.id, "pl-1");
        assert_eq!(resolved.items.len(), 2);
        assert_eq!(resolved.entries_received, 2);
        assert_eq!(resolved.candidates_tried, 1);
    }

    #[test]
    fn test_falls_through_failed_and_empty_candidates() {
        let mut api = MockCatalogApi::new();
        api.expect_get_collection()
            .with(eq("missing"))
            .returning(|_| Err(ApiError::new(ApiErrorKind::NotFound, "no such playlist")));
        api.expect_search_collection()
            .with(eq("nothing"))
            .returning(|_| Ok(None));
        api.expect_search_collection()
            .with(eq("ibiza"))
            .returning(|_| Ok(Some(collection("pl-ibiza"))));
        api.expect_get_collection()
            .with(eq("pl-empty"))
            .returning(|id| Ok(collection(id)));
        api.expect_collection_entries()
            .with(eq("pl-empty"), eq(50))
            .returning(|_, _| Ok(vec![RawEntry::default()]));
        api.expect_collection_entries()
            .with(eq("pl-ibiza"), eq(50))
            .returning(|_, _| Ok(entries(&["x"])));

        let candidates: Vec<SourceCandidate> = ["missing", "search:nothing", "pl-empty", "search:ibiza"]
            .iter()
            .map(|c| c.parse().unwrap())
            .collect();
        let resolved = SourceResolver::new(&api, 50).resolve(&candidates).unwrap();

        assert_eq!(resolved.collection.id, "pl-ibiza");
        assert_eq!(resolved.candidates_tried, 4);
    }

    #[test]
    fn test_all_candidates_exhausted() {
        let mut api = MockCatalogApi::new();
        api.expect_get_collection()
            .returning(|_| Err(ApiError::new(ApiErrorKind::Connection, "offline")));

        let candidates = vec![
            SourceCandidate::Collection("a".to_string()),
            SourceCandidate::Collection("b".to_string()),
        ];
        let error = SourceResolver::new(&api, 80)
            .resolve(&candidates)
            .unwrap_err();

        match error {
            PipelineError::SourceUnavailable { attempted } => {
                assert_eq!(attempted, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
