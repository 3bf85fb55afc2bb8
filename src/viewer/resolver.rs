//! Destination resolver
//!
//! Maps page references to 1-based page numbers. Results are cached for the
//! lifetime of the document session, which never changes once opened, so
//! entries are never invalidated. Concurrent lookups of the same reference
//! share a single engine call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use tokio::sync::OnceCell;

use crate::engine::{Destination, DestinationItem, DocumentSession, EngineError, PageRef};

pub struct DestinationResolver {
    session: Arc<dyn DocumentSession>,
    cache: Mutex<HashMap<PageRef, Arc<OnceCell<u32>>>>,
}

impl DestinationResolver {
    #[must_use]
    pub fn new(session: Arc<dyn DocumentSession>) -> Self {
        Self {
            session,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 1-based page number `reference` points to
    pub async fn resolve(&self, reference: PageRef) -> Result<u32, EngineError> {
        let cell = self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(reference)
            .or_default()
            .clone();

        let page = cell
            .get_or_try_init(|| async {
                debug!("Resolving page reference {reference}");
                self.session.page_index(reference).await.map(|index| index + 1)
            })
            .await?;
        Ok(*page)
    }

    /// Cached page number for `reference`, without querying the engine
    #[must_use]
    pub fn cached(&self, reference: PageRef) -> Option<u32> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&reference)
            .and_then(|cell| cell.get().copied())
    }

    /// Page number of a link destination.
    ///
    /// Returns `Ok(None)` for destinations that cannot be followed: a named
    /// destination the document does not know, an array that does not start
    /// with a page reference, or a reference to something that is not a page.
    pub async fn resolve_destination(
        &self,
        destination: &Destination,
    ) -> Result<Option<u32>, EngineError> {
        let items = match destination {
            Destination::Explicit(items) => items.clone(),
            Destination::Named(name) => match self.session.destination(name).await? {
                Some(items) => items,
                None => {
                    debug!("Named destination {name:?} not found");
                    return Ok(None);
                }
            },
        };

        let Some(DestinationItem::Ref(reference)) = items.first() else {
            debug!("Destination does not start with a page reference");
            return Ok(None);
        };

        match self.resolve(*reference).await {
            Ok(page) => Ok(Some(page)),
            Err(EngineError::InvalidReference(reference)) => {
                debug!("Reference {reference} is not a page");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RenderingEngine;
    use crate::test_utils::CountingEngine;

    async fn resolver(engine: &CountingEngine) -> DestinationResolver {
        DestinationResolver::new(engine.open(CountingEngine::SOURCE).await.unwrap())
    }

    #[tokio::test]
    async fn second_lookup_is_a_cache_hit() {
        let engine = CountingEngine::with_pages(5);
        let resolver = resolver(&engine).await;

        assert_eq!(resolver.resolve(PageRef::new(3, 0)).await.unwrap(), 3);
        assert_eq!(resolver.resolve(PageRef::new(3, 0)).await.unwrap(), 3);
        assert_eq!(engine.counters().page_index_calls(), 1);
        assert_eq!(resolver.cached(PageRef::new(3, 0)), Some(3));
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_lookup() {
        let engine = CountingEngine::with_pages(5);
        let resolver = resolver(&engine).await;

        let (a, b) = tokio::join!(
            resolver.resolve(PageRef::new(4, 0)),
            resolver.resolve(PageRef::new(4, 0))
        );
        assert_eq!((a.unwrap(), b.unwrap()), (4, 4));
        assert_eq!(engine.counters().page_index_calls(), 1);
    }

    #[tokio::test]
    async fn generation_is_part_of_the_key() {
        let engine = CountingEngine::with_pages(5);
        let resolver = resolver(&engine).await;

        assert_eq!(resolver.resolve(PageRef::new(2, 0)).await.unwrap(), 2);
        assert!(resolver.resolve(PageRef::new(2, 1)).await.is_err());
        assert_eq!(resolver.cached(PageRef::new(2, 1)), None);
    }

    #[tokio::test]
    async fn malformed_destinations_resolve_to_nothing() {
        let engine = CountingEngine::with_pages(5);
        let resolver = resolver(&engine).await;

        let not_a_ref = Destination::Explicit(vec![DestinationItem::Number(3.0)]);
        let empty = Destination::Explicit(vec![]);
        let unknown_name = Destination::Named("nowhere".to_string());
        let dangling = Destination::Explicit(vec![DestinationItem::Ref(PageRef::new(99, 0))]);

        for destination in [not_a_ref, empty, unknown_name, dangling] {
            assert_eq!(resolver.resolve_destination(&destination).await, Ok(None));
        }
    }

    #[tokio::test]
    async fn named_destination_goes_through_the_name_lookup() {
        let engine = CountingEngine::with_pages(5).with_destination("end", PageRef::new(5, 0));
        let resolver = resolver(&engine).await;

        let page = resolver
            .resolve_destination(&Destination::Named("end".to_string()))
            .await;
        assert_eq!(page, Ok(Some(5)));
    }
}
