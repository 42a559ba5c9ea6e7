//! Debounced, latest-wins search driver.
//!
//! Every call to [`DebouncedSearch::search`] takes a generation ticket
//! before it sleeps. A search only reaches the geocoder if no newer ticket
//! was issued during the delay, and its result is only delivered if no
//! newer ticket was issued while the request was in flight.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::types::{GeocodeError, GeocodeResult, Geocoder};

/// Quiet period before a query is sent.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// What a single [`DebouncedSearch::search`] call resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A newer search was started; this one's result (if any) is dropped.
    Superseded,
    /// This search is the latest; here is its result.
    Completed(Result<Vec<GeocodeResult>, GeocodeError>),
}

impl SearchOutcome {
    /// Best match, when the search completed successfully.
    #[must_use]
    pub fn best(&self) -> Option<&GeocodeResult> {
        match self {
            Self::Completed(Ok(results)) => results.first(),
            _ => None,
        }
    }
}

/// Debounced, latest-wins front end for a [`Geocoder`]. Clones share
/// one generation counter.
pub struct DebouncedSearch<G: ?Sized> {
    geocoder: Arc<G>,
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl<G: ?Sized> Clone for DebouncedSearch<G> {
    fn clone(&self) -> Self {
        Self {
            geocoder: Arc::clone(&self.geocoder),
            delay: self.delay,
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<G: Geocoder + ?Sized + 'static> DebouncedSearch<G> {
    /// Debounce with [`DEFAULT_DEBOUNCE`].
    #[must_use]
    pub fn new(geocoder: Arc<G>) -> Self {
        Self::with_delay(geocoder, DEFAULT_DEBOUNCE)
    }

    /// Debounce with a custom quiet period.
    #[must_use]
    pub fn with_delay(geocoder: Arc<G>, delay: Duration) -> Self {
        Self {
            geocoder,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Quiet period before a query is sent.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Start a search for `query`, superseding every earlier one.
    ///
    /// The ticket is taken when this is called, not when the returned
    /// future is first polled. An empty query still supersedes pending
    /// searches and completes with [`GeocodeError::EmptyQuery`] without a
    /// request.
    pub fn search(&self, query: &str) -> impl Future<Output = SearchOutcome> + Send + use<G> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let geocoder = Arc::clone(&self.geocoder);
        let delay = self.delay;
        let query = query.trim().to_string();

        async move {
            if query.is_empty() {
                return SearchOutcome::Completed(Err(GeocodeError::EmptyQuery));
            }

            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                log::trace!("search {query:?} superseded before sending");
                return SearchOutcome::Superseded;
            }

            let result = geocoder.forward(&query).await;
            if generation.load(Ordering::SeqCst) != ticket {
                log::debug!("dropping stale result for {query:?}");
                return SearchOutcome::Superseded;
            }
            SearchOutcome::Completed(result)
        }
    }

    /// Invalidate every pending search.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
