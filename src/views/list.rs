//! Fetch state of one list view.
//!
//! Each fetch is started with a `FetchTicket` carrying the view's generation
//! at that moment. Unmounting the view or starting a newer fetch bumps the
//! generation, and a response arriving with an older ticket is dropped.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// What a view currently renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot<T> {
    pub items: Vec<T>,
    pub loading: bool,
    /// Inline error of the last failed fetch; the previous items stay.
    pub error: Option<String>,
}

#[derive(Debug)]
struct ListState<T> {
    generation: u64,
    mounted: bool,
    items: Vec<T>,
    loading: bool,
    error: Option<String>,
}

#[derive(Debug)]
pub struct ListView<T> {
    name: &'static str,
    state: Mutex<ListState<T>>,
}

impl<T: Clone> ListView<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(ListState {
                generation: 0,
                mounted: false,
                items: Vec::new(),
                loading: false,
                error: None,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn state(&self) -> MutexGuard<'_, ListState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mount(&self) {
        self.state().mounted = true;
    }

    /// Detach the view; responses still in flight are discarded.
    pub fn unmount(&self) {
        let mut state = self.state();
        state.mounted = false;
        state.loading = false;
        state.generation += 1;
    }

    pub fn is_mounted(&self) -> bool {
        self.state().mounted
    }

    /// Start a fetch, superseding any fetch still in flight.
    pub fn begin(&self) -> FetchTicket {
        let mut state = self.state();
        state.generation += 1;
        state.loading = true;
        FetchTicket {
            generation: state.generation,
        }
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        let state = self.state();
        state.mounted && state.generation == ticket.generation
    }

    /// Apply a fetch result. Returns `false` when the ticket is stale and the
    /// result was dropped.
    pub fn complete(&self, ticket: FetchTicket, result: Result<Vec<T>, GatewayError>) -> bool {
        let mut state = self.state();
        if !state.mounted || state.generation != ticket.generation {
            tracing::debug!(view = %self.name, "discarding stale fetch response");
            return false;
        }

        state.loading = false;
        match result {
            Ok(items) => {
                state.items = items;
                state.error = None;
            }
            Err(e) => {
                tracing::error!(view = %self.name, error = %e, "failed to fetch list");
                state.error = Some(e.to_string());
            }
        }
        true
    }

    /// Apply a fetch result and return what that fetch loaded, current or
    /// not. A stale result leaves the view untouched.
    pub fn settle(
        &self,
        ticket: FetchTicket,
        result: Result<Vec<T>, GatewayError>,
    ) -> ListSnapshot<T> {
        let own = match &result {
            Ok(items) => ListSnapshot {
                items: items.clone(),
                loading: false,
                error: None,
            },
            Err(e) => ListSnapshot {
                items: self.state().items.clone(),
                loading: false,
                error: Some(e.to_string()),
            },
        };
        self.complete(ticket, result);
        own
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        let state = self.state();
        ListSnapshot {
            items: state.items.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }
}
