//! Superseded-request guard.
//!
//! A dashboard that changes specialist or filters while a report is in
//! flight must not merge the stale result into the new view. The caller
//! owns one guard per view; each request takes a ticket, and only the
//! ticket of the latest request is accepted.

use crate::filter::ReportFilter;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTicket {
    pub request_id: Uuid,
    pub signature:  String,
    generation:     u64,
}

/// Generation and signature of the latest request. Updated together so a
/// ticket never sees one without the other.
#[derive(Debug, Default)]
struct Latest {
    generation: u64,
    signature:  Option<String>,
}

#[derive(Debug, Default)]
pub struct RequestGuard {
    latest: Mutex<Latest>,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn latest(&self) -> MutexGuard<'_, Latest> {
        // The guarded state is two plain fields; a poisoned lock still holds
        // a consistent pair.
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a request. Any ticket issued earlier is superseded.
    pub fn begin(&self, filter: &ReportFilter) -> RequestTicket {
        let signature = filter.signature();
        let generation = {
            let mut latest = self.latest();
            latest.generation += 1;
            latest.signature = Some(signature.clone());
            latest.generation
        };
        let ticket = RequestTicket {
            request_id: Uuid::new_v4(),
            signature,
            generation,
        };
        log::debug!("guard: request {} began (generation {generation})", ticket.request_id);
        ticket
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        let latest = self.latest();
        latest.generation == ticket.generation
            && latest.signature.as_deref() == Some(ticket.signature.as_str())
    }

    /// Keep `value` only if `ticket` still belongs to the latest request.
    pub fn accept<T>(&self, ticket: &RequestTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            log::info!("guard: discarding superseded request {}", ticket.request_id);
            None
        }
    }
}
