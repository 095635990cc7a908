//! Lifetime visit aggregation.
//!
//! One [`VisitorRecord`] per IP, holding the full history of closed
//! visits plus an optional mirror of the still-open one.  Records are
//! only ever created or extended here; the single deletion path is the
//! explicit admin [`VisitorLog::forget`].
//!
//! Only visits that touched an index page count as "real": asset-probing
//! bots and partial page loads that never reach the homepage are not
//! recorded.  This is a product policy, not a technical constraint, and
//! is preserved exactly (including for admin views downstream).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::JsonDocument;
use crate::error::StoreError;
use crate::presence::ActiveVisit;
use crate::{UNKNOWN_LOCATION, clip_user_agent, location_improves};

/// A closed visit.  Append-only once inside `VisitorRecord::visits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitSession {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub duration_seconds: i64,
    pub pages: BTreeSet<String>,
    pub location: String,
    pub user_agent: String,
}

impl Default for VisitSession {
    fn default() -> Self {
        Self {
            first_seen: DateTime::<Utc>::default(),
            last_seen: DateTime::<Utc>::default(),
            duration_seconds: 0,
            pages: BTreeSet::new(),
            location: UNKNOWN_LOCATION.to_owned(),
            user_agent: String::new(),
        }
    }
}

impl VisitSession {
    fn from_active(visit: &ActiveVisit) -> Self {
        Self {
            first_seen: visit.first_seen,
            last_seen: visit.last_seen,
            duration_seconds: visit.duration_seconds(),
            pages: visit.pages.clone(),
            location: visit.location.clone(),
            user_agent: visit.user_agent.clone(),
        }
    }
}

/// Lifetime record for one IP.
///
/// Invariants: `visits` is never reordered or mutated after append;
/// `total_duration_seconds` only grows; `visit_count` is always
/// `visits.len() + 1` while a visit is in progress, `visits.len()`
/// otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorRecord {
    pub ip: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub location: String,
    pub user_agent: String,
    pub pages: BTreeSet<String>,
    pub visits: Vec<VisitSession>,
    pub visit_count: usize,
    pub total_duration_seconds: i64,
    pub current_visit: Option<VisitSession>,
    pub visited_index: bool,
}

impl Default for VisitorRecord {
    fn default() -> Self {
        Self {
            ip: String::new(),
            first_seen: DateTime::<Utc>::default(),
            last_seen: DateTime::<Utc>::default(),
            location: UNKNOWN_LOCATION.to_owned(),
            user_agent: String::new(),
            pages: BTreeSet::new(),
            visits: Vec::new(),
            visit_count: 0,
            total_duration_seconds: 0,
            current_visit: None,
            visited_index: false,
        }
    }
}

impl VisitorRecord {
    fn merge_visit_metadata(&mut self, visit: &ActiveVisit) {
        if visit.last_seen > self.last_seen {
            self.last_seen = visit.last_seen;
        }
        self.pages.extend(visit.pages.iter().cloned());
        if location_improves(&visit.location) {
            self.location = visit.location.clone();
        }
        if !visit.user_agent.is_empty() {
            self.user_agent = clip_user_agent(&visit.user_agent);
        }
    }
}

/// The persistent visitor log.
pub struct VisitorLog {
    doc: JsonDocument,
    index_pages: BTreeSet<String>,
    inner: Mutex<BTreeMap<String, VisitorRecord>>,
}

impl VisitorLog {
    /// Load the log from `doc`.  `index_pages` are the normalized paths
    /// that make a visit count as real (typically just `/`).
    pub fn open(doc: JsonDocument, index_pages: BTreeSet<String>) -> Self {
        let records: BTreeMap<String, VisitorRecord> = doc.load();
        Self {
            doc,
            index_pages,
            inner: Mutex::new(records),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, VisitorRecord>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Snapshot the map while holding the lock, then persist after
    /// releasing it so other requests are not blocked on disk I/O.
    fn persist(&self) {
        let snapshot = self.lock().clone();
        self.doc.save(&snapshot);
    }

    /// Whether this visit should be recorded: it touched an index page,
    /// or the IP already has real history from an earlier visit.
    pub fn counts_as_real(&self, visit: &ActiveVisit) -> bool {
        visit.touched_any(&self.index_pages) || self.remembers(&visit.ip)
    }

    /// `true` when the IP has a record that ever touched the index page.
    pub fn remembers(&self, ip: &str) -> bool {
        self.lock().get(ip).map(|r| r.visited_index).unwrap_or(false)
    }

    /// Mirror an in-progress visit into the lifetime record, creating the
    /// record on the first ping.  Keeps `visit_count` optimistic
    /// (`visits.len() + 1`) so the admin view can show "visit N in
    /// progress" without double counting after the visit closes.
    pub fn record_progress(&self, visit: &ActiveVisit) {
        {
            let mut records = self.lock();
            let record = records
                .entry(visit.ip.clone())
                .or_insert_with(|| VisitorRecord {
                    ip: visit.ip.clone(),
                    first_seen: visit.first_seen,
                    last_seen: visit.first_seen,
                    ..VisitorRecord::default()
                });
            record.merge_visit_metadata(visit);
            record.current_visit = Some(VisitSession::from_active(visit));
            record.visit_count = record.visits.len() + 1;
        }
        self.persist();
    }

    /// Close an ended visit into the lifetime record.
    ///
    /// A visit that never touched an index page appends nothing: for an
    /// unknown IP this is a strict no-op, for a known IP only the stale
    /// `current_visit` mirror is cleared.
    pub fn finalize(&self, visit: &ActiveVisit) {
        let touched_index = visit.touched_any(&self.index_pages);
        let changed = {
            let mut records = self.lock();
            if !touched_index {
                match records.get_mut(&visit.ip) {
                    Some(record) if record.current_visit.is_some() => {
                        record.current_visit = None;
                        record.visit_count = record.visits.len();
                        true
                    }
                    _ => false,
                }
            } else {
                let record = records
                    .entry(visit.ip.clone())
                    .or_insert_with(|| VisitorRecord {
                        ip: visit.ip.clone(),
                        first_seen: visit.first_seen,
                        last_seen: visit.first_seen,
                        ..VisitorRecord::default()
                    });
                record.merge_visit_metadata(visit);
                let closed = VisitSession::from_active(visit);
                record.total_duration_seconds += closed.duration_seconds;
                record.visits.push(closed);
                record.current_visit = None;
                record.visit_count = record.visits.len();
                record.visited_index = true;
                true
            }
        };
        if changed {
            self.persist();
        }
    }

    /// All records, most recently seen first.  When `include_current` is
    /// false the in-progress mirror is stripped and `visit_count` falls
    /// back to the closed count.
    pub fn snapshot(&self, include_current: bool) -> Vec<VisitorRecord> {
        let mut records: Vec<VisitorRecord> = self.lock().values().cloned().collect();
        if !include_current {
            for record in &mut records {
                record.current_visit = None;
                record.visit_count = record.visits.len();
            }
        }
        records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        records
    }

    /// Explicit admin deletion of one record.
    pub fn forget(&self, ip: &str) -> Result<(), StoreError> {
        let removed = self.lock().remove(ip).is_some();
        if !removed {
            return Err(StoreError::NotFound(format!("no visitor record for {ip}")));
        }
        self.persist();
        Ok(())
    }
}
