//! Live visitor presence.
//!
//! Tracks the set of currently active visitors, keyed by IP, fed by
//! periodic client pings.  Entries here are ephemeral and in-memory
//! only; when a visit ends (explicit offline or inactivity timeout) the
//! popped [`ActiveVisit`] is handed to [`crate::VisitorLog::finalize`]
//! by the caller.
//!
//! Per-IP state machine: `absent → active → (timeout | offline) → absent`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{UNKNOWN_LOCATION, clip_user_agent, location_improves, normalize_page};

/// A still-open visit for one IP.  Mutable while active; snapshotted on
/// every ping so the visit aggregator can mirror the in-progress span.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveVisit {
    pub ip: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub location: String,
    pub user_agent: String,
    pub pages: BTreeSet<String>,
}

impl ActiveVisit {
    pub fn duration_seconds(&self) -> i64 {
        (self.last_seen - self.first_seen).num_seconds().max(0)
    }

    /// Whether this visit touched any of the given index pages.
    pub fn touched_any(&self, index_pages: &BTreeSet<String>) -> bool {
        self.pages.iter().any(|p| index_pages.contains(p))
    }
}

/// The set of currently active visitors.
pub struct PresenceTracker {
    active: Mutex<HashMap<String, ActiveVisit>>,
    timeout: Duration,
}

impl PresenceTracker {
    /// `timeout_secs` is the inactivity window after which a visitor is
    /// considered gone (default deployment value: 180).
    pub fn new(timeout_secs: i64) -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            timeout: Duration::seconds(timeout_secs),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ActiveVisit>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Keep-alive ping: `absent → active` on first contact, otherwise
    /// extends `last_seen` and merges page / location / user agent.
    /// Returns a snapshot of the visit after the merge.
    pub fn ping(
        &self,
        ip: &str,
        page: &str,
        location: &str,
        user_agent: &str,
        now: DateTime<Utc>,
    ) -> ActiveVisit {
        let page = normalize_page(page);
        let mut active = self.lock();
        let visit = active.entry(ip.to_owned()).or_insert_with(|| ActiveVisit {
            ip: ip.to_owned(),
            first_seen: now,
            last_seen: now,
            location: UNKNOWN_LOCATION.to_owned(),
            user_agent: String::new(),
            pages: BTreeSet::new(),
        });
        if now > visit.last_seen {
            visit.last_seen = now;
        }
        visit.pages.insert(page);
        if location_improves(location) {
            visit.location = location.to_owned();
        }
        if !user_agent.is_empty() {
            visit.user_agent = clip_user_agent(user_agent);
        }
        visit.clone()
    }

    /// Explicit offline signal: pops and returns the entry, if any.
    pub fn go_offline(&self, ip: &str) -> Option<ActiveVisit> {
        self.lock().remove(ip)
    }

    /// Expire every visit idle for longer than the timeout.  Idempotent;
    /// invoked opportunistically on every presence request.  Returns the
    /// popped visits so the caller can finalize them (after this lock is
    /// already released).
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<ActiveVisit> {
        let mut active = self.lock();
        let expired: Vec<String> = active
            .iter()
            .filter(|(_, v)| now - v.last_seen > self.timeout)
            .map(|(ip, _)| ip.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|ip| active.remove(&ip))
            .collect()
    }

    /// Snapshot of all active visits, most recent first.
    pub fn list_active(&self) -> Vec<ActiveVisit> {
        let mut visits: Vec<ActiveVisit> = self.lock().values().cloned().collect();
        visits.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        visits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn first_ping_creates_entry_with_equal_timestamps() {
        let tracker = PresenceTracker::new(180);
        let visit = tracker.ping("1.2.3.4", "/", "", "UA", at(0));
        assert_eq!(visit.first_seen, visit.last_seen);
        assert_eq!(visit.pages.iter().collect::<Vec<_>>(), ["/"]);
        assert_eq!(tracker.list_active().len(), 1);
    }

    #[test]
    fn repeated_pings_keep_first_seen_and_advance_last_seen() {
        let tracker = PresenceTracker::new(180);
        let first = tracker.ping("1.2.3.4", "/", "", "", at(0));
        let mut previous = first.last_seen;
        for step in [30, 60, 90] {
            let visit = tracker.ping("1.2.3.4", "/services", "", "", at(step));
            assert_eq!(visit.first_seen, first.first_seen);
            assert!(visit.last_seen > previous);
            previous = visit.last_seen;
        }
    }

    #[test]
    fn location_never_regresses_to_unknown() {
        let tracker = PresenceTracker::new(180);
        tracker.ping("1.2.3.4", "/", "Leeds, England", "", at(0));
        let visit = tracker.ping("1.2.3.4", "/", UNKNOWN_LOCATION, "", at(30));
        assert_eq!(visit.location, "Leeds, England");
    }

    #[test]
    fn sweep_pops_only_expired_entries() {
        let tracker = PresenceTracker::new(180);
        tracker.ping("1.1.1.1", "/", "", "", at(0));
        tracker.ping("2.2.2.2", "/", "", "", at(200));
        let expired = tracker.sweep(at(200));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].ip, "1.1.1.1");
        assert_eq!(tracker.list_active().len(), 1);
        // A second sweep at the same instant finds nothing new.
        assert!(tracker.sweep(at(200)).is_empty());
    }

    #[test]
    fn offline_pops_the_entry() {
        let tracker = PresenceTracker::new(180);
        tracker.ping("1.2.3.4", "/", "", "", at(0));
        let popped = tracker.go_offline("1.2.3.4").unwrap();
        assert_eq!(popped.ip, "1.2.3.4");
        assert!(tracker.go_offline("1.2.3.4").is_none());
        assert!(tracker.list_active().is_empty());
    }

    #[test]
    fn exactly_at_timeout_is_still_active() {
        let tracker = PresenceTracker::new(180);
        tracker.ping("1.2.3.4", "/", "", "", at(0));
        assert!(tracker.sweep(at(180)).is_empty());
        assert_eq!(tracker.sweep(at(181)).len(), 1);
    }
}
