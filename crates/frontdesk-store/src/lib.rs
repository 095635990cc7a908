//! frontdesk-store – the domain core of the frontdesk backend.
//!
//! Each store is an owned struct holding its map behind a mutex plus the
//! JSON document it persists to, constructed once at process start and
//! shared via `Arc` (no module-level singletons).  Mutations snapshot the
//! state while holding the lock and write the file after releasing it, so
//! request handlers never block on disk I/O inside a critical section.
//!
//! Lock discipline: no store ever calls into another store.  Handoffs
//! (presence timeout → visit finalization) happen in the caller, which
//! pops entries from one store, releases its lock, and only then touches
//! the next store.

pub mod autopilot;
pub mod bans;
pub mod chat;
pub mod document;
pub mod geo;
pub mod presence;
pub mod visitor;

mod error;

pub use autopilot::{AutopilotResponder, AutopilotSettings};
pub use bans::BanList;
pub use chat::{ChatMessage, ChatSession, ChatStore, ChatVisitor, MessageKind, ReadRole, Sender};
pub use document::JsonDocument;
pub use error::StoreError;
pub use geo::GeoResolver;
pub use presence::{ActiveVisit, PresenceTracker};
pub use visitor::{VisitSession, VisitorLog, VisitorRecord};

/// Sentinel used when geolocation failed or has not happened yet.
/// A known location is never overwritten by this value.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Location label assigned to private / loopback addresses.
pub const LOCAL_NETWORK: &str = "Local network";

/// Longest user-agent string any store keeps.
pub const MAX_USER_AGENT_LEN: usize = 256;

/// Normalize a page path before it enters any page set: strip query and
/// fragment, trim whitespace, force a leading slash.  Empty input maps
/// to the root path.
pub fn normalize_page(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_suffix = trimmed
        .split_once(['?', '#'])
        .map(|(head, _)| head)
        .unwrap_or(trimmed);
    if without_suffix.is_empty() {
        return "/".to_owned();
    }
    if without_suffix.starts_with('/') {
        without_suffix.to_owned()
    } else {
        format!("/{without_suffix}")
    }
}

/// Clip a user-agent string to [`MAX_USER_AGENT_LEN`] on a char boundary.
pub fn clip_user_agent(ua: &str) -> String {
    if ua.len() <= MAX_USER_AGENT_LEN {
        return ua.to_owned();
    }
    let mut end = MAX_USER_AGENT_LEN;
    while !ua.is_char_boundary(end) {
        end -= 1;
    }
    ua[..end].to_owned()
}

/// `true` when `candidate` should replace `current` as the best-known
/// location: it must be non-empty and not the unknown sentinel.
pub(crate) fn location_improves(candidate: &str) -> bool {
    !candidate.trim().is_empty() && candidate != UNKNOWN_LOCATION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_query_and_fragment() {
        assert_eq!(normalize_page("/services?ref=ad"), "/services");
        assert_eq!(normalize_page("/about#team"), "/about");
    }

    #[test]
    fn normalize_forces_leading_slash() {
        assert_eq!(normalize_page("contact"), "/contact");
        assert_eq!(normalize_page("  /  "), "/");
        assert_eq!(normalize_page(""), "/");
    }

    #[test]
    fn user_agent_clipped_on_char_boundary() {
        let long = "é".repeat(300);
        let clipped = clip_user_agent(&long);
        assert!(clipped.len() <= MAX_USER_AGENT_LEN);
        assert!(clipped.chars().all(|c| c == 'é'));
    }

    #[test]
    fn unknown_location_never_improves() {
        assert!(!location_improves(UNKNOWN_LOCATION));
        assert!(!location_improves("   "));
        assert!(location_improves("Leeds, England"));
    }
}
