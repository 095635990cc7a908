//! Persisted banned-IP set.
//!
//! Checked by a global middleware on every request; a banned IP gets a
//! 403 regardless of endpoint.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::document::JsonDocument;

pub struct BanList {
    doc: JsonDocument,
    inner: Mutex<BTreeSet<String>>,
}

impl BanList {
    pub fn open(doc: JsonDocument) -> Self {
        let banned: BTreeSet<String> = doc.load();
        Self {
            doc,
            inner: Mutex::new(banned),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_banned(&self, ip: &str) -> bool {
        self.lock().contains(ip)
    }

    /// Returns `false` if the IP was already banned.
    pub fn ban(&self, ip: &str) -> bool {
        let inserted = self.lock().insert(ip.trim().to_owned());
        if inserted {
            let snapshot = self.lock().clone();
            self.doc.save(&snapshot);
        }
        inserted
    }

    /// Returns `false` if the IP was not banned.
    pub fn unban(&self, ip: &str) -> bool {
        let removed = self.lock().remove(ip);
        if removed {
            let snapshot = self.lock().clone();
            self.doc.save(&snapshot);
        }
        removed
    }

    pub fn list(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ban_and_unban_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bans.json");
        {
            let bans = BanList::open(JsonDocument::new(&path));
            assert!(bans.ban("1.2.3.4"));
            assert!(!bans.ban("1.2.3.4"));
            assert!(bans.is_banned("1.2.3.4"));
        }
        let reloaded = BanList::open(JsonDocument::new(&path));
        assert!(reloaded.is_banned("1.2.3.4"));
        assert!(reloaded.unban("1.2.3.4"));
        assert!(!reloaded.unban("1.2.3.4"));
        assert!(reloaded.list().is_empty());
    }
}
