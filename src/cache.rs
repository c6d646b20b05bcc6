//! Short-lived cache of referrals and authoritative answers keyed by zone
//! origin. Referrals collect the NS/DS/RRSIG records seen while being
//! referred to an origin; answers collect what that origin's servers returned
//! authoritatively.

use hickory_proto::rr::{Name, Record};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Records accumulated for one zone origin.
#[derive(Debug, Clone, Default)]
pub struct Referral {
    pub origin: Name,
    /// NS/DS/RRSIG observed in referrals pointing at `origin`
    pub authority: Vec<Record>,
    /// Authoritative answers previously returned for `origin`
    pub answer: Vec<Record>,
}

impl Referral {
    fn new(origin: Name) -> Self {
        Self {
            origin,
            authority: Vec::new(),
            answer: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    referral: Referral,
    inserted: Instant,
}

impl CacheEntry {
    fn new(origin: Name) -> Self {
        Self {
            referral: Referral::new(origin),
            inserted: Instant::now(),
        }
    }
}

/// Mapping from zone origin to its [`Referral`], with a flat per-entry TTL.
///
/// The entry for the root is immortal: it is seeded with at least one NS hint
/// at construction and survives for the process lifetime, so every lookup has
/// a starting point.
#[derive(Debug)]
pub struct ReferralCache {
    ttl: Duration,
    root: RwLock<Referral>,
    entries: RwLock<HashMap<Name, CacheEntry>>,
}

impl ReferralCache {
    pub fn new(ttl: Duration, root_hint: Record) -> Self {
        let mut root = Referral::new(Name::root());
        root.authority.push(root_hint);

        Self {
            ttl,
            root: RwLock::new(root),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the entry for `name`, if present and not expired. The
    /// root entry never expires.
    pub fn get(&self, name: &Name) -> Option<Referral> {
        if name.is_root() {
            return Some(self.root.read().clone());
        }

        let entries = self.entries.read();
        let entry = entries.get(name)?;
        if entry.inserted.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.referral.clone())
    }

    /// Snapshot of the immortal root entry.
    pub fn root(&self) -> Referral {
        self.root.read().clone()
    }

    /// Ensure an entry for `name` and append `rr` to its authority section
    /// unless an equal record is already present.
    pub fn add_referral(&self, name: &Name, rr: Record) {
        if name.is_root() {
            push_unique(&mut self.root.write().authority, rr);
            return;
        }

        let mut entries = self.entries.write();
        let entry = self.fresh_entry(&mut entries, name);
        push_unique(&mut entry.referral.authority, rr);
    }

    /// Ensure an entry for `name` and append `rr` to its answer section
    /// unless an equal record is already present.
    pub fn add_answer(&self, name: &Name, rr: Record) {
        if name.is_root() {
            push_unique(&mut self.root.write().answer, rr);
            return;
        }

        let mut entries = self.entries.write();
        let entry = self.fresh_entry(&mut entries, name);
        push_unique(&mut entry.referral.answer, rr);
    }

    /// Append an NS hint to the root authority. Used when loading trust
    /// anchor files that carry root nameserver records.
    pub fn add_root_hint(&self, rr: Record) {
        push_unique(&mut self.root.write().authority, rr);
    }

    /// Entry for `name`, replacing it if it has expired. Called with the
    /// write lock held so no two callers can materialize a duplicate entry.
    fn fresh_entry<'a>(
        &self,
        entries: &'a mut HashMap<Name, CacheEntry>,
        name: &Name,
    ) -> &'a mut CacheEntry {
        let entry = entries
            .entry(name.clone())
            .or_insert_with(|| CacheEntry::new(name.clone()));
        if entry.inserted.elapsed() >= self.ttl {
            *entry = CacheEntry::new(name.clone());
        }
        entry
    }
}

fn push_unique(list: &mut Vec<Record>, rr: Record) {
    if !list.contains(&rr) {
        list.push(rr);
    }
}
