use crate::cache::ReferralCache;
use crate::error::{DnsError, Result};
use hickory_proto::dnssec::rdata::{DNSSECRData, DNSKEY};
use hickory_proto::dnssec::PublicKey;
use hickory_proto::rr::{Name, RData};
use hickory_proto::serialize::txt::Parser;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A DNSKEY accepted as a root of trust, remembered with its owner name so a
/// successful chain can report which anchor vouched.
#[derive(Debug, Clone)]
pub struct TrustedKey {
    pub name: Name,
    pub key: DNSKEY,
}

/// The set of locally configured trust anchors. Loaded once at startup and
/// immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorSet {
    keys: Vec<TrustedKey>,
}

impl TrustAnchorSet {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    pub fn add_trusted_key(&mut self, name: Name, key: DNSKEY) {
        info!("adding trusted key for {}", name);
        self.keys.push(TrustedKey { name, key });
    }

    /// Owner name of the anchor whose public key material is bitwise equal
    /// to `key`'s.
    ///
    /// Matching deliberately ignores the anchor's owner name: any configured
    /// anchor can vouch for any zone. The returned label lets callers audit
    /// which anchor authorized what.
    pub fn trust_label(&self, key: &DNSKEY) -> Option<&Name> {
        self.keys
            .iter()
            .find(|anchor| {
                anchor.key.public_key().public_bytes() == key.public_key().public_bytes()
            })
            .map(|anchor| &anchor.name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Scan `dir` recursively for zone-file-format files. Every DNSKEY found
/// becomes a trust anchor; every NS record owned by the root becomes a
/// nameserver hint on the root referral.
pub fn load_anchor_dir(
    dir: &Path,
    anchors: &mut TrustAnchorSet,
    cache: &ReferralCache,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            load_anchor_dir(&path, anchors, cache)?;
        } else {
            load_anchor_file(&path, anchors, cache)?;
        }
    }
    Ok(())
}

fn load_anchor_file(path: &Path, anchors: &mut TrustAnchorSet, cache: &ReferralCache) -> Result<()> {
    debug!("loading trust anchors from {}", path.display());
    let text = fs::read_to_string(path)?;
    let parser = Parser::new(text, Some(path.to_path_buf()), Some(Name::root()));
    let (_, records) = parser.parse().map_err(|e| DnsError::Parse(e.to_string()))?;

    for rrset in records.values() {
        for record in rrset.records_without_rrsigs() {
            match record.data() {
                RData::DNSSEC(DNSSECRData::DNSKEY(key)) => {
                    anchors.add_trusted_key(record.name().clone(), key.clone());
                }
                RData::NS(ns) if record.name().is_root() => {
                    info!("adding hint to root: {}", ns.0);
                    cache.add_root_hint(record.clone());
                }
                _ => {}
            }
        }
    }

    Ok(())
}
