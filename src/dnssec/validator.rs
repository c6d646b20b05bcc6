//! Recursive signature-chain validation: resolve the signer's keys, verify
//! the signature, and climb DS/DNSKEY links until a configured trust anchor
//! terminates the chain.

use crate::dnssec::{PublishedKeys, TrustAnchorSet};
use crate::error::{DnsError, Result};
use crate::resolver::Resolver;
use crate::rrset::{find_key, rrset_name, rrset_type, split_signed};
use hickory_proto::dnssec::rdata::{DNSKEY, RRSIG};
use hickory_proto::dnssec::Verifier;
use hickory_proto::rr::{DNSClass, Name, Record, RecordType};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// Recursion headroom on top of the rrset owner's label count. Chains ascend
/// toward the root, so labels + slack bounds any well-formed chain; the
/// budget stops self-referential signers.
const CHAIN_DEPTH_SLACK: u8 = 4;

const PUBLISHED_TYPES: [RecordType; 3] =
    [RecordType::CDS, RecordType::CDNSKEY, RecordType::DNSKEY];

pub struct ChainValidator {
    resolver: Arc<Resolver>,
    anchors: Arc<TrustAnchorSet>,
}

impl ChainValidator {
    pub fn new(resolver: Arc<Resolver>, anchors: Arc<TrustAnchorSet>) -> Self {
        Self { resolver, anchors }
    }

    /// Resolve the CDS, CDNSKEY and DNSKEY RRsets for `domain`, validate each
    /// against the configured trust anchors, and return the records grouped
    /// by type with the set of anchor labels that vouched for them.
    pub async fn domain_keys(&self, domain: &str) -> Result<PublishedKeys> {
        let mut name = Name::from_utf8(domain)
            .map_err(|e| DnsError::Parse(e.to_string()))?
            .to_lowercase();
        name.set_fqdn(true);

        let mut answer: Vec<Record> = Vec::new();
        for rtype in PUBLISHED_TYPES {
            let records = self.resolver.lookup(&name, rtype).await?;
            answer.extend(records);
        }

        let mut keys = PublishedKeys::default();
        for rtype in PUBLISHED_TYPES {
            let (records, sigs) = split_signed(&answer, rtype);
            let trusted = self.validate(&records, &sigs).await;
            if trusted.is_empty() {
                debug!("no trusted chain for {} {:?}", name, rtype);
            } else {
                keys.signers.push(trusted);
            }
            for rr in records {
                match rr.record_type() {
                    RecordType::CDS => keys.cds.push(rr),
                    RecordType::CDNSKEY => keys.cdnskey.push(rr),
                    RecordType::DNSKEY => keys.dnskey.push(rr),
                    _ => {}
                }
            }
        }

        Ok(keys)
    }

    /// Try each signature until one chains up to a trust anchor. Returns the
    /// anchor's owner name, or the empty string when no chain validates.
    pub async fn validate(&self, rrset: &[Record], sigs: &[RRSIG]) -> String {
        let budget = match rrset_name(rrset) {
            Ok(name) => name.num_labels() + CHAIN_DEPTH_SLACK,
            Err(_) => return String::new(),
        };
        self.validate_at(rrset.to_vec(), sigs.to_vec(), budget).await
    }

    /// Boxed for recursion. Validation failures are never propagated: a
    /// failing signature just moves on to the next candidate.
    fn validate_at(
        &self,
        rrset: Vec<Record>,
        sigs: Vec<RRSIG>,
        budget: u8,
    ) -> Pin<Box<dyn Future<Output = String> + Send + '_>> {
        Box::pin(async move {
            if budget == 0 {
                debug!("validation depth exhausted");
                return String::new();
            }

            for sig in &sigs {
                let signer = sig.signer_name().clone();
                let key_tag = sig.key_tag();
                trace!("checking signature by key tag {} of {}", key_tag, signer);

                let set = match self.resolver.lookup(&signer, RecordType::DNSKEY).await {
                    Ok(set) => set,
                    Err(e) => {
                        debug!("lookup {} DNSKEY: {}", signer, e);
                        continue;
                    }
                };

                let Some(key) = find_key(&set, key_tag) else {
                    debug!("no key {} in {}", key_tag, signer);
                    continue;
                };

                if let Err(e) = validate_one(&rrset, sig, key) {
                    debug!("validation error: {}", e);
                    continue;
                }

                if let Some(label) = self.anchors.trust_label(key) {
                    debug!("chain ends on trusted key {}", label);
                    return label.to_string();
                }

                // The rrset signed itself with an untrusted key; only a DS
                // from the parent can extend the chain.
                if find_key(&rrset, key_tag).is_some() {
                    let ds_answer = match self.resolver.lookup(&signer, RecordType::DS).await {
                        Ok(set) => set,
                        Err(e) => {
                            debug!("no DS for {}: {}", signer, e);
                            continue;
                        }
                    };
                    let (dsset, ds_sigs) = split_signed(&ds_answer, RecordType::DS);
                    let trusted = self.validate_at(dsset, ds_sigs, budget - 1).await;
                    if !trusted.is_empty() {
                        return trusted;
                    }
                    continue;
                }

                // Otherwise climb via the signer's own key material carried
                // back by the DNSKEY lookup: DS first, then DNSKEY.
                for rtype in [RecordType::DS, RecordType::DNSKEY] {
                    let (records, newsigs) = split_signed(&set, rtype);
                    let trusted = self.validate_at(records, newsigs, budget - 1).await;
                    if !trusted.is_empty() {
                        return trusted;
                    }
                }
            }

            String::new()
        })
    }
}

/// Check one signature over `rrset` with `key`: the signer-scope rule, the
/// validity window, then the cryptographic verification.
pub fn validate_one(rrset: &[Record], sig: &RRSIG, key: &DNSKEY) -> Result<()> {
    let name = rrset_name(rrset)?;
    let rtype = rrset_type(rrset)?;
    let signer = sig.signer_name();

    // Non-DS records must be signed from within their own zone. A DS lives on
    // the parent side of the cut and must never be signed from within the
    // child zone it delegates.
    let signer_in_zone = name.zone_of(signer);
    if rtype != RecordType::DS && !signer_in_zone {
        debug!("signer {} is not part of {}", signer, name);
        return Err(DnsError::BadSigner {
            signer: signer.to_string(),
            name: name.to_string(),
        });
    }
    if rtype == RecordType::DS && signer_in_zone {
        debug!("signer {} ignored for DS of {}", signer, name);
        return Err(DnsError::BadSigner {
            signer: signer.to_string(),
            name: name.to_string(),
        });
    }

    let now = unix_now();
    if now < sig.sig_inception().get() || now > sig.sig_expiration().get() {
        return Err(DnsError::SignatureExpired);
    }

    key.verify_rrsig(&name, DNSClass::IN, sig, rrset.iter())
        .map_err(|e| DnsError::VerifyFailed(e.to_string()))
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
