//! Iterative resolver: walks zones from the deepest cached origin down to the
//! target name, following authoritative referrals and populating the referral
//! cache along the way.

use crate::cache::{Referral, ReferralCache};
use crate::error::{DnsError, Result};
use crate::query::QueryClient;
use crate::rrset::{filter_rrs, list_ns, rrset_name};
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::{Name, Record, RecordType};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Hard cap on referral-following iterations per lookup. This is an
/// adversarial-loop bound, not a tuning knob.
const MAX_LOOKUP_DEPTH: usize = 10;

pub struct Resolver {
    cache: Arc<ReferralCache>,
    client: QueryClient,
}

impl Resolver {
    pub fn new(cache: Arc<ReferralCache>, client: QueryClient) -> Self {
        Self { cache, client }
    }

    pub fn cache(&self) -> &ReferralCache {
        &self.cache
    }

    /// Resolve `(name, rtype)` iteratively and return the final answer RRset,
    /// including any DS/NS/RRSIG cached from referrals to `name`.
    pub async fn lookup(&self, name: &Name, rtype: RecordType) -> Result<Vec<Record>> {
        let mut name = name.to_lowercase();
        name.set_fqdn(true);
        self.query_at_origin(&name, rtype).await
    }

    async fn query_at_origin(&self, name: &Name, rtype: RecordType) -> Result<Vec<Record>> {
        // A DS lives in the parent zone; starting from the deepest cached
        // child origin would query the wrong side of the zone cut.
        let mut referral = if rtype == RecordType::DS {
            self.cache.root()
        } else {
            zones_of(name)
                .into_iter()
                .find_map(|origin| self.cache.get(&origin))
                .unwrap_or_else(|| self.cache.root())
        };

        for _ in 0..MAX_LOOKUP_DEPTH {
            let cached = filter_rrs(&referral.answer, name, rtype);
            let msg = if cached.is_empty() {
                self.query_nameservers(name, rtype, &referral).await?
            } else {
                trace!("returning {} cached records for {}", cached.len(), name);
                synthesize_cached(cached)
            };

            if msg.authoritative() {
                if msg.answers().is_empty() {
                    debug!("empty authoritative answer for {} {:?}", name, rtype);
                }
                for rr in msg.answers() {
                    self.cache.add_answer(name, rr.clone());
                }

                let mut answer = msg.answers().to_vec();
                // Surface the DS/NS/RRSIG records observed while being
                // referred to this name alongside the answer itself. Equal
                // records are suppressed so downstream signature checks see
                // each RRset member exactly once.
                if let Some(child) = self.cache.get(name) {
                    for rr in child.authority {
                        if !answer.contains(&rr) {
                            answer.push(rr);
                        }
                    }
                }
                return Ok(answer);
            }

            // Non-authoritative: must be a referral to exactly one child zone
            let child = rrset_name(msg.name_servers())
                .map_err(|_| DnsError::MalformedReferral(name.to_string()))?;
            for rr in msg.name_servers() {
                self.cache.add_referral(&child, rr.clone());
            }
            referral = self
                .cache
                .get(&child)
                .ok_or_else(|| DnsError::LookupFailed(child.to_string()))?;
        }

        warn!("{} lookup depth exceeded", name);
        Err(DnsError::DepthExceeded(name.to_string()))
    }

    /// Try the referral's nameservers in shuffled order. The first exchange
    /// that yields a parseable response wins; NXDOMAIN in that response fails
    /// the whole lookup, transport errors move on to the next server.
    async fn query_nameservers(
        &self,
        name: &Name,
        rtype: RecordType,
        referral: &Referral,
    ) -> Result<Message> {
        for ns in list_ns(&referral.authority) {
            debug!("querying {} {:?} @ {}", name, rtype, ns);
            match self.client.query(name, rtype, &ns).await {
                Ok(msg) => {
                    if msg.response_code() == ResponseCode::NXDomain {
                        return Err(DnsError::NxDomain);
                    }
                    return Ok(msg);
                }
                Err(e) => {
                    debug!("{}, continuing to next ns", e);
                    continue;
                }
            }
        }

        Err(DnsError::LookupFailed(name.to_string()))
    }
}

fn synthesize_cached(cached: Vec<Record>) -> Message {
    let mut msg = Message::new();
    msg.set_id(0);
    msg.set_message_type(MessageType::Response);
    msg.set_op_code(OpCode::Query);
    msg.set_authoritative(true);
    msg.add_answers(cached);
    msg
}

/// The zones covering `name`, from the full name down to the root inclusive
/// (`example.com.` yields `example.com.`, `com.`, `.`).
pub fn zones_of(name: &Name) -> Vec<Name> {
    let mut zones = Vec::new();
    let mut current = name.clone();
    loop {
        zones.push(current.clone());
        if current.is_root() {
            break;
        }
        current = current.base_name();
    }
    zones
}
