//! Helpers over record slices: locating keys, pairing signatures with the
//! records they cover, and checking RRset homogeneity.

use crate::error::{DnsError, Result};
use hickory_proto::dnssec::rdata::{DNSSECRData, DNSKEY, DS, RRSIG};
use hickory_proto::rr::{Name, RData, Record, RecordType};

/// First DNSKEY in `set` whose computed key tag equals `tag`.
pub fn find_key<'a>(set: &'a [Record], tag: u16) -> Option<&'a DNSKEY> {
    set.iter().find_map(|rr| match rr.data() {
        RData::DNSSEC(DNSSECRData::DNSKEY(key))
            if key.calculate_key_tag().is_ok_and(|t| t == tag) =>
        {
            Some(key)
        }
        _ => None,
    })
}

/// First DS in `set` matching `key`: the key tags must agree and the DS
/// digest must equal the digest of `key` recomputed with the DS's own digest
/// type. A DS is never rehashed with a different algorithm.
pub fn find_ds<'a>(set: &'a [Record], owner: &Name, key: &DNSKEY) -> Option<&'a DS> {
    let tag = key.calculate_key_tag().ok()?;
    set.iter().find_map(|rr| match rr.data() {
        RData::DNSSEC(DNSSECRData::DS(ds))
            if ds.key_tag() == tag
                && key
                    .to_digest(owner, ds.digest_type())
                    .is_ok_and(|digest| digest.as_ref() == ds.digest()) =>
        {
            Some(ds)
        }
        _ => None,
    })
}

/// Target names of the NS records in `set`, in randomized order.
///
/// The shuffle spreads load across nameservers when some are failing; it is
/// not a security mechanism and uses the process-wide PRNG.
pub fn list_ns(set: &[Record]) -> Vec<String> {
    let mut targets: Vec<String> = set
        .iter()
        .filter_map(|rr| match rr.data() {
            RData::NS(ns) => Some(ns.0.to_string()),
            _ => None,
        })
        .collect();
    fastrand::shuffle(&mut targets);
    targets
}

/// Records in `set` owned by `name` whose type equals `rtype`, is RRSIG, or
/// where `rtype` is ANY. RRSIGs always pass so callers can pair signatures
/// with their covered type.
pub fn filter_rrs(set: &[Record], name: &Name, rtype: RecordType) -> Vec<Record> {
    set.iter()
        .filter(|rr| {
            rr.name() == name
                && (rr.record_type() == rtype
                    || rtype == RecordType::ANY
                    || rr.record_type() == RecordType::RRSIG)
        })
        .cloned()
        .collect()
}

/// Partition `set` into the records of type `rtype` and the RRSIGs covering
/// that type.
pub fn split_signed(set: &[Record], rtype: RecordType) -> (Vec<Record>, Vec<RRSIG>) {
    let mut records = Vec::new();
    let mut sigs = Vec::new();

    for rr in set {
        if rr.record_type() == rtype {
            records.push(rr.clone());
        }
        if let RData::DNSSEC(DNSSECRData::RRSIG(sig)) = rr.data() {
            if sig.type_covered() == rtype {
                sigs.push(sig.clone());
            }
        }
    }

    (records, sigs)
}

/// Common owner name of `set`. NSEC/NSEC3/RRSIG rows are exempt from the
/// homogeneity check since they ride along with other types.
pub fn rrset_name(set: &[Record]) -> Result<Name> {
    let first = set.first().ok_or(DnsError::EmptyRrset)?;

    let name = first.name().clone();
    for rr in set {
        if rr.name() != &name {
            match rr.record_type() {
                RecordType::NSEC | RecordType::NSEC3 | RecordType::RRSIG => continue,
                _ => return Err(DnsError::MixedRrset("names")),
            }
        }
    }
    Ok(name)
}

/// Common record type of `set`.
pub fn rrset_type(set: &[Record]) -> Result<RecordType> {
    let first = set.first().ok_or(DnsError::EmptyRrset)?;

    let rtype = first.record_type();
    for rr in set {
        if rr.record_type() != rtype {
            return Err(DnsError::MixedRrset("types"));
        }
    }
    Ok(rtype)
}
