pub mod trust_anchor;
pub mod validator;

pub use trust_anchor::{load_anchor_dir, TrustAnchorSet};
pub use validator::ChainValidator;

use hickory_proto::rr::Record;

/// Key-publication records for a domain, grouped by type, together with the
/// owner names of the trust anchors under which any of the groups validated.
///
/// `signers` being empty means no signature chain reached an anchor; the raw
/// records are still returned so callers can distinguish "no chain" from "no
/// records".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedKeys {
    pub signers: Vec<String>,
    pub dnskey: Vec<Record>,
    pub cds: Vec<Record>,
    pub cdnskey: Vec<Record>,
}
