//! Shared test fixtures: Ed25519-signed zone material and in-process mock
//! nameservers speaking just enough DNS for the resolver under test.

#![allow(dead_code)]

use hickory_proto::dnssec::crypto::Ed25519SigningKey;
use hickory_proto::dnssec::rdata::{DNSSECRData, DNSKEY, DS, RRSIG};
use hickory_proto::dnssec::{
    Algorithm, DigestType, PublicKey, PublicKeyBuf, SigSigner, SigningKey, TBS,
};
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::NS;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordSet, RecordType};
use mimir::cache::ReferralCache;
use mimir::query::QueryClient;
use mimir::resolver::Resolver;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

pub fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

pub fn ns_record(owner: &str, target: &str) -> Record {
    Record::from_rdata(name(owner), 3600, RData::NS(NS(name(target))))
}

/// A zone with its own Ed25519 key pair, able to sign RRsets and emit the
/// DNSKEY/DS records other zones need to delegate to it.
pub struct SignedZone {
    pub origin: Name,
    pub dnskey: DNSKEY,
    signer: SigSigner,
}

impl SignedZone {
    pub fn new(origin: &str) -> Self {
        let origin = name(origin);
        let pkcs8 = Ed25519SigningKey::generate_pkcs8().unwrap();
        let signing_key = Ed25519SigningKey::from_pkcs8(&pkcs8).unwrap();
        let public = signing_key.to_public_key().unwrap();
        let dnskey = DNSKEY::with_flags(
            257,
            PublicKeyBuf::new(public.public_bytes().to_vec(), Algorithm::ED25519),
        );
        let signer = SigSigner::dnssec(
            dnskey.clone(),
            Box::new(signing_key),
            origin.clone(),
            Duration::from_secs(7200),
        );
        Self {
            origin,
            dnskey,
            signer,
        }
    }

    pub fn key_tag(&self) -> u16 {
        self.dnskey.calculate_key_tag().unwrap()
    }

    /// The zone's DNSKEY as a record at its apex.
    pub fn key_record(&self) -> Record {
        Record::from_rdata(
            self.origin.clone(),
            3600,
            RData::DNSSEC(DNSSECRData::DNSKEY(self.dnskey.clone())),
        )
    }

    /// The DS for this zone's key, as the parent publishes it.
    pub fn ds_record(&self) -> Record {
        let digest = self
            .dnskey
            .to_digest(&self.origin, DigestType::SHA256)
            .unwrap();
        let ds = DS::new(
            self.key_tag(),
            Algorithm::ED25519,
            DigestType::SHA256,
            digest.as_ref().to_vec(),
        );
        Record::from_rdata(
            self.origin.clone(),
            3600,
            RData::DNSSEC(DNSSECRData::DS(ds)),
        )
    }

    /// RRSIG over `records` (which must share owner and type), valid now.
    pub fn sign(&self, records: &[Record]) -> Record {
        self.sign_at(records, OffsetDateTime::now_utc() - TimeDuration::minutes(5))
    }

    /// RRSIG over `records` with an explicit inception; the signature expires
    /// two hours after inception, so a sufficiently old inception produces an
    /// expired signature.
    pub fn sign_at(&self, records: &[Record], inception: OffsetDateTime) -> Record {
        let owner = records[0].name().clone();
        let rtype = records[0].record_type();
        let mut rrset = RecordSet::new(owner.clone(), rtype, 0);
        for rr in records {
            rrset.insert(rr.clone(), 0);
        }
        let expiration = inception + self.signer.sig_duration();
        let tbs = TBS::from_rrset(&rrset, DNSClass::IN, inception, expiration, &self.signer)
            .unwrap();
        let signature = self.signer.sign(&tbs).unwrap();
        let rrsig = RRSIG::new(
            rtype,
            self.signer.key().algorithm(),
            owner.num_labels(),
            rrset.ttl(),
            expiration.unix_timestamp() as u32,
            inception.unix_timestamp() as u32,
            self.signer.calculate_key_tag().unwrap(),
            self.signer.signer_name().clone(),
            signature,
        );
        Record::from_rdata(owner, 3600, RData::DNSSEC(DNSSECRData::RRSIG(rrsig)))
    }

    /// The signed DNSKEY RRset at the zone apex: key record plus its RRSIG.
    pub fn signed_key_rrset(&self) -> Vec<Record> {
        let key = self.key_record();
        let sig = self.sign(std::slice::from_ref(&key));
        vec![key, sig]
    }
}

/// One canned reply for a `(name, rtype)` question.
#[derive(Clone)]
pub struct CannedResponse {
    pub authoritative: bool,
    pub rcode: ResponseCode,
    pub answers: Vec<Record>,
    pub authority: Vec<Record>,
    pub truncate_udp: bool,
}

impl CannedResponse {
    pub fn answer(records: Vec<Record>) -> Self {
        Self {
            authoritative: true,
            rcode: ResponseCode::NoError,
            answers: records,
            authority: Vec::new(),
            truncate_udp: false,
        }
    }

    pub fn referral(authority: Vec<Record>) -> Self {
        Self {
            authoritative: false,
            rcode: ResponseCode::NoError,
            answers: Vec::new(),
            authority,
            truncate_udp: false,
        }
    }

    pub fn nxdomain() -> Self {
        Self {
            authoritative: true,
            rcode: ResponseCode::NXDomain,
            answers: Vec::new(),
            authority: Vec::new(),
            truncate_udp: false,
        }
    }

    /// Serve this response over UDP with the TC bit and no records, forcing
    /// the client onto TCP for the real payload.
    pub fn truncated_on_udp(mut self) -> Self {
        self.truncate_udp = true;
        self
    }
}

/// Responses served by one mock nameserver, keyed by question.
#[derive(Clone, Default)]
pub struct ZoneData {
    responses: HashMap<(Name, RecordType), CannedResponse>,
}

impl ZoneData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, owner: &str, rtype: RecordType, response: CannedResponse) {
        self.responses.insert((name(owner), rtype), response);
    }

    fn response_for(&self, query: &Message, udp: bool) -> Option<Message> {
        let question = query.queries().first()?;
        let canned = self
            .responses
            .get(&(question.name().clone(), question.query_type()))?;

        let mut msg = Message::new();
        msg.set_id(query.id());
        msg.set_message_type(MessageType::Response);
        msg.set_op_code(OpCode::Query);
        msg.add_query(question.clone());
        msg.set_response_code(canned.rcode);
        msg.set_authoritative(canned.authoritative);

        if udp && canned.truncate_udp {
            msg.set_truncated(true);
            return Some(msg);
        }

        msg.add_answers(canned.answers.clone());
        msg.add_name_servers(canned.authority.clone());
        Some(msg)
    }
}

/// An in-process nameserver answering canned responses on UDP and TCP.
pub struct MockNameserver {
    pub port: u16,
}

impl MockNameserver {
    /// Bind `ip` (port 0 = ephemeral) and serve `zone` until the test ends.
    pub async fn start(ip: &str, port: u16, zone: ZoneData) -> Self {
        let udp = UdpSocket::bind((ip, port)).await.unwrap();
        let port = udp.local_addr().unwrap().port();
        let tcp = TcpListener::bind((ip, port)).await.unwrap();

        let zone = Arc::new(zone);
        tokio::spawn(serve_udp(udp, zone.clone()));
        tokio::spawn(serve_tcp(tcp, zone));

        Self { port }
    }
}

async fn serve_udp(socket: UdpSocket, zone: Arc<ZoneData>) {
    let mut buf = vec![0u8; 4096];
    loop {
        let Ok((len, src)) = socket.recv_from(&mut buf).await else {
            return;
        };
        let Ok(query) = Message::from_vec(&buf[..len]) else {
            continue;
        };
        if let Some(response) = zone.response_for(&query, true) {
            let _ = socket.send_to(&response.to_vec().unwrap(), src).await;
        }
    }
}

async fn serve_tcp(listener: TcpListener, zone: Arc<ZoneData>) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let zone = zone.clone();
        tokio::spawn(async move {
            let mut length_buf = [0u8; 2];
            if stream.read_exact(&mut length_buf).await.is_err() {
                return;
            }
            let len = u16::from_be_bytes(length_buf) as usize;
            let mut msg_buf = vec![0u8; len];
            if stream.read_exact(&mut msg_buf).await.is_err() {
                return;
            }
            let Ok(query) = Message::from_vec(&msg_buf) else {
                return;
            };
            if let Some(response) = zone.response_for(&query, false) {
                let wire = response.to_vec().unwrap();
                let _ = stream.write_all(&(wire.len() as u16).to_be_bytes()).await;
                let _ = stream.write_all(&wire).await;
            }
        });
    }
}

/// A resolver whose root referral points at a mock nameserver on localhost.
pub fn resolver_for_mock(root_ip: &str, port: u16) -> Arc<Resolver> {
    resolver_with_ttl(root_ip, port, Duration::from_secs(30))
}

pub fn resolver_with_ttl(root_ip: &str, port: u16, ttl: Duration) -> Arc<Resolver> {
    let root_hint = ns_record(".", &format!("{}.", root_ip));
    let cache = Arc::new(ReferralCache::new(ttl, root_hint));
    let client = QueryClient::new(Duration::from_millis(500), port);
    Arc::new(Resolver::new(cache, client))
}
