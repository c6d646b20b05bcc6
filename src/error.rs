use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DnsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("protocol error: {0}")]
    Proto(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("query timed out")]
    Timeout,

    #[error("lookup failed for {0}")]
    LookupFailed(String),

    #[error("authoritative name error")]
    NxDomain,

    #[error("lookup depth exceeded for {0}")]
    DepthExceeded(String),

    #[error("malformed referral: {0}")]
    MalformedReferral(String),

    #[error("bad signer {signer} for {name}")]
    BadSigner { signer: String, name: String },

    #[error("signature not valid now")]
    SignatureExpired,

    #[error("signature verification failed: {0}")]
    VerifyFailed(String),

    #[error("empty rrset")]
    EmptyRrset,

    #[error("multiple {0} in rrset")]
    MixedRrset(&'static str),
}

impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        DnsError::Io(err.to_string())
    }
}

impl From<hickory_proto::ProtoError> for DnsError {
    fn from(err: hickory_proto::ProtoError) -> Self {
        DnsError::Proto(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DnsError>;

/// Errors raised while assembling the runtime configuration from the
/// environment.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("invalid root hint: {0}")]
    InvalidRootHint(String),

    #[error("configuration parse error: {0}")]
    ParseError(String),
}
