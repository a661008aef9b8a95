use ethers::types::{Bytes, H256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    Eip712,
    EthSign,
    PreSigned,
}

/// Normalized ECDSA signature over an order or meta-transaction hash.
/// `r` and `s` are always full 32-byte words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSignature {
    pub signature_type: SignatureType,
    pub v: u8,
    pub r: H256,
    pub s: H256,
}

/// Signature exactly as it came off the wire from a quote server. `r`/`s`
/// are variable-length; some maker implementations strip the leading zero
/// byte of a component when hex-encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOrderSignature {
    pub signature_type: SignatureType,
    pub v: u8,
    pub r: Bytes,
    pub s: Bytes,
}

impl From<OrderSignature> for RawOrderSignature {
    fn from(signature: OrderSignature) -> Self {
        Self {
            signature_type: signature.signature_type,
            v: signature.v,
            r: Bytes::from(signature.r.as_bytes().to_vec()),
            s: Bytes::from(signature.s.as_bytes().to_vec()),
        }
    }
}
