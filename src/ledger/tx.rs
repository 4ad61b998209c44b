use crate::ledger::abi::keccak256;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use thiserror::Error;

pub type Address = [u8; 20];

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("private key is not valid hex")]
    Hex,
    #[error("private key is not a valid secp256k1 scalar")]
    Key,
    #[error("signing failed: {0}")]
    Sign(String),
}

/// Signing identity for ledger writes.
pub struct Signer {
    secret: SecretKey,
    address: Address,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("address", &format_address(&self.address)).finish()
    }
}

impl Signer {
    pub fn from_hex(key: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(key.trim().trim_start_matches("0x")).map_err(|_| SignerError::Hex)?;
        let secret = SecretKey::from_slice(&bytes).map_err(|_| SignerError::Key)?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        let uncompressed = public.serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        Ok(Self { secret, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

pub fn parse_address(raw: &str) -> Option<Address> {
    let bytes = hex::decode(raw.trim().trim_start_matches("0x")).ok()?;
    bytes.try_into().ok()
}

/// Pre-London transaction signed with EIP-155 replay protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTx {
    /// RLP of the EIP-155 signing payload.
    pub fn signing_payload(&self) -> Vec<u8> {
        rlp_list(&[
            rlp_uint(u128::from(self.nonce)),
            rlp_uint(self.gas_price),
            rlp_uint(u128::from(self.gas_limit)),
            rlp_bytes(&self.to),
            rlp_uint(self.value),
            rlp_bytes(&self.data),
            rlp_uint(u128::from(self.chain_id)),
            rlp_uint(0),
            rlp_uint(0),
        ])
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Raw signed transaction bytes, ready for `eth_sendRawTransaction`.
    pub fn sign(&self, signer: &Signer) -> Result<Vec<u8>, SignerError> {
        let message = Message::from_digest(self.signing_hash());
        let signature = Secp256k1::signing_only().sign_ecdsa_recoverable(&message, &signer.secret);
        let (recovery_id, compact) = signature.serialize_compact();
        let recovery = u64::try_from(recovery_id.to_i32()).map_err(|e| SignerError::Sign(e.to_string()))?;
        let v = self
            .chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + recovery))
            .ok_or_else(|| SignerError::Sign(format!("chain id {} is too large", self.chain_id)))?;

        Ok(rlp_list(&[
            rlp_uint(u128::from(self.nonce)),
            rlp_uint(self.gas_price),
            rlp_uint(u128::from(self.gas_limit)),
            rlp_bytes(&self.to),
            rlp_uint(self.value),
            rlp_bytes(&self.data),
            rlp_uint(u128::from(v)),
            rlp_bytes(strip_leading_zeros(&compact[..32])),
            rlp_bytes(strip_leading_zeros(&compact[32..])),
        ]))
    }
}

// ---------------------------------------------------------------------------
// RLP
// ---------------------------------------------------------------------------

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

fn rlp_uint(v: u128) -> Vec<u8> {
    rlp_bytes(strip_leading_zeros(&v.to_be_bytes()))
}

fn rlp_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        return bytes.to_vec();
    }
    let mut out = rlp_length_prefix(bytes.len(), 0x80);
    out.extend_from_slice(bytes);
    out
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();
    let mut out = rlp_length_prefix(payload.len(), 0xc0);
    out.extend(payload);
    out
}

fn rlp_length_prefix(len: usize, offset: u8) -> Vec<u8> {
    if len <= 55 {
        vec![offset + len as u8]
    } else {
        let len_bytes = (len as u64).to_be_bytes();
        let len_bytes = strip_leading_zeros(&len_bytes);
        let mut out = vec![offset + 55 + len_bytes.len() as u8];
        out.extend_from_slice(len_bytes);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};

    fn eip155_example() -> LegacyTx {
        LegacyTx {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: [0x35; 20],
            value: 1_000_000_000_000_000_000,
            data: vec![],
            chain_id: 1,
        }
    }

    #[test]
    fn rlp_edge_cases() {
        assert_eq!(rlp_uint(0), vec![0x80]);
        assert_eq!(rlp_uint(0x7f), vec![0x7f]);
        assert_eq!(rlp_uint(0x80), vec![0x81, 0x80]);
        assert_eq!(rlp_bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(rlp_list(&[]), vec![0xc0]);

        let long = vec![0xaa; 56];
        let encoded = rlp_bytes(&long);
        assert_eq!(&encoded[..2], &[0xb8, 56]);
    }

    #[test]
    fn eip155_signing_payload_matches_reference() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn signer_address_derivation() {
        let key = format!("0x{}1", "0".repeat(63));
        let signer = Signer::from_hex(&key).expect("valid key");
        assert_eq!(
            format_address(&signer.address()),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn signed_transaction_recovers_to_signer() {
        let signer = Signer::from_hex(&"46".repeat(32)).expect("valid key");
        let tx = eip155_example();
        let raw = tx.sign(&signer).expect("signs");

        // v, r, s are the last three items; v is 37 or 38 for chain id 1.
        // r and s are 32-byte strings unless they have leading zeros.
        let tail = &raw[raw.len() - 67..];
        let (v, r, s) = (tail[0], &tail[2..34], &tail[35..67]);
        assert!(v == 37 || v == 38, "unexpected v {v}");
        assert_eq!(tail[1], 0xa0);
        assert_eq!(tail[34], 0xa0);

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(r);
        compact[32..].copy_from_slice(s);
        let recovery = RecoveryId::from_i32(i32::from(v) - 37).expect("recovery id");
        let signature = RecoverableSignature::from_compact(&compact, recovery).expect("signature");
        let message = Message::from_digest(tx.signing_hash());
        let public = Secp256k1::new().recover_ecdsa(&message, &signature).expect("recovers");
        let hash = keccak256(&public.serialize_uncompressed()[1..]);
        assert_eq!(&hash[12..], &signer.address());
    }

    #[test]
    fn oversized_chain_id_is_rejected() {
        let signer = Signer::from_hex(&"46".repeat(32)).expect("valid key");
        let tx = LegacyTx { chain_id: u64::MAX / 2, ..eip155_example() };
        assert!(matches!(tx.sign(&signer), Err(SignerError::Sign(_))));
    }

    #[test]
    fn invalid_keys_are_rejected() {
        assert!(matches!(Signer::from_hex("not-hex"), Err(SignerError::Hex)));
        assert!(matches!(Signer::from_hex(&"00".repeat(32)), Err(SignerError::Key)));
    }

    #[test]
    fn addresses_parse_with_or_without_prefix() {
        let a = parse_address("0x3535353535353535353535353535353535353535").expect("parses");
        assert_eq!(a, [0x35; 20]);
        assert_eq!(parse_address("3535353535353535353535353535353535353535"), Some(a));
        assert_eq!(parse_address("0x35"), None);
    }
}
