use sha3::{Digest, Keccak256};
use thiserror::Error;

const WORD: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("abi data truncated reading {wanted} bytes at offset {at}")]
    Truncated { at: usize, wanted: usize },
    #[error("integer at offset {0} does not fit in 128 bits")]
    Overflow(usize),
    #[error("string at offset {0} is not valid utf-8")]
    Utf8(usize),
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: &'static str, found: &'static str },
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the keccak hash of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// ABI values the bracket contract uses. `Uint` holds up to 128 bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address([u8; 20]),
    String(String),
    Bytes(Vec<u8>),
    FixedArray(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Uint,
    Address,
    String,
    Bytes,
    FixedArray(Box<Kind>, usize),
}

impl Kind {
    pub fn array(inner: Kind, len: usize) -> Kind {
        Kind::FixedArray(Box::new(inner), len)
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Kind::Uint | Kind::Address => false,
            Kind::String | Kind::Bytes => true,
            Kind::FixedArray(inner, _) => inner.is_dynamic(),
        }
    }

    fn head_len(&self) -> usize {
        match self {
            Kind::FixedArray(inner, len) if !self.is_dynamic() => inner.head_len() * len,
            _ => WORD,
        }
    }
}

impl Token {
    fn kind_name(&self) -> &'static str {
        match self {
            Token::Uint(_) => "uint",
            Token::Address(_) => "address",
            Token::String(_) => "string",
            Token::Bytes(_) => "bytes",
            Token::FixedArray(_) => "array",
        }
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Token::Uint(_) | Token::Address(_) => false,
            Token::String(_) | Token::Bytes(_) => true,
            Token::FixedArray(items) => items.iter().any(Token::is_dynamic),
        }
    }

    fn head_len(&self) -> usize {
        match self {
            Token::FixedArray(items) if !self.is_dynamic() => items.iter().map(Token::head_len).sum(),
            _ => WORD,
        }
    }

    pub fn strings<S: AsRef<str>>(items: &[S]) -> Token {
        Token::FixedArray(items.iter().map(|s| Token::String(s.as_ref().to_owned())).collect())
    }

    pub fn uints(items: &[u64]) -> Token {
        Token::FixedArray(items.iter().map(|v| Token::Uint(u128::from(*v))).collect())
    }

    pub fn into_uint(self) -> Result<u128, AbiError> {
        match self {
            Token::Uint(v) => Ok(v),
            other => Err(AbiError::Unexpected { expected: "uint", found: other.kind_name() }),
        }
    }

    pub fn into_address(self) -> Result<[u8; 20], AbiError> {
        match self {
            Token::Address(a) => Ok(a),
            other => Err(AbiError::Unexpected { expected: "address", found: other.kind_name() }),
        }
    }

    pub fn into_string(self) -> Result<String, AbiError> {
        match self {
            Token::String(s) => Ok(s),
            other => Err(AbiError::Unexpected { expected: "string", found: other.kind_name() }),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, AbiError> {
        match self {
            Token::Bytes(b) => Ok(b),
            other => Err(AbiError::Unexpected { expected: "bytes", found: other.kind_name() }),
        }
    }

    pub fn into_array(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Token::FixedArray(items) => Ok(items),
            other => Err(AbiError::Unexpected { expected: "array", found: other.kind_name() }),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `tokens` as a tuple (head/tail layout).
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_len).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
            tail.extend(encode_tail(token));
        } else {
            encode_static(token, &mut head);
        }
    }

    head.extend(tail);
    head
}

/// Selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(encode(args));
    data
}

fn encode_static(token: &Token, out: &mut Vec<u8>) {
    match token {
        Token::Uint(v) => out.extend_from_slice(&uint_word(*v)),
        Token::Address(a) => {
            out.extend_from_slice(&[0u8; 12]);
            out.extend_from_slice(a);
        }
        Token::FixedArray(items) => items.iter().for_each(|t| encode_static(t, out)),
        Token::String(_) | Token::Bytes(_) => unreachable!("dynamic token in static position"),
    }
}

fn encode_tail(token: &Token) -> Vec<u8> {
    match token {
        Token::String(s) => encode_packed_bytes(s.as_bytes()),
        Token::Bytes(b) => encode_packed_bytes(b),
        Token::FixedArray(items) => encode(items),
        Token::Uint(_) | Token::Address(_) => unreachable!("static token in tail position"),
    }
}

fn encode_packed_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&uint_word(bytes.len() as u128));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn uint_word(v: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a tuple of `kinds` from `data`.
pub fn decode(kinds: &[Kind], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let mut cursor = 0;
    let mut out = Vec::with_capacity(kinds.len());

    for kind in kinds {
        if kind.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            out.push(decode_tail(kind, data, offset)?);
            cursor += WORD;
        } else {
            out.push(decode_static(kind, data, cursor)?);
            cursor += kind.head_len();
        }
    }
    Ok(out)
}

/// Decode a single value, e.g. a function's only return value.
pub fn decode_one(kind: Kind, data: &[u8]) -> Result<Token, AbiError> {
    let found = decode(std::slice::from_ref(&kind), data)?;
    found
        .into_iter()
        .next()
        .ok_or(AbiError::Truncated { at: 0, wanted: WORD })
}

fn decode_static(kind: &Kind, data: &[u8], at: usize) -> Result<Token, AbiError> {
    match kind {
        Kind::Uint => read_uint(data, at).map(Token::Uint),
        Kind::Address => {
            let word = slice(data, at, WORD)?;
            let mut address = [0u8; 20];
            address.copy_from_slice(&word[12..]);
            Ok(Token::Address(address))
        }
        Kind::FixedArray(inner, len) => (0..*len)
            .map(|i| decode_static(inner, data, at + i * inner.head_len()))
            .collect::<Result<Vec<_>, _>>()
            .map(Token::FixedArray),
        Kind::String | Kind::Bytes => unreachable!("dynamic kind in static position"),
    }
}

fn decode_tail(kind: &Kind, data: &[u8], offset: usize) -> Result<Token, AbiError> {
    match kind {
        Kind::String => {
            let bytes = read_packed_bytes(data, offset)?;
            String::from_utf8(bytes).map(Token::String).map_err(|_| AbiError::Utf8(offset))
        }
        Kind::Bytes => read_packed_bytes(data, offset).map(Token::Bytes),
        Kind::FixedArray(inner, len) => {
            if offset > data.len() {
                return Err(AbiError::Truncated { at: offset, wanted: WORD });
            }
            let kinds = vec![(**inner).clone(); *len];
            decode(&kinds, &data[offset..]).map(Token::FixedArray)
        }
        Kind::Uint | Kind::Address => unreachable!("static kind in tail position"),
    }
}

fn read_packed_bytes(data: &[u8], offset: usize) -> Result<Vec<u8>, AbiError> {
    let len = read_usize(data, offset)?;
    Ok(slice(data, offset + WORD, len)?.to_vec())
}

fn read_uint(data: &[u8], at: usize) -> Result<u128, AbiError> {
    let word = slice(data, at, WORD)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(at));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize, AbiError> {
    usize::try_from(read_uint(data, at)?).map_err(|_| AbiError::Overflow(at))
}

fn slice(data: &[u8], at: usize, len: usize) -> Result<&[u8], AbiError> {
    at.checked_add(len)
        .and_then(|end| data.get(at..end))
        .ok_or(AbiError::Truncated { at, wanted: len })
}
