//! # Key Layout
//!
//! Every persisted key starts with a short prefix naming its table.
//! Height index keys are fixed width so that byte order equals
//! `(height, signature)` order, reversed for the descending table.

use shared_types::{BlockSignature, SIGNATURE_LENGTH};

const HEIGHT_LENGTH: usize = 8;

/// Table prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Block data: `b:{signature}` -> Block
    Block,
    /// Ascending index: `ha:{height}{signature}` -> empty
    HeightAscending,
    /// Descending index: `hd:{!height}{!signature}` -> empty
    HeightDescending,
    /// Metadata cells: `m:{name}`
    Metadata,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Block => b"b:",
            KeyPrefix::HeightAscending => b"ha:",
            KeyPrefix::HeightDescending => b"hd:",
            KeyPrefix::Metadata => b"m:",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KeyPrefix::Block => "b:",
            KeyPrefix::HeightAscending => "ha:",
            KeyPrefix::HeightDescending => "hd:",
            KeyPrefix::Metadata => "m:",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    pub fn block_key(signature: &BlockSignature) -> Vec<u8> {
        KeyPrefix::Block.key(signature.as_bytes())
    }

    pub fn ascending_key(height: u64, signature: &BlockSignature) -> Vec<u8> {
        let mut suffix = Vec::with_capacity(HEIGHT_LENGTH + SIGNATURE_LENGTH);
        suffix.extend_from_slice(&height.to_be_bytes());
        suffix.extend_from_slice(signature.as_bytes());
        KeyPrefix::HeightAscending.key(&suffix)
    }

    pub fn descending_key(height: u64, signature: &BlockSignature) -> Vec<u8> {
        let mut suffix = Vec::with_capacity(HEIGHT_LENGTH + SIGNATURE_LENGTH);
        suffix.extend_from_slice(&(!height).to_be_bytes());
        suffix.extend(signature.as_bytes().iter().map(|b| !b));
        KeyPrefix::HeightDescending.key(&suffix)
    }

    /// Decode an ascending index key.
    pub fn parse_ascending(key: &[u8]) -> Option<(u64, BlockSignature)> {
        let (height, signature) = split_index_key(KeyPrefix::HeightAscending, key)?;
        Some((u64::from_be_bytes(height), BlockSignature(signature)))
    }

    /// Decode a descending index key.
    pub fn parse_descending(key: &[u8]) -> Option<(u64, BlockSignature)> {
        let (height, mut signature) = split_index_key(KeyPrefix::HeightDescending, key)?;
        signature.iter_mut().for_each(|b| *b = !*b);
        Some((!u64::from_be_bytes(height), BlockSignature(signature)))
    }

    /// Tip pointer cell.
    pub fn last_block_key() -> Vec<u8> {
        KeyPrefix::Metadata.key(b"last")
    }

    /// Crash-detection flag cell.
    pub fn processing_key() -> Vec<u8> {
        KeyPrefix::Metadata.key(b"processing")
    }
}

fn split_index_key(
    prefix: KeyPrefix,
    key: &[u8],
) -> Option<([u8; HEIGHT_LENGTH], [u8; SIGNATURE_LENGTH])> {
    let body = key.strip_prefix(prefix.as_bytes())?;
    if body.len() != HEIGHT_LENGTH + SIGNATURE_LENGTH {
        return None;
    }
    let (height, signature) = body.split_at(HEIGHT_LENGTH);
    Some((height.try_into().ok()?, signature.try_into().ok()?))
}
