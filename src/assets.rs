//! Content-addressed storage for encoded audio.
//!
//! Every successful apply stores exactly one new asset. Assets are never
//! removed while history can still point at them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 of the encoded bytes, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn of(bytes: &[u8]) -> Self {
        AssetRef(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where encoded audio lives between applies.
pub trait AssetStore {
    /// Store bytes and return their reference. Storing identical bytes twice
    /// yields the same reference.
    fn put(&mut self, bytes: Vec<u8>) -> AssetRef;
    fn get(&self, asset: &AssetRef) -> Option<Arc<[u8]>>;
    fn contains(&self, asset: &AssetRef) -> bool {
        self.get(asset).is_some()
    }
}

/// In-process store.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssetStore {
    assets: HashMap<AssetRef, Arc<[u8]>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetStore for MemoryAssetStore {
    fn put(&mut self, bytes: Vec<u8>) -> AssetRef {
        let asset = AssetRef::of(&bytes);
        self.assets.entry(asset.clone()).or_insert_with(|| bytes.into());
        asset
    }

    fn get(&self, asset: &AssetRef) -> Option<Arc<[u8]>> {
        self.assets.get(asset).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_sha256_hex() {
        let r = AssetRef::of(b"abc");
        assert_eq!(
            r.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn put_then_get() {
        let mut store = MemoryAssetStore::new();
        let r = store.put(vec![1, 2, 3]);
        assert_eq!(&*store.get(&r).unwrap(), &[1, 2, 3]);
        assert!(store.contains(&r));
        assert!(!store.contains(&AssetRef::of(b"other")));
    }

    #[test]
    fn identical_bytes_share_one_asset() {
        let mut store = MemoryAssetStore::new();
        let a = store.put(vec![9; 16]);
        let b = store.put(vec![9; 16]);
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }
}
