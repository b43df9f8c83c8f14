//! Keys, values and comparators for disk-backed indexes.
//!
//! Index pages store keys and values as fixed-width byte encodings so slot
//! offsets can be computed arithmetically. [`Storable`] is that codec
//! contract; [`KeyComparator`] supplies the ordering (used only for
//! equality by the hash index); [`KeyHasher`] picks the bucket.

use std::cmp::Ordering;
use std::fmt;

use crate::common::{PageId, Rid};

/// Fixed-width little-endian encoding into index page slots.
///
/// `ENCODED_LEN` bytes, always: slot N of a block page lives at a computed
/// offset, so variable-width encodings are not representable here.
pub trait Storable: Copy {
    /// Encoded width in bytes.
    const ENCODED_LEN: usize;

    /// Write the encoding into `buf` (exactly `ENCODED_LEN` bytes).
    fn encode(&self, buf: &mut [u8]);

    /// Read a value back from `buf` (exactly `ENCODED_LEN` bytes).
    fn decode(buf: &[u8]) -> Self;
}

macro_rules! storable_int {
    ($($t:ty),*) => {
        $(
            impl Storable for $t {
                const ENCODED_LEN: usize = std::mem::size_of::<$t>();

                fn encode(&self, buf: &mut [u8]) {
                    buf[..Self::ENCODED_LEN].copy_from_slice(&self.to_le_bytes());
                }

                fn decode(buf: &[u8]) -> Self {
                    <$t>::from_le_bytes(buf[..Self::ENCODED_LEN].try_into().unwrap())
                }
            }
        )*
    };
}

storable_int!(i32, u32, i64, u64);

impl Storable for Rid {
    const ENCODED_LEN: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.page_id.0.to_le_bytes());
        buf[4..8].copy_from_slice(&self.slot.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        let page_id = PageId::new(u32::from_le_bytes(buf[..4].try_into().unwrap()));
        let slot = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        Rid::new(page_id, slot)
    }
}

/// A fixed-width opaque key.
///
/// Shorter source keys are zero-padded on the right, so the padded bytes
/// do not disturb lexicographic comparisons. Longer keys are truncated by
/// the caller's encoding, not here.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenericKey<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> GenericKey<N> {
    /// Build a key from at most `N` source bytes, zero-padding the rest.
    ///
    /// # Panics
    /// Panics if `bytes.len() > N`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() <= N, "key longer than declared width");
        let mut data = [0u8; N];
        data[..bytes.len()].copy_from_slice(bytes);
        Self { data }
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<const N: usize> Storable for GenericKey<N> {
    const ENCODED_LEN: usize = N;

    fn encode(&self, buf: &mut [u8]) {
        buf[..N].copy_from_slice(&self.data);
    }

    fn decode(buf: &[u8]) -> Self {
        let mut data = [0u8; N];
        data.copy_from_slice(&buf[..N]);
        Self { data }
    }
}

impl<const N: usize> fmt::Debug for GenericKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericKey<{}>({:02x?})", N, &self.data)
    }
}

/// Total order over keys.
///
/// The hash index only ever asks "equal or not", but the comparator
/// contract is a full ordering so the same collaborator serves ordered
/// indexes too.
pub trait KeyComparator<K>: Clone {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Lexicographic byte comparison for fixed-width keys.
#[derive(Clone, Copy, Default)]
pub struct GenericComparator<const N: usize>;

impl<const N: usize> KeyComparator<GenericKey<N>> for GenericComparator<N> {
    fn compare(&self, a: &GenericKey<N>, b: &GenericKey<N>) -> Ordering {
        a.as_bytes().cmp(b.as_bytes())
    }
}

/// Comparator for any naturally ordered key type (e.g. integer test keys).
#[derive(Clone, Copy, Default)]
pub struct OrdComparator;

impl<K: Ord> KeyComparator<K> for OrdComparator {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Maps a key to a bucket-selection hash.
///
/// Pluggable so tests can force collisions; the persistent default must be
/// stable across processes, which rules out `std`'s randomized hashers.
pub trait KeyHasher<K>: Clone {
    fn hash_key(&self, key: &K) -> u64;
}

/// Default hasher: CRC32 over the encoded key bytes.
///
/// Stable across runs and platforms, which matters because bucket choice is
/// baked into the on-disk table.
#[derive(Clone, Copy, Default)]
pub struct Crc32Hasher;

impl<K: Storable> KeyHasher<K> for Crc32Hasher {
    fn hash_key(&self, key: &K) -> u64 {
        let mut buf = vec![0u8; K::ENCODED_LEN];
        key.encode(&mut buf);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buf);
        u64::from(hasher.finalize())
    }
}
