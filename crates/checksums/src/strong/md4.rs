use digest::Digest;
use std::fmt;

/// Length in bytes of an MD4 digest.
pub const MD4_DIGEST_LEN: usize = 16;

/// Where the session seed enters the digest.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SeedOrder {
    /// Seed bytes are hashed before the data.
    #[default]
    Prefix,
    /// Seed bytes are hashed after the data (legacy block sums).
    Suffix,
}

/// Seed configuration for a seeded MD4 computation.
///
/// The seed is always hashed as 4 little-endian bytes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Md4Seed {
    /// Seed value to mix into the hash.
    pub value: Option<i32>,
    /// Whether the seed is hashed before or after the data.
    pub order: SeedOrder,
}

impl Md4Seed {
    /// Creates a seed configuration with no seed value.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            value: None,
            order: SeedOrder::Prefix,
        }
    }

    /// Seed hashed before the data, regardless of its value.
    ///
    /// This is the ordering used for whole-file sums.
    #[must_use]
    pub const fn prefix(value: i32) -> Self {
        Self {
            value: Some(value),
            order: SeedOrder::Prefix,
        }
    }

    /// Seed hashed after the data, skipped entirely when zero.
    ///
    /// Protocol versions before 30 compute block sums this way.
    #[must_use]
    pub const fn legacy(value: i32) -> Self {
        Self {
            value: if value == 0 { None } else { Some(value) },
            order: SeedOrder::Suffix,
        }
    }

    /// Builds a configuration for an explicit ordering.
    #[must_use]
    pub const fn with_order(value: i32, order: SeedOrder) -> Self {
        match order {
            SeedOrder::Prefix => Self::prefix(value),
            SeedOrder::Suffix => Self::legacy(value),
        }
    }
}

/// Streaming MD4 hasher with optional seeding.
#[derive(Clone)]
pub struct Md4 {
    inner: md4::Md4,
    pending_seed: Option<i32>,
}

impl fmt::Debug for Md4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Md4")
            .field("pending_seed", &self.pending_seed)
            .finish_non_exhaustive()
    }
}

impl Default for Md4 {
    fn default() -> Self {
        Self::new()
    }
}

impl Md4 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: md4::Md4::new(),
            pending_seed: None,
        }
    }

    /// Creates a hasher that mixes in `seed` according to its ordering.
    #[must_use]
    pub fn with_seed(seed: Md4Seed) -> Self {
        let mut hasher = Self::new();
        if let Some(value) = seed.value {
            match seed.order {
                SeedOrder::Prefix => hasher.update(&value.to_le_bytes()),
                SeedOrder::Suffix => hasher.pending_seed = Some(value),
            }
        }
        hasher
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest and returns the 128-bit MD4 output.
    #[must_use]
    pub fn finalize(mut self) -> [u8; MD4_DIGEST_LEN] {
        if let Some(seed) = self.pending_seed.take() {
            self.inner.update(seed.to_le_bytes());
        }
        self.inner.finalize().into()
    }

    /// Computes the unseeded MD4 digest for `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; MD4_DIGEST_LEN] {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Computes the seeded MD4 digest for `data` in one shot.
    #[must_use]
    pub fn digest_with_seed(seed: Md4Seed, data: &[u8]) -> [u8; MD4_DIGEST_LEN] {
        let mut hasher = Self::with_seed(seed);
        hasher.update(data);
        hasher.finalize()
    }
}
