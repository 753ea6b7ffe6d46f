use std::fmt;

/// A protocol version as advertised in the `@RSYNCD:` greeting.
///
/// Daemons announce `major.minor`; the binary shell handshake only carries
/// the major number, so [`ProtocolVersion::from_wire`] fills in a zero minor.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ProtocolVersion {
    major: u32,
    minor: u32,
}

impl ProtocolVersion {
    /// The version this client speaks and advertises by default.
    pub const CLIENT: Self = Self::new(27, 0);

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Creates a version from the 4-byte integer used by the shell handshake.
    ///
    /// Negative values cannot be a real version and clamp to zero.
    #[must_use]
    pub const fn from_wire(value: i32) -> Self {
        let major = if value < 0 { 0 } else { value as u32 };
        Self::new(major, 0)
    }

    /// Major protocol number.
    #[must_use]
    pub const fn major(self) -> u32 {
        self.major
    }

    /// Minor protocol number (sub-protocol).
    #[must_use]
    pub const fn minor(self) -> u32 {
        self.minor
    }

    /// Returns the major number as the 4-byte integer written on the shell path.
    #[must_use]
    pub const fn as_wire(self) -> i32 {
        self.major as i32
    }

    /// Protocols before 30 hash the seed after block data and only when non-zero.
    #[must_use]
    pub const fn uses_legacy_block_seed(self) -> bool {
        self.major < 30
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::CLIENT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
