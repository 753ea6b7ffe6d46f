use thiserror::Error;

/// Errors that can occur while updating the rolling checksum state.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RollingError {
    /// The checksum window is empty, preventing the rolling update from making progress.
    #[error("rolling checksum requires a non-empty window")]
    EmptyWindow,
    /// The checksum window length exceeds what can be represented in 32 bits.
    #[error("rolling checksum window of {len} bytes exceeds 32-bit limit")]
    WindowTooLarge {
        /// Number of bytes present in the rolling window when the error was raised.
        len: usize,
    },
}

/// Rolling checksum used by rsync for weak block matching (often called `rsum`).
///
/// `s1` is the running byte sum and `s2` the running sum of `s1`, so that `s2`
/// weights each byte by its distance from the end of the window. Both
/// accumulators use wrapping 32-bit arithmetic; the packed value keeps the low
/// 16 bits of each. Bytes are sign-extended before they are summed, exactly as
/// upstream's `schar` buffers are, so the values agree with what a real sender
/// computes over the same data.
#[doc(alias = "rsum")]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    len: usize,
}

impl RollingChecksum {
    /// Creates a new rolling checksum with zeroed state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            s1: 0,
            s2: 0,
            len: 0,
        }
    }

    /// Computes the packed checksum of `block` from scratch.
    #[must_use]
    pub fn of(block: &[u8]) -> u32 {
        let mut checksum = Self::new();
        checksum.update(block);
        checksum.value()
    }

    /// Resets the checksum back to its initial state.
    pub fn reset(&mut self) {
        self.s1 = 0;
        self.s2 = 0;
        self.len = 0;
    }

    /// Returns the number of bytes currently inside the window.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bytes have been observed yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `chunk` to the window.
    pub fn update(&mut self, chunk: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;

        for &byte in chunk {
            s1 = s1.wrapping_add(widen(byte));
            s2 = s2.wrapping_add(s1);
        }

        self.s1 = s1;
        self.s2 = s2;
        self.len = self.len.saturating_add(chunk.len());
    }

    /// Clears the state and updates with `block`.
    pub fn update_from_block(&mut self, block: &[u8]) {
        self.reset();
        self.update(block);
    }

    /// Slides the window by one byte: removes `outgoing` from the front and
    /// appends `incoming` at the back. The window length is unchanged.
    #[inline]
    pub fn roll(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        self.remove_front(outgoing)?;
        self.s1 = self.s1.wrapping_add(widen(incoming));
        self.s2 = self.s2.wrapping_add(self.s1);
        Ok(())
    }

    /// Removes `outgoing` from the front of the window without appending a
    /// replacement, shrinking the window by one byte.
    ///
    /// Used once the window reaches the end of the stream and can only shrink.
    #[inline]
    pub fn roll_out(&mut self, outgoing: u8) -> Result<(), RollingError> {
        self.remove_front(outgoing)?;
        self.len -= 1;
        Ok(())
    }

    #[inline]
    fn remove_front(&mut self, outgoing: u8) -> Result<(), RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        let window_len =
            u32::try_from(self.len).map_err(|_| RollingError::WindowTooLarge { len: self.len })?;

        let out = widen(outgoing);
        self.s1 = self.s1.wrapping_sub(out);
        self.s2 = self.s2.wrapping_sub(window_len.wrapping_mul(out));
        Ok(())
    }

    /// Returns the rolling checksum value in rsync's packed 32-bit representation.
    #[must_use]
    pub const fn value(&self) -> u32 {
        (self.s1 & 0xffff) | (self.s2 << 16)
    }
}

#[inline]
const fn widen(byte: u8) -> u32 {
    byte as i8 as i32 as u32
}
