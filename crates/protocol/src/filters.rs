//! Exclusion list wire codec.
//!
//! Each pattern is written as a 4-byte little-endian length followed by the
//! raw pattern bytes. A zero length terminates the list, so an empty list is
//! the four zero bytes alone.

use std::io::{self, Read, Write};

use crate::wire::{read_int, write_int};

/// Upper bound accepted for a single received pattern.
const MAX_PATTERN_LEN: usize = 4096;

/// Ordered exclusion patterns sent to the server after authentication.
///
/// Order is preserved exactly as given; first-match semantics are the
/// server's business.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExclusionList {
    patterns: Vec<String>,
}

impl ExclusionList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Appends a pattern.
    pub fn push(&mut self, pattern: impl Into<String>) {
        self.patterns.push(pattern.into());
    }

    /// Patterns in transmission order.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` when no patterns are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterates over the patterns in order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.patterns.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ExclusionList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Writes `list` followed by the zero-length terminator.
///
/// An empty pattern cannot be represented (its length would read as the
/// terminator) and fails with [`io::ErrorKind::InvalidInput`].
pub fn write_exclusion_list<W: Write + ?Sized>(
    writer: &mut W,
    list: &ExclusionList,
) -> io::Result<()> {
    let mut encoded = Vec::new();
    for pattern in list {
        if pattern.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "exclusion patterns must not be empty",
            ));
        }
        let len = i32::try_from(pattern.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("exclusion pattern of {} bytes is too long", pattern.len()),
            )
        })?;
        write_int(&mut encoded, len)?;
        encoded.extend_from_slice(pattern.as_bytes());
    }
    write_int(&mut encoded, 0)?;
    writer.write_all(&encoded)
}

/// Reads an exclusion list up to and including its terminator.
///
/// This is the server-side inverse of [`write_exclusion_list`]; the client
/// itself never receives one.
pub fn read_exclusion_list<R: Read + ?Sized>(reader: &mut R) -> io::Result<ExclusionList> {
    let mut list = ExclusionList::new();
    loop {
        let len = read_int(reader)?;
        if len == 0 {
            return Ok(list);
        }
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= MAX_PATTERN_LEN)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid exclusion pattern length {len}"),
                )
            })?;
        let mut bytes = vec![0u8; len];
        reader.read_exact(&mut bytes)?;
        let pattern = String::from_utf8(bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        list.push(pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn empty_list_is_single_terminator() {
        let mut wire = Vec::new();
        write_exclusion_list(&mut wire, &ExclusionList::new()).unwrap();
        assert_eq!(wire, [0, 0, 0, 0]);
    }

    #[test]
    fn patterns_are_length_prefixed_in_order() {
        let list: ExclusionList = ["*.o", "tmp/"].into_iter().collect();
        let mut wire = Vec::new();
        write_exclusion_list(&mut wire, &list).unwrap();
        assert_eq!(
            wire,
            [
                3, 0, 0, 0, b'*', b'.', b'o', //
                4, 0, 0, 0, b't', b'm', b'p', b'/', //
                0, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn empty_pattern_is_rejected_before_writing() {
        let list: ExclusionList = ["a", ""].into_iter().collect();
        let mut wire = Vec::new();
        let err = write_exclusion_list(&mut wire, &list).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(wire.is_empty());
    }

    #[test]
    fn negative_length_is_invalid_data() {
        let err = read_exclusion_list(&mut Cursor::new((-3i32).to_le_bytes())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    proptest! {
        #[test]
        fn round_trip_preserves_order(patterns in proptest::collection::vec("[a-z*?/.]{1,24}", 0..16)) {
            let list: ExclusionList = patterns.iter().cloned().collect();
            let mut wire = Vec::new();
            write_exclusion_list(&mut wire, &list).unwrap();

            let mut cursor = Cursor::new(wire);
            let decoded = read_exclusion_list(&mut cursor).unwrap();
            prop_assert_eq!(decoded.patterns(), patterns.as_slice());
            prop_assert_eq!(cursor.position() as usize, cursor.get_ref().len());
        }
    }
}
