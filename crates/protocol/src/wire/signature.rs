//! Sum heads and per-block signatures sent with each file request.

use std::io::{self, Read, Write};

use super::int::{read_int, write_int};

/// Largest block length a peer may announce.
pub const MAX_BLOCK_LEN: i32 = 1 << 29;

/// Largest strong-sum length (a full MD4 digest).
pub const MAX_STRONG_LEN: i32 = 16;

/// Header describing the block signature of a basis file.
///
/// An all-zero head means "no basis": the sender replies with the whole
/// file as literal data.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SumHead {
    /// Number of blocks.
    pub count: i32,
    /// Length of every block but possibly the last.
    pub block_len: i32,
    /// Bytes of strong sum sent per block.
    pub strong_len: i32,
    /// Length of the final short block, or 0 when the last block is full.
    pub remainder: i32,
}

impl SumHead {
    /// Head announcing that no basis file exists.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            count: 0,
            block_len: 0,
            strong_len: 0,
            remainder: 0,
        }
    }

    /// Writes the four integers of the head.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        write_int(writer, self.count)?;
        write_int(writer, self.block_len)?;
        write_int(writer, self.strong_len)?;
        write_int(writer, self.remainder)
    }

    /// Reads and validates a head.
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let head = Self {
            count: read_int(reader)?,
            block_len: read_int(reader)?,
            strong_len: read_int(reader)?,
            remainder: read_int(reader)?,
        };
        head.validate()?;
        Ok(head)
    }

    fn validate(&self) -> io::Result<()> {
        let valid = self.count >= 0
            && (0..=MAX_BLOCK_LEN).contains(&self.block_len)
            && (0..=MAX_STRONG_LEN).contains(&self.strong_len)
            && self.remainder >= 0
            && (self.remainder < self.block_len || self.remainder == 0);
        if valid {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid checksum header {self:?}"),
            ))
        }
    }
}

/// One block of a basis-file signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureBlock {
    /// Weak rolling checksum.
    pub rolling_sum: u32,
    /// Strong checksum, truncated to the head's `strong_len`.
    pub strong_sum: Vec<u8>,
}

/// Writes a head followed by its blocks.
///
/// Each strong sum must be exactly `head.strong_len` bytes.
pub fn write_signature<W: Write + ?Sized>(
    writer: &mut W,
    head: &SumHead,
    blocks: &[SignatureBlock],
) -> io::Result<()> {
    if blocks.len() != head.count as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "checksum header announces {} blocks but {} were supplied",
                head.count,
                blocks.len()
            ),
        ));
    }

    let mut encoded = Vec::with_capacity(16 + blocks.len() * (4 + head.strong_len as usize));
    head.write(&mut encoded)?;
    for block in blocks {
        if block.strong_sum.len() != head.strong_len as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "strong sum of {} bytes does not match header length {}",
                    block.strong_sum.len(),
                    head.strong_len
                ),
            ));
        }
        write_int(&mut encoded, block.rolling_sum as i32)?;
        encoded.extend_from_slice(&block.strong_sum);
    }
    writer.write_all(&encoded)
}

/// Reads a head and the blocks it announces.
pub fn read_signature<R: Read + ?Sized>(
    reader: &mut R,
) -> io::Result<(SumHead, Vec<SignatureBlock>)> {
    let head = SumHead::read(reader)?;
    let mut blocks = Vec::with_capacity((head.count as usize).min(1 << 16));
    for _ in 0..head.count {
        let rolling_sum = read_int(reader)? as u32;
        let mut strong_sum = vec![0u8; head.strong_len as usize];
        reader.read_exact(&mut strong_sum)?;
        blocks.push(SignatureBlock {
            rolling_sum,
            strong_sum,
        });
    }
    Ok((head, blocks))
}
