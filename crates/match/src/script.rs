use std::io::{self, Write};

use crate::reference::ReferenceSource;

const COPY_BUFFER_LEN: usize = 64 * 1024;

/// One step of a delta script.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeltaInstruction {
    /// Copy the reference bytes in `start..end`.
    Copy {
        /// First reference byte to copy.
        start: u64,
        /// One past the last reference byte to copy.
        end: u64,
    },
    /// Emit the bytes verbatim.
    Literal(Vec<u8>),
}

impl DeltaInstruction {
    /// Number of output bytes this instruction produces.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Copy { start, end } => end - start,
            Self::Literal(bytes) => bytes.len() as u64,
        }
    }

    /// Returns `true` when the instruction produces no output.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the bytes this instruction stands for into `out`.
    ///
    /// Returns the number of bytes written.
    pub fn apply<S, W>(&self, reference: &S, out: &mut W) -> io::Result<u64>
    where
        S: ReferenceSource + ?Sized,
        W: Write + ?Sized,
    {
        match self {
            Self::Literal(bytes) => {
                out.write_all(bytes)?;
                Ok(bytes.len() as u64)
            }
            Self::Copy { start, end } => {
                if end < start || *end > reference.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "copy of {start}..{end} falls outside reference of {} bytes",
                            reference.len()
                        ),
                    ));
                }
                let mut buf = vec![0u8; COPY_BUFFER_LEN.min((end - start) as usize)];
                let mut offset = *start;
                while offset < *end {
                    let chunk = ((end - offset) as usize).min(buf.len());
                    reference.read_at(offset, &mut buf[..chunk])?;
                    out.write_all(&buf[..chunk])?;
                    offset += chunk as u64;
                }
                Ok(end - start)
            }
        }
    }
}

/// An ordered list of copy and literal instructions describing new data in
/// terms of a reference.
///
/// Adjacent instructions of the same kind are coalesced as they are pushed:
/// contiguous copies become one range and consecutive literals one run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeltaScript {
    instructions: Vec<DeltaInstruction>,
}

impl DeltaScript {
    /// Creates an empty script.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    /// Appends a copy of `start..end`, extending the previous copy when the
    /// ranges touch.
    pub fn push_copy(&mut self, start: u64, end: u64) {
        if start >= end {
            return;
        }
        if let Some(DeltaInstruction::Copy { end: last_end, .. }) = self.instructions.last_mut() {
            if *last_end == start {
                *last_end = end;
                return;
            }
        }
        self.instructions.push(DeltaInstruction::Copy { start, end });
    }

    /// Appends literal bytes, extending the previous literal run.
    pub fn push_literal(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(DeltaInstruction::Literal(run)) = self.instructions.last_mut() {
            run.extend_from_slice(bytes);
            return;
        }
        self.instructions.push(DeltaInstruction::Literal(bytes.to_vec()));
    }

    /// Instructions in order.
    #[must_use]
    pub fn instructions(&self) -> &[DeltaInstruction] {
        &self.instructions
    }

    /// Consumes the script, returning its instructions.
    #[must_use]
    pub fn into_instructions(self) -> Vec<DeltaInstruction> {
        self.instructions
    }

    /// Bytes produced by copy instructions.
    #[must_use]
    pub fn copied_bytes(&self) -> u64 {
        self.instructions
            .iter()
            .filter(|ins| matches!(ins, DeltaInstruction::Copy { .. }))
            .map(DeltaInstruction::len)
            .sum()
    }

    /// Bytes carried as literals.
    #[must_use]
    pub fn literal_bytes(&self) -> u64 {
        self.instructions
            .iter()
            .filter(|ins| matches!(ins, DeltaInstruction::Literal(_)))
            .map(DeltaInstruction::len)
            .sum()
    }

    /// Length of the data the script rebuilds.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.instructions.iter().map(DeltaInstruction::len).sum()
    }

    /// Returns `true` for a script with no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Rebuilds the new data by applying every instruction in order.
    pub fn replay<S, W>(&self, reference: &S, out: &mut W) -> io::Result<u64>
    where
        S: ReferenceSource + ?Sized,
        W: Write + ?Sized,
    {
        let mut written = 0;
        for instruction in &self.instructions {
            written += instruction.apply(reference, out)?;
        }
        Ok(written)
    }
}

impl FromIterator<DeltaInstruction> for DeltaScript {
    fn from_iter<I: IntoIterator<Item = DeltaInstruction>>(iter: I) -> Self {
        let mut script = Self::new();
        for instruction in iter {
            match instruction {
                DeltaInstruction::Copy { start, end } => script.push_copy(start, end),
                DeltaInstruction::Literal(bytes) => script.push_literal(&bytes),
            }
        }
        script
    }
}
