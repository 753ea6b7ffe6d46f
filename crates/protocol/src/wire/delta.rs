//! Delta token stream sent by the sender for each requested file.
//!
//! A positive token `n` is followed by `n` literal bytes, a negative token
//! `-(i + 1)` copies basis block `i`, and zero ends the file.

use std::io::{self, Read, Write};

use super::int::{read_int, write_int};

/// Largest literal run a sender emits in one token.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// One decoded token header. Literal bytes are left in the stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeltaToken {
    /// End of this file's data.
    End,
    /// `len` literal bytes follow.
    Literal(usize),
    /// Copy basis block `index`.
    Block(u32),
}

/// Reads the next token header.
pub fn read_token<R: Read + ?Sized>(reader: &mut R) -> io::Result<DeltaToken> {
    let value = read_int(reader)?;
    Ok(match value {
        0 => DeltaToken::End,
        n if n > 0 => DeltaToken::Literal(n as usize),
        n => DeltaToken::Block((-(i64::from(n) + 1)) as u32),
    })
}

/// Writes `data` as one or more literal tokens of at most [`CHUNK_SIZE`] bytes.
pub fn write_token_literal<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    for chunk in data.chunks(CHUNK_SIZE) {
        write_int(writer, chunk.len() as i32)?;
        writer.write_all(chunk)?;
    }
    Ok(())
}

/// Writes a block-copy token.
pub fn write_token_block<W: Write + ?Sized>(writer: &mut W, index: u32) -> io::Result<()> {
    let token = i32::try_from(i64::from(index) + 1)
        .map(|n| -n)
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block index {index} cannot be encoded"),
            )
        })?;
    write_int(writer, token)
}

/// Writes the end-of-file token.
pub fn write_token_end<W: Write + ?Sized>(writer: &mut W) -> io::Result<()> {
    write_int(writer, 0)
}
