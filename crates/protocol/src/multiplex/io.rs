use std::io::{self, Read, Write};

use crate::envelope::{HEADER_LEN, MAX_PAYLOAD_LENGTH, MessageCode, MessageHeader};

use super::frame::MessageFrame;

/// Writes one multiplexed message to `writer`.
///
/// Payloads longer than [`MAX_PAYLOAD_LENGTH`] fail with
/// [`io::ErrorKind::InvalidInput`].
pub fn send_msg<W: Write + ?Sized>(
    writer: &mut W,
    code: MessageCode,
    payload: &[u8],
) -> io::Result<()> {
    if payload.len() > MAX_PAYLOAD_LENGTH as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "multiplexed payload length {} exceeds maximum {MAX_PAYLOAD_LENGTH}",
                payload.len()
            ),
        ));
    }
    let header = MessageHeader::new(code, payload.len() as u32)?;
    writer.write_all(&header.encode())?;
    writer.write_all(payload)
}

/// Reads the next multiplexed message from `reader`.
///
/// A clean end of stream before the header surfaces as
/// [`io::ErrorKind::UnexpectedEof`]. A header whose payload runs past the end
/// of the stream, or that carries an invalid tag, surfaces as
/// [`io::ErrorKind::InvalidData`].
pub fn recv_msg<R: Read + ?Sized>(reader: &mut R) -> io::Result<MessageFrame> {
    let header = read_header(reader)?;
    let mut payload = Vec::new();
    read_payload_into(reader, &mut payload, header.payload_len_usize())?;
    MessageFrame::new(header.code(), payload)
}

pub(super) fn read_header<R: Read + ?Sized>(reader: &mut R) -> io::Result<MessageHeader> {
    let mut header_bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut header_bytes)?;
    Ok(MessageHeader::decode(&header_bytes)?)
}

pub(super) fn read_payload_into<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
    len: usize,
) -> io::Result<()> {
    buffer.clear();
    buffer.resize(len, 0);

    let mut filled = 0;
    while filled < len {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => {
                buffer.truncate(filled);
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "multiplexed payload truncated: expected {len} bytes but received {filled}"
                    ),
                ));
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn send_then_receive_preserves_code_and_payload() {
        let mut wire = Vec::new();
        send_msg(&mut wire, MessageCode::Warning, b"careful").unwrap();
        assert_eq!(wire.len(), HEADER_LEN + 7);

        let frame = recv_msg(&mut Cursor::new(wire)).unwrap();
        assert_eq!(frame.code(), MessageCode::Warning);
        assert_eq!(frame.payload(), b"careful");
    }

    #[test]
    fn empty_stream_is_unexpected_eof() {
        let err = recv_msg(&mut Cursor::new(Vec::new())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn payload_past_end_of_stream_is_invalid_data() {
        let mut wire = MessageHeader::new(MessageCode::Data, 10)
            .unwrap()
            .encode()
            .to_vec();
        wire.extend_from_slice(b"short");

        let err = recv_msg(&mut Cursor::new(wire)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("expected 10 bytes but received 5"));
    }

    #[test]
    fn bad_tag_is_invalid_data() {
        let err = recv_msg(&mut Cursor::new(vec![1, 0, 0, 2, 0])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn frame_text_strips_newline() {
        let frame = MessageFrame::new(MessageCode::Info, b"note\n".to_vec()).unwrap();
        assert_eq!(frame.text(), "note");
    }
}
