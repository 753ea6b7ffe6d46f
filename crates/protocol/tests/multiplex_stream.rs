//! Demultiplexing across frame boundaries with interleaved out-of-band frames.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use protocol::{MessageCode, MplexReader, recv_msg, send_msg};

type Seen = Arc<Mutex<Vec<(MessageCode, Vec<u8>)>>>;

fn recorded_reader(wire: Vec<u8>) -> (MplexReader<Cursor<Vec<u8>>>, Seen) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut reader = MplexReader::new(Cursor::new(wire));
    reader.set_message_handler(move |code, payload| {
        sink.lock().unwrap().push((code, payload.to_vec()));
    });
    (reader, seen)
}

#[test]
fn data_error_data_yields_fifteen_application_bytes() {
    let mut wire = Vec::new();
    send_msg(&mut wire, MessageCode::Data, b"0123456789").unwrap();
    send_msg(&mut wire, MessageCode::Error, b"bad").unwrap();
    send_msg(&mut wire, MessageCode::Data, b"abcde").unwrap();

    let (mut reader, seen) = recorded_reader(wire);
    let mut out = [0u8; 15];
    reader.read_exact(&mut out).unwrap();

    assert_eq!(&out, b"0123456789abcde");
    assert_eq!(*seen.lock().unwrap(), vec![(MessageCode::Error, b"bad".to_vec())]);
}

#[test]
fn reads_of_integers_straddle_frames() {
    let value = 0x1122_3344_i32.to_le_bytes();
    let mut wire = Vec::new();
    send_msg(&mut wire, MessageCode::Data, &value[..1]).unwrap();
    send_msg(&mut wire, MessageCode::Info, b"progress").unwrap();
    send_msg(&mut wire, MessageCode::Data, &value[1..]).unwrap();

    let (mut reader, seen) = recorded_reader(wire);
    assert_eq!(protocol::wire::read_int(&mut reader).unwrap(), 0x1122_3344);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn truncated_payload_is_a_protocol_error() {
    let mut wire = Vec::new();
    send_msg(&mut wire, MessageCode::Data, b"complete").unwrap();
    wire.truncate(wire.len() - 3);

    let (mut reader, _) = recorded_reader(wire);
    let err = reader.read(&mut [0u8; 8]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn raw_frames_round_trip_through_recv_msg() {
    let mut wire = Vec::new();
    for code in [MessageCode::Data, MessageCode::Warning, MessageCode::Log] {
        send_msg(&mut wire, code, code.as_u8().to_string().as_bytes()).unwrap();
    }

    let mut cursor = Cursor::new(wire);
    let codes: Vec<_> = (0..3).map(|_| recv_msg(&mut cursor).unwrap().code()).collect();
    assert_eq!(codes, [MessageCode::Data, MessageCode::Warning, MessageCode::Log]);
}
