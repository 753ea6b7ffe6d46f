//! Daemon handshakes driven by a scripted byte stream.

use std::io::Cursor;

use protocol::wire::write_int;
use rsync_core::{
    ClientAuth, ClientError, ClientOptions, DEFAULT_SERVER_ARGS, ReceiverState, handshake_daemon,
    respond,
};

fn script(lines: &str, seed: i32) -> Cursor<Vec<u8>> {
    let mut bytes = lines.as_bytes().to_vec();
    write_int(&mut bytes, seed).unwrap();
    Cursor::new(bytes)
}

fn sent_lines(sent: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(sent).lines().map(str::to_owned).collect()
}

#[test]
fn answers_every_challenge_in_order() {
    let server = script(
        "@RSYNCD: 27\n@RSYNCD: AUTHREQD first\n@RSYNCD: AUTHREQD second\n@RSYNCD: OK\n",
        42,
    );
    let mut sent = Vec::new();
    let options = ClientOptions::new().with_auth(ClientAuth::new("joe", "hunter2"));

    let receiver = handshake_daemon((server, &mut sent), "private", "/docs", options).unwrap();
    assert_eq!(receiver.state(), ReceiverState::ExclusionsSent);
    assert_eq!(receiver.session().seed(), 42);
    assert_eq!(receiver.session().module(), "private");
    drop(receiver);

    let lines = sent_lines(&sent);
    assert_eq!(lines[0], "@RSYNCD: 27.0");
    assert_eq!(lines[1], "private");
    assert_eq!(lines[2], format!("joe {}", respond("hunter2", "first")));
    assert_eq!(lines[3], format!("joe {}", respond("hunter2", "second")));
    assert_eq!(lines[4..4 + DEFAULT_SERVER_ARGS.len()], DEFAULT_SERVER_ARGS);
    assert_eq!(lines[4 + DEFAULT_SERVER_ARGS.len()], "private/docs");
    assert_eq!(lines[5 + DEFAULT_SERVER_ARGS.len()], "");
    // Empty exclusion list: a single zero int.
    assert!(sent.ends_with(b"\n\n\0\0\0\0"));
}

#[test]
fn challenge_without_credentials_fails() {
    let server = script("@RSYNCD: 27\n@RSYNCD: AUTHREQD abc\n", 0);
    let err = handshake_daemon((server, Vec::new()), "private", "", ClientOptions::new())
        .unwrap_err();
    assert!(matches!(err, ClientError::AuthRequired));
}

#[test]
fn exit_before_ok_is_a_daemon_error() {
    let server = script("@RSYNCD: 27\nmotd line\n@RSYNCD: EXIT\n", 0);
    let err = handshake_daemon((server, Vec::new()), "gone", "", ClientOptions::new())
        .unwrap_err();
    assert!(matches!(err, ClientError::Daemon(_)));
}

#[test]
fn unparsable_greeting_falls_back_to_local_version() {
    let server = script("hello there\n@RSYNCD: OK\n", 7);
    let receiver =
        handshake_daemon((server, Vec::new()), "m", "", ClientOptions::new()).unwrap();
    assert_eq!(
        receiver.session().remote_version(),
        receiver.session().local_version()
    );
}
