//! Integration tests for maildrop
//!
//! End-to-end scenarios over real sockets: a server reactor on an
//! ephemeral port, driven by blocking clients.

use std::io::Write;
use std::net::TcpStream;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use maildrop::network::{Client, Server, ShutdownHandle};
use maildrop::protocol::{wrap_session, wrap_type, CreateRequest, MessageKind};
use maildrop::Config;

/// Start a server on an ephemeral port, returning its config for
/// clients plus the means to stop it.
fn start_server() -> (Config, ShutdownHandle, JoinHandle<()>) {
    let config = Config::builder()
        .hostname("127.0.0.1")
        .port(0)
        .poll_timeout_ms(10)
        .build();

    let mut server = Server::new(config).expect("bind server");
    let addr = server.local_addr().expect("server address");
    let handle = server.shutdown_handle();

    let thread = thread::spawn(move || {
        server.run().expect("server run");
    });

    let client_config = Config::builder()
        .hostname("127.0.0.1")
        .port(addr.port())
        .build();

    (client_config, handle, thread)
}

/// Give the reactor a beat to drain a fire-and-forget request before
/// the same connection sends the next one.
fn settle() {
    thread::sleep(Duration::from_millis(100));
}

#[test]
fn test_end_to_end_scenario() {
    let (config, shutdown, server_thread) = start_server();

    // Alice and Bob each register their keys
    let mut alice = Client::connect(&config, "Alice").expect("connect Alice");
    let mut bob = Client::connect(&config, "Bob").expect("connect Bob");

    alice.register().expect("register Alice");
    bob.register().expect("register Bob");
    settle();

    // Bob logs in, fetches Alice's key, and sends her a message
    bob.login().expect("login Bob");
    assert!(bob.is_logged_in());

    let alice_key = bob.fetch_key("Alice").expect("fetch key");
    assert!(alice_key.is_some());
    assert!(bob.has_key_for("Alice"));

    bob.send_message("Alice", "Hello, Alice!").expect("send message");
    settle();

    // Alice logs in and reads exactly that message
    alice.login().expect("login Alice");

    let (messages, more) = alice.read_messages().expect("read messages");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_name, "Bob");
    assert_eq!(messages[0].text, "Hello, Alice!");
    assert!(!more);

    // A second read finds the mailbox empty
    let (messages, more) = alice.read_messages().expect("read again");
    assert!(messages.is_empty());
    assert!(!more);

    shutdown.stop();
    server_thread.join().expect("server thread");
}

#[test]
fn test_login_before_register_is_rejected() {
    let (config, shutdown, server_thread) = start_server();

    let mut mallory = Client::connect(&config, "Mallory").expect("connect");
    let result = mallory.login();
    assert!(result.is_err(), "login without registration must fail");
    assert!(!mallory.is_logged_in());

    shutdown.stop();
    server_thread.join().expect("server thread");
}

#[test]
fn test_unauthenticated_create_never_lands_in_a_mailbox() {
    let (config, shutdown, server_thread) = start_server();

    let mut alice = Client::connect(&config, "Alice").expect("connect Alice");
    alice.register().expect("register Alice");
    settle();

    // A raw frame with no session token, bypassing the client's own
    // login check
    let request = CreateRequest::new("Alice", b"forged message".to_vec())
        .to_bytes()
        .expect("encode create");
    let frame = wrap_type(
        MessageKind::Create,
        &wrap_session(None, &request).expect("wrap session"),
    )
    .expect("wrap type");

    let mut raw = TcpStream::connect(("127.0.0.1", config.port)).expect("raw connect");
    raw.write_all(&frame).expect("send forged frame");
    settle();

    alice.login().expect("login Alice");
    let (messages, more) = alice.read_messages().expect("read messages");
    assert!(messages.is_empty());
    assert!(!more);

    shutdown.stop();
    server_thread.join().expect("server thread");
}

#[test]
fn test_server_survives_garbage_frames() {
    let (config, shutdown, server_thread) = start_server();

    // Garbage with a bad magic number must be discarded, not crash the
    // loop or poison other connections
    let mut raw = TcpStream::connect(("127.0.0.1", config.port)).expect("raw connect");
    raw.write_all(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02])
        .expect("send garbage");
    settle();

    let mut alice = Client::connect(&config, "Alice").expect("connect Alice");
    alice.register().expect("register Alice");
    settle();
    alice.login().expect("login still works after garbage");

    shutdown.stop();
    server_thread.join().expect("server thread");
}
