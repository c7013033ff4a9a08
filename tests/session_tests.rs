//! Session Engine Tests
//!
//! State-machine tests for the server's identity, session, and mailbox
//! tables, driven through the same frame pipeline the reactor uses.

use maildrop::crypto::{KeyPair, SessionToken};
use maildrop::protocol::{
    unwrap_type, wrap_session, wrap_type, CreateRequest, KeyRequest, KeyResponse, LoginRequest,
    LoginResponse, MessageKind, ReadRequest, ReadResponse, RegistrationRequest,
};
use maildrop::ServerState;

/// Build a complete request frame: type wrapper + session wrapper
fn frame(kind: MessageKind, token: Option<&SessionToken>, inner: &[u8]) -> Vec<u8> {
    wrap_type(kind, &wrap_session(token, inner).unwrap()).unwrap()
}

/// Register a fresh key pair under the given name
fn register(state: &mut ServerState, name: &str) -> KeyPair {
    let key_pair = KeyPair::generate().unwrap();
    let request = RegistrationRequest::new(name, key_pair.public_key().clone())
        .to_bytes()
        .unwrap();

    let response = state
        .process_frame(&frame(MessageKind::Register, None, &request))
        .unwrap();
    assert!(response.is_none(), "REGISTER must not produce a response");

    key_pair
}

/// Log in and recover the session token with the private key
fn login(state: &mut ServerState, name: &str, key_pair: &KeyPair) -> SessionToken {
    let request = LoginRequest::new(name).to_bytes().unwrap();

    let response = state
        .process_frame(&frame(MessageKind::Login, None, &request))
        .unwrap()
        .expect("LOGIN must produce a response");

    let (kind, payload) = unwrap_type(&response).unwrap();
    assert_eq!(kind, MessageKind::LoginResponse);

    let login_response = LoginResponse::decode(payload).unwrap();
    assert!(!login_response.encrypted_token.is_empty());

    let token_bytes = key_pair.decrypt(&login_response.encrypted_token).unwrap();
    SessionToken::from_bytes(&token_bytes).unwrap()
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_registration_stores_key() {
    let mut state = ServerState::new();
    let key_pair = register(&mut state, "Alice");

    assert_eq!(state.registered_key("Alice"), Some(key_pair.public_key()));
}

#[test]
fn test_registration_is_first_writer_wins() {
    let mut state = ServerState::new();
    let first = register(&mut state, "Alice");

    // A second registration under the same name must not replace the key
    let second = KeyPair::generate().unwrap();
    let request = RegistrationRequest::new("Alice", second.public_key().clone())
        .to_bytes()
        .unwrap();
    state
        .process_frame(&frame(MessageKind::Register, None, &request))
        .unwrap();

    assert_eq!(state.registered_key("Alice"), Some(first.public_key()));
}

// =============================================================================
// Login Tests
// =============================================================================

#[test]
fn test_login_unknown_name_yields_empty_token() {
    let mut state = ServerState::new();

    let request = LoginRequest::new("Mallory").to_bytes().unwrap();
    let response = state
        .process_frame(&frame(MessageKind::Login, None, &request))
        .unwrap()
        .expect("LOGIN must produce a response");

    let (kind, payload) = unwrap_type(&response).unwrap();
    assert_eq!(kind, MessageKind::LoginResponse);

    let login_response = LoginResponse::decode(payload).unwrap();
    assert!(login_response.encrypted_token.is_empty());
    assert_eq!(state.active_sessions(), 0);
}

#[test]
fn test_login_mints_token_encrypted_to_caller() {
    let mut state = ServerState::new();
    let key_pair = register(&mut state, "Alice");

    let token = login(&mut state, "Alice", &key_pair);

    assert_eq!(state.active_sessions(), 1);
    assert_eq!(state.resolve_identity(Some(token)), Some("Alice".to_string()));
}

#[test]
fn test_each_login_mints_a_fresh_token() {
    let mut state = ServerState::new();
    let key_pair = register(&mut state, "Alice");

    let first = login(&mut state, "Alice", &key_pair);
    let second = login(&mut state, "Alice", &key_pair);

    assert_ne!(first, second);
    assert_eq!(state.active_sessions(), 2);
}

// =============================================================================
// Key Lookup Tests
// =============================================================================

#[test]
fn test_key_lookup_returns_registered_key() {
    let mut state = ServerState::new();
    let key_pair = register(&mut state, "Alice");

    let request = KeyRequest::new("Alice").to_bytes().unwrap();
    let response = state
        .process_frame(&frame(MessageKind::Key, None, &request))
        .unwrap()
        .expect("KEY must produce a response");

    let (kind, payload) = unwrap_type(&response).unwrap();
    assert_eq!(kind, MessageKind::KeyResponse);

    let key_response = KeyResponse::decode(payload).unwrap();
    assert_eq!(key_response.public_key.as_ref(), Some(key_pair.public_key()));
}

#[test]
fn test_key_lookup_unknown_name_yields_sentinel() {
    let mut state = ServerState::new();

    let request = KeyRequest::new("Nobody").to_bytes().unwrap();
    let response = state
        .process_frame(&frame(MessageKind::Key, None, &request))
        .unwrap()
        .expect("KEY must produce a response");

    let (_, payload) = unwrap_type(&response).unwrap();
    let key_response = KeyResponse::decode(payload).unwrap();
    assert!(key_response.public_key.is_none());
}

// =============================================================================
// Create Tests
// =============================================================================

#[test]
fn test_unauthenticated_create_is_dropped() {
    let mut state = ServerState::new();
    register(&mut state, "Alice");

    let request = CreateRequest::new("Alice", b"sneaky".to_vec())
        .to_bytes()
        .unwrap();
    let response = state
        .process_frame(&frame(MessageKind::Create, None, &request))
        .unwrap();

    assert!(response.is_none());
    assert_eq!(state.pending_messages("Alice"), 0);
}

#[test]
fn test_create_with_unknown_token_is_dropped() {
    let mut state = ServerState::new();
    register(&mut state, "Alice");

    let forged = SessionToken::from_bytes(&[0x41; 32]).unwrap();
    let request = CreateRequest::new("Alice", b"sneaky".to_vec())
        .to_bytes()
        .unwrap();
    let response = state
        .process_frame(&frame(MessageKind::Create, Some(&forged), &request))
        .unwrap();

    assert!(response.is_none());
    assert_eq!(state.pending_messages("Alice"), 0);
}

#[test]
fn test_authenticated_create_enqueues_message() {
    let mut state = ServerState::new();
    register(&mut state, "Alice");
    let bob_keys = register(&mut state, "Bob");
    let bob_token = login(&mut state, "Bob", &bob_keys);

    let request = CreateRequest::new("Alice", b"hello".to_vec())
        .to_bytes()
        .unwrap();
    let response = state
        .process_frame(&frame(MessageKind::Create, Some(&bob_token), &request))
        .unwrap();

    assert!(response.is_none(), "CREATE is fire-and-forget");
    assert_eq!(state.pending_messages("Alice"), 1);
}

// =============================================================================
// Read Tests
// =============================================================================

/// Dispatch a READ for the given identity and decode the response
fn read_as(state: &mut ServerState, identity: Option<&str>) -> ReadResponse {
    let payload = ReadRequest::new().to_bytes().unwrap();
    let (kind, inner) = state
        .dispatch(MessageKind::Read, identity, &payload)
        .unwrap()
        .expect("READ must produce a response");

    assert_eq!(kind, MessageKind::ReadResponse);
    ReadResponse::decode(&inner).unwrap()
}

/// Enqueue a message through the CREATE handler
fn create_as(state: &mut ServerState, sender: &str, recipient: &str, body: &[u8]) {
    let payload = CreateRequest::new(recipient, body.to_vec())
        .to_bytes()
        .unwrap();
    let result = state
        .dispatch(MessageKind::Create, Some(sender), &payload)
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_unauthenticated_read_degrades_to_empty_response() {
    let mut state = ServerState::new();

    let response = read_as(&mut state, None);
    assert!(response.messages.is_empty());
    assert!(!response.more_messages);
}

#[test]
fn test_read_empty_mailbox() {
    let mut state = ServerState::new();

    let response = read_as(&mut state, Some("Alice"));
    assert!(response.messages.is_empty());
    assert!(!response.more_messages);
}

#[test]
fn test_read_preserves_fifo_order() {
    let mut state = ServerState::new();
    create_as(&mut state, "Ann", "Dave", b"1");
    create_as(&mut state, "Ben", "Dave", b"2");
    create_as(&mut state, "Cat", "Dave", b"3");

    let response = read_as(&mut state, Some("Dave"));

    let received: Vec<(&str, &[u8])> = response
        .messages
        .iter()
        .map(|m| (m.sender_name.as_str(), m.body.as_slice()))
        .collect();
    assert_eq!(
        received,
        vec![
            ("Ann", b"1".as_slice()),
            ("Ben", b"2".as_slice()),
            ("Cat", b"3".as_slice()),
        ]
    );
    assert!(!response.more_messages);
    assert_eq!(state.pending_messages("Dave"), 0);
}

#[test]
fn test_read_pagination_boundary() {
    let mut state = ServerState::new();

    for i in 0..256 {
        create_as(&mut state, "Bob", "Alice", format!("{}", i).as_bytes());
    }

    let first = read_as(&mut state, Some("Alice"));
    assert_eq!(first.messages.len(), 255);
    assert!(first.more_messages);
    assert_eq!(first.messages[0].body, b"0".to_vec());
    assert_eq!(first.messages[254].body, b"254".to_vec());

    let second = read_as(&mut state, Some("Alice"));
    assert_eq!(second.messages.len(), 1);
    assert!(!second.more_messages);
    assert_eq!(second.messages[0].body, b"255".to_vec());
    assert_eq!(state.pending_messages("Alice"), 0);
}

// =============================================================================
// Dispatch Edge Cases
// =============================================================================

#[test]
fn test_response_kind_as_request_is_discarded() {
    let mut state = ServerState::new();

    let inner = LoginResponse::not_registered().to_bytes().unwrap();
    let response = state
        .process_frame(&frame(MessageKind::LoginResponse, None, &inner))
        .unwrap();

    assert!(response.is_none());
}

#[test]
fn test_malformed_payload_is_an_error_not_a_panic() {
    let mut state = ServerState::new();

    // LOGIN with a zero name length
    let result = state.process_frame(&frame(MessageKind::Login, None, &[0x00]));
    assert!(result.is_err());
}
