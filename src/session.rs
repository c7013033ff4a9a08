//! Session/Mailbox Engine
//!
//! Owns the three server-side tables: registered identities, active
//! sessions, and per-user pending-message queues. The connection
//! multiplexer is single-threaded, so the tables need no locking;
//! every handler runs synchronously with exclusive access.
//!
//! Per inbound frame the engine runs:
//! DECODE-TYPE -> DECODE-SESSION -> RESOLVE-IDENTITY -> DISPATCH(kind)
//! -> [MUTATE/QUERY] -> [ENCODE-RESPONSE]

use std::collections::{HashMap, VecDeque};

use crate::crypto::{generate_session_token, PublicKey, SessionToken};
use crate::error::Result;
use crate::protocol::{
    unwrap_session, unwrap_type, wrap_type, CreateRequest, KeyRequest, KeyResponse, LoginRequest,
    LoginResponse, Message, MessageKind, ReadResponse, RegistrationRequest,
    MAX_MESSAGES_PER_RESPONSE,
};

/// All mutable server-side state
#[derive(Default)]
pub struct ServerState {
    /// Registered identities: name -> public key
    users: HashMap<String, PublicKey>,

    /// Active sessions: token -> name
    sessions: HashMap<SessionToken, String>,

    /// Pending messages: recipient name -> FIFO of (sender, body)
    mailboxes: HashMap<String, VecDeque<(String, Vec<u8>)>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one full decode-and-handle cycle on a raw inbound frame.
    ///
    /// Returns the wire-ready response frame, if the request kind calls
    /// for one. Frame and validation errors propagate to the caller,
    /// which discards the request and keeps the connection alive.
    pub fn process_frame(&mut self, packet: &[u8]) -> Result<Option<Vec<u8>>> {
        let (kind, rest) = unwrap_type(packet)?;
        let (token, payload) = unwrap_session(rest)?;

        let identity = self.resolve_identity(token);

        tracing::info!("Received {} request", kind);

        match self.dispatch(kind, identity.as_deref(), payload)? {
            Some((response_kind, inner)) => Ok(Some(wrap_type(response_kind, &inner)?)),
            None => Ok(None),
        }
    }

    /// Resolve a session token to the identity it was minted for.
    ///
    /// An absent or unknown token resolves to `None`; the per-kind
    /// handlers decide what an unauthenticated request means.
    pub fn resolve_identity(&self, token: Option<SessionToken>) -> Option<String> {
        token.and_then(|token| self.sessions.get(&token).cloned())
    }

    /// Dispatch a request to its handler.
    ///
    /// Returns the response kind and encoded response payload when the
    /// request kind is answered.
    pub fn dispatch(
        &mut self,
        kind: MessageKind,
        identity: Option<&str>,
        payload: &[u8],
    ) -> Result<Option<(MessageKind, Vec<u8>)>> {
        match kind {
            MessageKind::Register => {
                self.handle_register(payload)?;
                Ok(None)
            }
            MessageKind::Login => {
                let response = self.handle_login(payload)?;
                Ok(Some((MessageKind::LoginResponse, response.to_bytes()?)))
            }
            MessageKind::Key => {
                let response = self.handle_key(payload)?;
                Ok(Some((MessageKind::KeyResponse, response.to_bytes()?)))
            }
            MessageKind::Create => {
                self.handle_create(identity, payload)?;
                Ok(None)
            }
            MessageKind::Read => {
                let response = self.handle_read(identity);
                Ok(Some((MessageKind::ReadResponse, response.to_bytes()?)))
            }
            MessageKind::LoginResponse | MessageKind::KeyResponse | MessageKind::ReadResponse => {
                tracing::error!("Received {} frame, which is not a request", kind);
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// REGISTER: store the name's key if unused; first writer wins.
    fn handle_register(&mut self, payload: &[u8]) -> Result<()> {
        let request = RegistrationRequest::decode(payload)?;

        if self.users.contains_key(&request.user_name) {
            tracing::error!("Name {} already registered", request.user_name);
            return Ok(());
        }

        tracing::info!("Registered {}", request.user_name);
        self.users.insert(request.user_name, request.public_key);

        Ok(())
    }

    /// LOGIN: mint a session token and return it encrypted under the
    /// caller's registered key, proving the responder holds that key
    /// material without transmitting any secret in the clear. Unknown
    /// names get the zero-length "please register first" sentinel.
    fn handle_login(&mut self, payload: &[u8]) -> Result<LoginResponse> {
        let request = LoginRequest::decode(payload)?;

        let Some(public_key) = self.users.get(&request.user_name) else {
            tracing::info!("Unregistered user {} attempted to login", request.user_name);
            return Ok(LoginResponse::not_registered());
        };

        let token = generate_session_token();
        let encrypted_token = public_key.encrypt(token.as_bytes())?;

        self.sessions.insert(token, request.user_name.clone());
        tracing::info!("Logged in {}", request.user_name);

        Ok(LoginResponse::new(encrypted_token))
    }

    /// KEY: look up a registered public key; zero/zero components when
    /// the name is unknown.
    fn handle_key(&self, payload: &[u8]) -> Result<KeyResponse> {
        let request = KeyRequest::decode(payload)?;
        tracing::info!("Received request for {}'s key", request.user_name);

        match self.users.get(&request.user_name) {
            Some(public_key) => {
                tracing::info!("Responding with {}'s key", request.user_name);
                Ok(KeyResponse::new(Some(public_key.clone())))
            }
            None => {
                tracing::info!(
                    "{} is not registered, sending empty response",
                    request.user_name
                );
                Ok(KeyResponse::new(None))
            }
        }
    }

    /// CREATE: append to the recipient's mailbox, creating it on first
    /// delivery. Unauthenticated sends are dropped without a response.
    fn handle_create(&mut self, identity: Option<&str>, payload: &[u8]) -> Result<()> {
        let Some(sender_name) = identity else {
            tracing::info!("Received unauthenticated create request, ignoring");
            return Ok(());
        };

        let request = CreateRequest::decode(payload)?;

        self.mailboxes
            .entry(request.recipient_name.clone())
            .or_default()
            .push_back((sender_name.to_string(), request.message));

        tracing::info!(
            "Storing {}'s message to {}",
            sender_name,
            request.recipient_name
        );

        Ok(())
    }

    /// READ: pop up to 255 oldest entries from the caller's mailbox.
    /// Unauthenticated reads degrade to an empty response.
    fn handle_read(&mut self, identity: Option<&str>) -> ReadResponse {
        let Some(user_name) = identity else {
            tracing::info!("Received unauthenticated read request, responding without messages");
            return ReadResponse::empty();
        };

        let Some(mailbox) = self.mailboxes.get_mut(user_name) else {
            tracing::info!("0 message(s) delivered to {}", user_name);
            return ReadResponse::empty();
        };

        let count = mailbox.len().min(MAX_MESSAGES_PER_RESPONSE);
        let messages: Vec<Message> = mailbox
            .drain(..count)
            .map(|(sender, body)| Message::new(sender, body))
            .collect();
        let more_messages = !mailbox.is_empty();

        tracing::info!("{} message(s) delivered to {}", messages.len(), user_name);

        ReadResponse::new(messages, more_messages)
    }

    // =========================================================================
    // Table queries
    // =========================================================================

    /// The key registered for a name, if any
    pub fn registered_key(&self, user_name: &str) -> Option<&PublicKey> {
        self.users.get(user_name)
    }

    /// Number of pending messages queued for a name
    pub fn pending_messages(&self, user_name: &str) -> usize {
        self.mailboxes.get(user_name).map_or(0, VecDeque::len)
    }

    /// Number of active sessions
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
