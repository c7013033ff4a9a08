//! Client
//!
//! Blocking synchronous client: one connect, then one round trip per
//! logical operation. Connect and read are bounded by timeouts; a
//! timed-out operation is abandoned and reported, never retried.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::config::Config;
use crate::crypto::{KeyPair, PublicKey, SessionToken};
use crate::error::{MaildropError, Result};
use crate::protocol::{
    unwrap_type, wrap_session, wrap_type, CreateRequest, KeyRequest, KeyResponse, LoginRequest,
    LoginResponse, MessageKind, ReadRequest, ReadResponse, RegistrationRequest, MAX_NAME_LENGTH,
};

use super::resolve_addr;

/// A decrypted message as delivered to the reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub sender_name: String,
    pub text: String,
}

/// Client for the maildrop server
pub struct Client {
    user_name: String,
    key_pair: KeyPair,
    session_token: Option<SessionToken>,

    /// Public keys fetched from the server, by user name
    key_cache: HashMap<String, PublicKey>,

    stream: TcpStream,
    receive_buffer_size: usize,
}

impl Client {
    /// Connect to the server and generate a fresh key pair for this
    /// user.
    pub fn connect(config: &Config, user_name: &str) -> Result<Self> {
        if user_name.is_empty() {
            return Err(MaildropError::Validation(
                "Username must not be empty".to_string(),
            ));
        }
        if user_name.len() > MAX_NAME_LENGTH {
            return Err(MaildropError::Validation(format!(
                "Username must consume at most {} bytes",
                MAX_NAME_LENGTH
            )));
        }

        let addr = resolve_addr(&config.hostname, config.port)?;

        let stream = TcpStream::connect_timeout(
            &addr,
            Duration::from_millis(config.connect_timeout_ms),
        )
        .map_err(connection_error)?;

        stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let key_pair = KeyPair::generate()?;

        tracing::debug!(
            "Client for {} port {} created by {}",
            config.hostname,
            config.port,
            user_name
        );

        Ok(Self {
            user_name: user_name.to_string(),
            key_pair,
            session_token: None,
            key_cache: HashMap::new(),
            stream,
            receive_buffer_size: config.receive_buffer_size,
        })
    }

    /// The name this client operates under
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Whether a login has succeeded on this client
    pub fn is_logged_in(&self) -> bool {
        self.session_token.is_some()
    }

    /// Whether a peer's key has been fetched and cached
    pub fn has_key_for(&self, user_name: &str) -> bool {
        self.key_cache.contains_key(user_name)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Register this client's name and public key. Fire-and-forget.
    pub fn register(&mut self) -> Result<()> {
        tracing::debug!("Creating request to register as {}", self.user_name);

        let request =
            RegistrationRequest::new(&self.user_name, self.key_pair.public_key().clone());
        self.send_request(MessageKind::Register, &request.to_bytes()?, false)?;

        Ok(())
    }

    /// Log in, storing the session token minted by the server.
    ///
    /// The token arrives encrypted under this client's public key and
    /// is decrypted with the private half before use.
    pub fn login(&mut self) -> Result<()> {
        tracing::debug!("Creating log-in request as {}", self.user_name);

        let request = LoginRequest::new(&self.user_name);
        let payload = self.round_trip(
            MessageKind::Login,
            &request.to_bytes()?,
            MessageKind::LoginResponse,
        )?;

        let response = LoginResponse::decode(&payload)?;

        if response.encrypted_token.is_empty() {
            return Err(MaildropError::Validation(
                "You are not registered! Please register before logging in".to_string(),
            ));
        }

        let token_bytes = self.key_pair.decrypt(&response.encrypted_token)?;
        self.session_token = Some(SessionToken::from_bytes(&token_bytes)?);

        tracing::info!("Now logged in as {}", self.user_name);

        Ok(())
    }

    /// Fetch a user's public key, caching it for later sends.
    ///
    /// Returns `None` when the user is not registered.
    pub fn fetch_key(&mut self, user_name: &str) -> Result<Option<PublicKey>> {
        tracing::debug!("Creating key request for {}", user_name);

        let request = KeyRequest::new(user_name);
        let payload = self.round_trip(
            MessageKind::Key,
            &request.to_bytes()?,
            MessageKind::KeyResponse,
        )?;

        let response = KeyResponse::decode(&payload)?;

        match response.public_key {
            Some(public_key) => {
                self.key_cache
                    .insert(user_name.to_string(), public_key.clone());
                tracing::info!("Received {}'s key", user_name);
                Ok(Some(public_key))
            }
            None => {
                tracing::warn!("The requested user is not registered");
                Ok(None)
            }
        }
    }

    /// Send a message to another user, encrypted under their cached
    /// key. Fire-and-forget. Requires a prior login and key fetch.
    pub fn send_message(&mut self, recipient_name: &str, text: &str) -> Result<()> {
        if self.session_token.is_none() {
            return Err(MaildropError::Validation(
                "Please log in before sending messages".to_string(),
            ));
        }

        let Some(recipient_key) = self.key_cache.get(recipient_name) else {
            return Err(MaildropError::Validation(
                "Perform a key request for the user before sending them a message".to_string(),
            ));
        };

        let encrypted_message = recipient_key.encrypt(text.as_bytes())?;

        let request = CreateRequest::new(recipient_name, encrypted_message);
        self.send_request(MessageKind::Create, &request.to_bytes()?, false)?;

        Ok(())
    }

    /// Read pending messages, decrypting each body with this client's
    /// private key. Requires a prior login.
    ///
    /// The boolean reports whether more messages remain queued on the
    /// server.
    pub fn read_messages(&mut self) -> Result<(Vec<ReceivedMessage>, bool)> {
        if self.session_token.is_none() {
            return Err(MaildropError::Validation(
                "Please log in to request messages".to_string(),
            ));
        }

        let request = ReadRequest::new();
        let payload = self.round_trip(
            MessageKind::Read,
            &request.to_bytes()?,
            MessageKind::ReadResponse,
        )?;

        let response = ReadResponse::decode(&payload)?;

        let mut messages = Vec::with_capacity(response.messages.len());
        for message in response.messages {
            let body = self.key_pair.decrypt(&message.body)?;
            let text = String::from_utf8(body).map_err(|_| {
                MaildropError::Validation("Received message is not valid UTF-8".to_string())
            })?;

            messages.push(ReceivedMessage {
                sender_name: message.sender_name,
                text,
            });
        }

        Ok((messages, response.more_messages))
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Send one request frame and optionally await one response frame
    fn send_request(
        &mut self,
        kind: MessageKind,
        inner: &[u8],
        expect_response: bool,
    ) -> Result<Option<(MessageKind, Vec<u8>)>> {
        let packet = wrap_type(kind, &wrap_session(self.session_token.as_ref(), inner)?)?;

        self.stream.write_all(&packet).map_err(connection_error)?;
        self.stream.flush().map_err(connection_error)?;

        tracing::info!("{} request sent as {}", kind, self.user_name);

        if !expect_response {
            return Ok(None);
        }

        let response = receive_all(&mut self.stream, self.receive_buffer_size)
            .map_err(connection_error)?;

        if response.is_empty() {
            return Err(MaildropError::Connection(
                "Server closed the connection".to_string(),
            ));
        }

        let (response_kind, payload) = unwrap_type(&response)?;

        Ok(Some((response_kind, payload.to_vec())))
    }

    /// Send a request and insist on a response of the expected kind
    fn round_trip(
        &mut self,
        kind: MessageKind,
        inner: &[u8],
        expected: MessageKind,
    ) -> Result<Vec<u8>> {
        let (response_kind, payload) = self
            .send_request(kind, inner, true)?
            .ok_or_else(|| {
                MaildropError::Connection("No response received from server".to_string())
            })?;

        if response_kind != expected {
            return Err(MaildropError::Frame(format!(
                "Received {} response from server, expected {}",
                response_kind, expected
            )));
        }

        Ok(payload)
    }
}

/// Receive all currently available data from a blocking socket.
///
/// Reads until a recv returns less than a full buffer; an extra recv
/// after the data ends would block until the read timeout.
fn receive_all(stream: &mut TcpStream, chunk_size: usize) -> std::io::Result<Vec<u8>> {
    let mut response = Vec::new();
    let mut chunk = vec![0u8; chunk_size];

    loop {
        let received = stream.read(&mut chunk)?;
        response.extend_from_slice(&chunk[..received]);

        if received < chunk_size {
            break;
        }
    }

    Ok(response)
}

/// Classify a client-side socket failure
fn connection_error(error: std::io::Error) -> MaildropError {
    match error.kind() {
        std::io::ErrorKind::ConnectionRefused => MaildropError::Connection(
            "Connection refused, likely due to invalid port number".to_string(),
        ),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            MaildropError::Connection(
                "Connection timed out, likely due to invalid host name".to_string(),
            )
        }
        _ => MaildropError::Io(error),
    }
}
