//! TCP Server
//!
//! Single-threaded readiness-driven connection multiplexer. One
//! listening socket plus all accepted client sockets are registered
//! with a `mio::Poll`; each wakeup services whichever sockets are
//! readable. Handler logic runs synchronously inside the loop, so the
//! session/mailbox tables never need locking.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use crate::config::Config;
use crate::error::Result;
use crate::session::ServerState;

use super::resolve_addr;

const LISTENER: Token = Token(0);

const EVENT_CAPACITY: usize = 128;

/// Cooperative stop signal for a running server.
///
/// The event loop checks the flag at the top of every iteration; the
/// readiness wait is bounded by the poll timeout, so a stop request is
/// honored within one timeout at most.
#[derive(Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop after its current iteration
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Store-and-forward messaging server
pub struct Server {
    config: Config,
    state: ServerState,
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, TcpStream>,
    next_token: usize,
    running: Arc<AtomicBool>,
}

impl Server {
    /// Bind the welcoming socket and set up the readiness multiplexer
    pub fn new(config: Config) -> Result<Self> {
        let addr = resolve_addr(&config.hostname, config.port)?;

        let mut listener = TcpListener::bind(addr)?;

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Self {
            config,
            state: ServerState::new(),
            poll,
            listener,
            connections: HashMap::new(),
            next_token: LISTENER.0 + 1,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// The address the welcoming socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle that can stop the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Run the event loop until stopped (blocking)
    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(EVENT_CAPACITY);
        let timeout = Duration::from_millis(self.config.poll_timeout_ms);

        tracing::info!(
            "Server started on {} port {}",
            self.config.hostname,
            self.config.port
        );

        while self.running.load(Ordering::Relaxed) {
            if let Err(error) = self.poll.poll(&mut events, Some(timeout)) {
                if error.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(error.into());
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_connections(),
                    token => self.service_connection(token),
                }
            }
        }

        tracing::info!("Stopping server.");
        Ok(())
    }

    /// Accept every pending connection and register it for
    /// read-readiness.
    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, client_address)) => {
                    tracing::info!("New client connection from {}", client_address);

                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(error) =
                        self.poll
                            .registry()
                            .register(&mut stream, token, Interest::READABLE)
                    {
                        tracing::warn!("Failed to register client socket: {}", error);
                        continue;
                    }

                    self.connections.insert(token, stream);
                }
                Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(error) => {
                    tracing::warn!("Failed to accept connection: {}", error);
                    break;
                }
            }
        }
    }

    /// Run one decode-and-handle cycle for a readable client socket
    fn service_connection(&mut self, token: Token) {
        let packet = {
            let Some(stream) = self.connections.get_mut(&token) else {
                return;
            };

            match read_available(stream, self.config.receive_buffer_size) {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    self.close_connection(token);
                    return;
                }
                Err(error) => {
                    tracing::warn!("Error reading from client: {}", error);
                    self.close_connection(token);
                    return;
                }
            }
        };

        if packet.is_empty() {
            // Spurious wakeup, nothing to do yet
            return;
        }

        // One bad frame discards that request only; the connection and
        // the loop stay alive.
        let response = match self.state.process_frame(&packet) {
            Ok(response) => response,
            Err(error) => {
                tracing::error!("Request discarded: {}", error);
                return;
            }
        };

        if let Some(response) = response {
            self.send_response(token, &response);
        }
    }

    /// Write a response frame back to the client, discarding it on
    /// failure.
    fn send_response(&mut self, token: Token, response: &[u8]) {
        let Some(stream) = self.connections.get_mut(&token) else {
            return;
        };

        if let Err(error) = stream.write_all(response).and_then(|()| stream.flush()) {
            tracing::warn!("Response discarded, error writing to client: {}", error);
            self.close_connection(token);
        }
    }

    /// Deregister and drop a client socket
    fn close_connection(&mut self, token: Token) {
        if let Some(mut stream) = self.connections.remove(&token) {
            if let Err(error) = self.poll.registry().deregister(&mut stream) {
                tracing::warn!("Failed to deregister client socket: {}", error);
            }
            tracing::info!("Closed client connection");
        }
    }
}

/// Read the bytes currently available on a non-blocking socket.
///
/// Returns `None` when the peer has closed the connection, otherwise
/// everything readable right now (possibly empty on a spurious
/// wakeup).
fn read_available(stream: &mut TcpStream, chunk_size: usize) -> Result<Option<BytesMut>> {
    let mut buffer = BytesMut::new();
    let mut chunk = vec![0u8; chunk_size];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => {
                if buffer.is_empty() {
                    return Ok(None);
                }
                // Peer closed right after sending; the close surfaces
                // on the next readiness event.
                return Ok(Some(buffer));
            }
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if n < chunk_size {
                    return Ok(Some(buffer));
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                return Ok(Some(buffer));
            }
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        }
    }
}
