// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The typed socket: kind semantics over connections.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::authentication::{AuthenticatorHandle, ZapOptions};
use crate::error::{Error, Result};
use crate::messaging::transport::byte_stream::{ByteStream, StreamListener};
use crate::messaging::transport::connection::Connection;
use crate::messaging::transport::frame_codec::read_parts;
use crate::messaging::transport::handshake::{client_handshake, server_handshake};
use crate::messaging::transport::{Endpoint, Frame, SUBSCRIBE_BYTE, UNSUBSCRIBE_BYTE};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const ACCEPT_POLL: Duration = Duration::from_millis(20);
const STOP_POLL: Duration = Duration::from_millis(100);

static ROUTING_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// The socket kinds of the messaging fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    /// One-to-many broadcast sender.
    Publisher,
    /// Broadcast receiver with topic subscriptions.
    Subscriber,
    /// Proxy-side publisher that surfaces subscription frames.
    XPublisher,
    /// Proxy-side subscriber that forwards subscription frames.
    XSubscriber,
    /// Synchronous request sender.
    Request,
    /// Reply worker behind a dealer.
    Reply,
    /// Identity-routing frontend.
    Router,
    /// Load-balancing backend.
    Dealer,
}

impl SocketType {
    fn is_publisher_like(self) -> bool {
        matches!(self, SocketType::Publisher | SocketType::XPublisher)
    }

    fn is_subscriber_like(self) -> bool {
        matches!(self, SocketType::Subscriber | SocketType::XSubscriber)
    }
}

/// Per-socket configuration.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    send_high_water_mark: usize,
    receive_high_water_mark: usize,
    send_timeout: Option<Duration>,
    routing_identifier: Option<Vec<u8>>,
    connect_retry: Duration,
    zap_options: ZapOptions,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            send_high_water_mark: 8192,
            receive_high_water_mark: 8192,
            send_timeout: Some(Duration::from_millis(1000)),
            routing_identifier: None,
            connect_retry: Duration::from_millis(250),
            zap_options: ZapOptions::new(),
        }
    }
}

impl SocketOptions {
    /// Default options: HWM 8192, 1 s send timeout, Grasslands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outbound queue bound per connection.
    pub fn set_send_high_water_mark(&mut self, hwm: usize) {
        self.send_high_water_mark = hwm.max(1);
    }

    /// The outbound queue bound per connection.
    pub fn send_high_water_mark(&self) -> usize {
        self.send_high_water_mark
    }

    /// Sets the inbound queue bound.
    pub fn set_receive_high_water_mark(&mut self, hwm: usize) {
        self.receive_high_water_mark = hwm.max(1);
    }

    /// The inbound queue bound.
    pub fn receive_high_water_mark(&self) -> usize {
        self.receive_high_water_mark
    }

    /// Sets how long a blocking send may wait; `None` blocks indefinitely.
    pub fn set_send_timeout(&mut self, timeout: Option<Duration>) {
        self.send_timeout = timeout;
    }

    /// The send timeout.
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout
    }

    /// Sets the identity presented to router peers. Defaults to a unique
    /// local token.
    pub fn set_routing_identifier(&mut self, identifier: &[u8]) -> Result<()> {
        if identifier.is_empty() {
            return Err(Error::InvalidArgument("routing identifier is empty".into()));
        }
        self.routing_identifier = Some(identifier.to_vec());
        Ok(())
    }

    /// The configured routing identity, if any.
    pub fn routing_identifier(&self) -> Option<&[u8]> {
        self.routing_identifier.as_deref()
    }

    /// Sets the delay between connection attempts.
    pub fn set_connect_retry(&mut self, retry: Duration) {
        self.connect_retry = retry.max(Duration::from_millis(1));
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }

    /// The authentication options.
    pub fn zap_options(&self) -> &ZapOptions {
        &self.zap_options
    }
}

/// A message as it arrived, before kind-specific shaping.
pub(crate) struct RawInbound {
    pub connection_id: u64,
    pub parts: Vec<Frame>,
}

struct SocketCore {
    socket_type: SocketType,
    options: SocketOptions,
    routing_id: Vec<u8>,
    authenticator: Option<AuthenticatorHandle>,
    stop: AtomicBool,
    connections: Mutex<HashMap<u64, Arc<Connection>>>,
    routing_index: Mutex<HashMap<Vec<u8>, u64>>,
    inbound_tx: Sender<RawInbound>,
    inbound_rx: Receiver<RawInbound>,
    next_connection_id: AtomicU64,
    round_robin: AtomicUsize,
    local_subscriptions: Mutex<HashSet<Vec<u8>>>,
    reply_envelope: Mutex<Option<(u64, Vec<Frame>)>>,
    bound_ipc_path: Mutex<Option<std::path::PathBuf>>,
}

/// A socket with one of the eight pattern kinds.
///
/// Sockets may bind and connect (connects retry in the background until
/// the peer appears, which is what makes slow-joiner startups work), and
/// are closed by `close()` or drop. All methods are `&self`; a socket can
/// be shared across threads behind an `Arc` when a pattern needs it.
pub struct Socket {
    core: Arc<SocketCore>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Socket {
    /// Creates a socket of the given kind.
    pub fn new(socket_type: SocketType, options: SocketOptions) -> Self {
        Self::new_with(socket_type, options, None)
    }

    /// Creates a socket whose binder consults the given authenticator.
    pub fn with_authenticator(
        socket_type: SocketType,
        options: SocketOptions,
        authenticator: AuthenticatorHandle,
    ) -> Self {
        Self::new_with(socket_type, options, Some(authenticator))
    }

    fn new_with(
        socket_type: SocketType,
        options: SocketOptions,
        authenticator: Option<AuthenticatorHandle>,
    ) -> Self {
        let routing_id = options.routing_identifier.clone().unwrap_or_else(|| {
            format!(
                "umps-{}-{}",
                std::process::id(),
                ROUTING_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
            )
            .into_bytes()
        });
        let (inbound_tx, inbound_rx) = bounded(options.receive_high_water_mark);
        Self {
            core: Arc::new(SocketCore {
                socket_type,
                options,
                routing_id,
                authenticator,
                stop: AtomicBool::new(false),
                connections: Mutex::new(HashMap::new()),
                routing_index: Mutex::new(HashMap::new()),
                inbound_tx,
                inbound_rx,
                next_connection_id: AtomicU64::new(1),
                round_robin: AtomicUsize::new(0),
                local_subscriptions: Mutex::new(HashSet::new()),
                reply_envelope: Mutex::new(None),
                bound_ipc_path: Mutex::new(None),
            }),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// The socket kind.
    pub fn socket_type(&self) -> SocketType {
        self.core.socket_type
    }

    /// The identity this socket presents to router peers.
    pub fn routing_id(&self) -> &[u8] {
        &self.core.routing_id
    }

    /// Number of live peer connections.
    pub fn connection_count(&self) -> usize {
        self.core
            .connections
            .lock()
            .values()
            .filter(|c| c.is_alive())
            .count()
    }

    /// Binds the endpoint and starts accepting peers.
    pub fn bind(&self, endpoint: &Endpoint) -> Result<()> {
        let listener = StreamListener::bind(endpoint)?;
        if let Endpoint::Ipc(path) = endpoint {
            *self.core.bound_ipc_path.lock() = Some(path.clone());
        }
        let core = self.core.clone();
        let thread = std::thread::Builder::new()
            .name("umps-accept".to_string())
            .spawn(move || accept_loop(&core, &listener))
            .map_err(|e| Error::AlgorithmFailure(format!("spawn accept loop: {}", e)))?;
        self.threads.lock().push(thread);
        Ok(())
    }

    /// Connects to the endpoint, retrying in the background until the
    /// binder appears.
    pub fn connect(&self, endpoint: &Endpoint) -> Result<()> {
        let core = self.core.clone();
        let endpoint = endpoint.clone();
        let thread = std::thread::Builder::new()
            .name("umps-connect".to_string())
            .spawn(move || connect_loop(&core, &endpoint))
            .map_err(|e| Error::AlgorithmFailure(format!("spawn connect loop: {}", e)))?;
        self.threads.lock().push(thread);
        Ok(())
    }

    /// Subscribes to a topic prefix (subscriber kinds only).
    pub fn subscribe(&self, topic: &[u8]) -> Result<()> {
        if !self.core.socket_type.is_subscriber_like() {
            return Err(Error::InvalidArgument(format!(
                "{:?} socket cannot subscribe",
                self.core.socket_type
            )));
        }
        self.core.local_subscriptions.lock().insert(topic.to_vec());
        let mut frame = vec![SUBSCRIBE_BYTE];
        frame.extend_from_slice(topic);
        self.broadcast(vec![frame]);
        Ok(())
    }

    /// Removes a topic-prefix subscription.
    pub fn unsubscribe(&self, topic: &[u8]) -> Result<()> {
        if !self.core.socket_type.is_subscriber_like() {
            return Err(Error::InvalidArgument(format!(
                "{:?} socket cannot unsubscribe",
                self.core.socket_type
            )));
        }
        self.core.local_subscriptions.lock().remove(topic);
        let mut frame = vec![UNSUBSCRIBE_BYTE];
        frame.extend_from_slice(topic);
        self.broadcast(vec![frame]);
        Ok(())
    }

    /// Sends a multi-part message with the socket kind's semantics.
    pub fn send(&self, parts: Vec<Frame>) -> Result<()> {
        if self.core.stop.load(Ordering::SeqCst) {
            return Err(Error::NotRunning("socket is closed".into()));
        }
        if parts.is_empty() {
            return Err(Error::InvalidArgument("message has no frames".into()));
        }
        let timeout = self.core.options.send_timeout;
        match self.core.socket_type {
            SocketType::Publisher | SocketType::XPublisher => {
                let topic = parts[0].clone();
                let mut delivered = 0usize;
                let mut dropped = 0usize;
                for connection in self.live_connections() {
                    if connection.is_subscribed(&topic) {
                        if connection.try_send(parts.clone()) {
                            delivered += 1;
                        } else {
                            dropped += 1;
                        }
                    }
                }
                if dropped > 0 {
                    log::debug!(
                        "[transport] dropped message on {} full subscriber queues ({} delivered)",
                        dropped,
                        delivered
                    );
                }
                Ok(())
            }
            SocketType::XSubscriber => {
                // Remember forwarded subscriptions so publishers that
                // connect later are announced the same topics.
                if parts.len() == 1 && !parts[0].is_empty() {
                    let control = parts[0][0];
                    let topic = parts[0][1..].to_vec();
                    if control == SUBSCRIBE_BYTE {
                        self.core.local_subscriptions.lock().insert(topic);
                    } else if control == UNSUBSCRIBE_BYTE {
                        self.core.local_subscriptions.lock().remove(&topic);
                    }
                }
                for connection in self.live_connections() {
                    let _ = connection.send(parts.clone(), timeout);
                }
                Ok(())
            }
            SocketType::Subscriber => Err(Error::InvalidArgument(
                "subscriber sockets cannot send application messages".into(),
            )),
            SocketType::Request => {
                let connection = self.wait_for_connection(timeout)?;
                let mut framed = Vec::with_capacity(parts.len() + 1);
                framed.push(Vec::new());
                framed.extend(parts);
                connection.send(framed, timeout)
            }
            SocketType::Reply => {
                let Some((connection_id, envelope)) = self.core.reply_envelope.lock().take() else {
                    return Err(Error::AlgorithmFailure(
                        "reply sent with no request outstanding".into(),
                    ));
                };
                let connection = self.core.connections.lock().get(&connection_id).cloned();
                let Some(connection) = connection else {
                    log::warn!("[transport] reply dropped: requester disconnected");
                    return Ok(());
                };
                let mut framed = envelope;
                framed.push(Vec::new());
                framed.extend(parts);
                connection.send(framed, timeout)
            }
            SocketType::Router => {
                let identity = parts[0].clone();
                let connection_id = self.core.routing_index.lock().get(&identity).copied();
                let connection =
                    connection_id.and_then(|id| self.core.connections.lock().get(&id).cloned());
                let Some(connection) = connection else {
                    log::warn!(
                        "[transport] router dropped message for unknown identity {:?}",
                        String::from_utf8_lossy(&identity)
                    );
                    return Ok(());
                };
                connection.send(parts[1..].to_vec(), timeout)
            }
            SocketType::Dealer => {
                let connection = self.wait_for_connection(timeout)?;
                connection.send(parts, timeout)
            }
        }
    }

    /// Receives one message.
    ///
    /// `None` timeout blocks until a message arrives or the socket is
    /// closed; `Some(0)` polls; otherwise waits up to the timeout.
    /// Returns `Ok(None)` when the timeout expires.
    pub fn receive(&self, timeout: Option<Duration>) -> Result<Option<Vec<Frame>>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if self.core.stop.load(Ordering::SeqCst) {
                return Err(Error::NotRunning("socket is closed".into()));
            }
            let wait = match deadline {
                None => STOP_POLL,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        // One last poll so a zero timeout can still drain.
                        match self.core.inbound_rx.try_recv() {
                            Ok(raw) => return Ok(self.finish_receive(raw)),
                            Err(_) => return Ok(None),
                        }
                    }
                    remaining.min(STOP_POLL)
                }
            };
            match self.core.inbound_rx.recv_timeout(wait) {
                Ok(raw) => {
                    if let Some(parts) = self.finish_receive(raw) {
                        return Ok(Some(parts));
                    }
                    // Shaped away (e.g. malformed envelope): keep waiting.
                }
                Err(crossbeam::channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam::channel::RecvTimeoutError::Disconnected) => {
                    return Err(Error::NotRunning("socket is closed".into()));
                }
            }
        }
    }

    /// The raw inbound queue, for multi-socket polls.
    pub(crate) fn raw_receiver(&self) -> Receiver<RawInbound> {
        self.core.inbound_rx.clone()
    }

    /// Applies kind-specific shaping to a raw message taken off
    /// [`Self::raw_receiver`].
    pub(crate) fn finish_receive(&self, raw: RawInbound) -> Option<Vec<Frame>> {
        match self.core.socket_type {
            SocketType::Request => {
                // Strip the empty delimiter the router echoed back.
                let mut parts = raw.parts;
                if parts.first().is_some_and(Vec::is_empty) {
                    parts.remove(0);
                }
                Some(parts)
            }
            SocketType::Reply => {
                let parts = raw.parts;
                let delimiter = parts.iter().position(Vec::is_empty)?;
                let envelope = parts[..delimiter].to_vec();
                *self.core.reply_envelope.lock() = Some((raw.connection_id, envelope));
                Some(parts[delimiter + 1..].to_vec())
            }
            SocketType::Router => {
                let connection = self.core.connections.lock().get(&raw.connection_id).cloned()?;
                let mut framed = Vec::with_capacity(raw.parts.len() + 1);
                framed.push(connection.routing_id.clone());
                framed.extend(raw.parts);
                Some(framed)
            }
            _ => Some(raw.parts),
        }
    }

    /// Closes every connection and joins the socket's threads.
    /// Idempotent.
    pub fn close(&self) {
        self.core.stop.store(true, Ordering::SeqCst);
        let connections: Vec<_> = self.core.connections.lock().values().cloned().collect();
        for connection in connections {
            connection.close();
        }
        self.core.connections.lock().clear();
        self.core.routing_index.lock().clear();
        let threads: Vec<_> = self.threads.lock().drain(..).collect();
        for thread in threads {
            let _ = thread.join();
        }
        if let Some(path) = self.core.bound_ipc_path.lock().take() {
            let _ = std::fs::remove_file(path);
        }
    }

    fn live_connections(&self) -> Vec<Arc<Connection>> {
        let mut connections = self.core.connections.lock();
        connections.retain(|_, c| c.is_alive());
        connections.values().cloned().collect()
    }

    /// Waits for at least one live connection, then picks round-robin.
    fn wait_for_connection(&self, timeout: Option<Duration>) -> Result<Arc<Connection>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let live = self.live_connections();
            if !live.is_empty() {
                let index = self.core.round_robin.fetch_add(1, Ordering::Relaxed) % live.len();
                return Ok(live[index].clone());
            }
            if self.core.stop.load(Ordering::SeqCst) {
                return Err(Error::NotRunning("socket is closed".into()));
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(Error::Timeout);
                }
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn broadcast(&self, parts: Vec<Frame>) {
        for connection in self.live_connections() {
            let _ = connection.send(parts.clone(), Some(Duration::from_millis(100)));
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}

fn accept_loop(core: &Arc<SocketCore>, listener: &StreamListener) {
    loop {
        if core.stop.load(Ordering::SeqCst) {
            return;
        }
        match listener.accept() {
            Ok(Some(stream)) => {
                let core = core.clone();
                let result = std::thread::Builder::new()
                    .name("umps-session".to_string())
                    .spawn(move || server_session(&core, stream));
                if let Err(e) = result {
                    log::error!("[transport] failed to spawn session: {}", e);
                }
            }
            Ok(None) => std::thread::sleep(ACCEPT_POLL),
            Err(e) => {
                log::warn!("[transport] accept failed: {}", e);
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn server_session(core: &Arc<SocketCore>, mut stream: ByteStream) {
    let _ = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT));
    let greeting = match server_handshake(&mut stream, &core.options.zap_options, core.authenticator.as_ref()) {
        Ok(greeting) => greeting,
        Err(e) => {
            log::debug!("[transport] rejected peer: {}", e);
            stream.shutdown();
            return;
        }
    };
    let _ = stream.set_read_timeout(None);
    run_session(core, stream, greeting.routing_id);
}

fn connect_loop(core: &Arc<SocketCore>, endpoint: &Endpoint) {
    loop {
        if core.stop.load(Ordering::SeqCst) {
            return;
        }
        match ByteStream::connect(endpoint, Duration::from_secs(1)) {
            Ok(mut stream) => {
                let _ = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT));
                match client_handshake(&mut stream, &core.options.zap_options, &core.routing_id) {
                    Ok(()) => {
                        let _ = stream.set_read_timeout(None);
                        // The binder identifies us; we identify it locally.
                        run_session(core, stream, Vec::new());
                        if core.stop.load(Ordering::SeqCst) {
                            return;
                        }
                    }
                    Err(Error::AuthenticationDenied(reason)) => {
                        log::warn!("[transport] {} denied connection: {}", endpoint, reason);
                        stream.shutdown();
                        // Denials are sticky server-side state; retry slowly.
                        sleep_unless_stopped(core, Duration::from_secs(1));
                        continue;
                    }
                    Err(e) => {
                        log::debug!("[transport] handshake with {} failed: {}", endpoint, e);
                        stream.shutdown();
                    }
                }
            }
            Err(e) => {
                log::debug!("[transport] connect {} failed: {}", endpoint, e);
            }
        }
        sleep_unless_stopped(core, core.options.connect_retry);
    }
}

fn sleep_unless_stopped(core: &SocketCore, total: Duration) {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if core.stop.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Registers the connection, pumps its reader, and deregisters on exit.
fn run_session(core: &Arc<SocketCore>, stream: ByteStream, peer_routing_id: Vec<u8>) {
    let id = core.next_connection_id.fetch_add(1, Ordering::Relaxed);
    let routing_id = if peer_routing_id.is_empty() {
        format!("conn-{}", id).into_bytes()
    } else {
        peer_routing_id
    };

    let reader_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            log::warn!("[transport] could not clone stream: {}", e);
            return;
        }
    };
    let connection = match Connection::spawn(
        id,
        routing_id.clone(),
        stream,
        core.options.send_high_water_mark,
    ) {
        Ok(connection) => connection,
        Err(e) => {
            log::warn!("[transport] could not start connection: {}", e);
            return;
        }
    };

    core.connections.lock().insert(id, connection.clone());
    core.routing_index.lock().insert(routing_id.clone(), id);

    // Subscriber kinds announce their topics to every new peer.
    if core.socket_type.is_subscriber_like() {
        let topics: Vec<Vec<u8>> = core.local_subscriptions.lock().iter().cloned().collect();
        for topic in topics {
            let mut frame = vec![SUBSCRIBE_BYTE];
            frame.extend_from_slice(&topic);
            let _ = connection.send(vec![frame], Some(Duration::from_millis(100)));
        }
    }

    read_session(core, &connection, reader_stream);

    core.connections.lock().remove(&id);
    let mut index = core.routing_index.lock();
    if index.get(&routing_id) == Some(&id) {
        index.remove(&routing_id);
    }
    drop(index);
    connection.close();
}

fn read_session(core: &Arc<SocketCore>, connection: &Arc<Connection>, mut stream: ByteStream) {
    loop {
        if core.stop.load(Ordering::SeqCst) || !connection.is_alive() {
            return;
        }
        let parts = match read_parts(&mut stream) {
            Ok(parts) => parts,
            Err(_) => return,
        };

        // Publisher kinds intercept subscription control frames.
        if core.socket_type.is_publisher_like() && parts.len() == 1 && !parts[0].is_empty() {
            let control = parts[0][0];
            if control == SUBSCRIBE_BYTE || control == UNSUBSCRIBE_BYTE {
                let topic = &parts[0][1..];
                if control == SUBSCRIBE_BYTE {
                    connection.subscribe(topic);
                } else {
                    connection.unsubscribe(topic);
                }
                // XPUB surfaces subscription traffic to the application.
                if core.socket_type == SocketType::XPublisher {
                    deliver(core, connection.id, parts);
                }
                continue;
            }
        }
        if core.socket_type == SocketType::Publisher {
            // Plain publishers never deliver application frames upward.
            continue;
        }
        deliver(core, connection.id, parts);
    }
}

/// Pushes a message onto the inbound queue, back-pressuring the reader
/// while the queue is at its high-water mark.
fn deliver(core: &Arc<SocketCore>, connection_id: u64, parts: Vec<Frame>) {
    let mut message = RawInbound {
        connection_id,
        parts,
    };
    loop {
        match core.inbound_tx.send_timeout(message, STOP_POLL) {
            Ok(()) => return,
            Err(crossbeam::channel::SendTimeoutError::Timeout(returned)) => {
                if core.stop.load(Ordering::SeqCst) {
                    return;
                }
                message = returned;
            }
            Err(crossbeam::channel::SendTimeoutError::Disconnected(_)) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_endpoint() -> Endpoint {
        let port = 40000 + fastrand::u16(0..20000);
        Endpoint::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap()
    }

    #[test]
    fn pair_exchanges_frames() {
        let endpoint = tcp_endpoint();
        let server = Socket::new(SocketType::Router, SocketOptions::new());
        server.bind(&endpoint).expect("bind");

        let mut options = SocketOptions::new();
        options.set_routing_identifier(b"client-a").unwrap();
        let client = Socket::new(SocketType::Request, options);
        client.connect(&endpoint).expect("connect");

        client
            .send(vec![b"type".to_vec(), b"payload".to_vec()])
            .expect("send");

        let request = server
            .receive(Some(Duration::from_secs(5)))
            .expect("receive")
            .expect("timed out");
        // [identity, delimiter, type, payload]
        assert_eq!(request.len(), 4);
        assert_eq!(request[0], b"client-a".to_vec());
        assert!(request[1].is_empty());
        assert_eq!(request[2], b"type".to_vec());

        let mut reply = request.clone();
        reply[2] = b"reply-type".to_vec();
        server.send(reply).expect("reply");

        let response = client
            .receive(Some(Duration::from_secs(5)))
            .expect("receive")
            .expect("timed out");
        assert_eq!(response[0], b"reply-type".to_vec());

        client.close();
        server.close();
    }

    #[test]
    fn subscriber_receives_only_subscribed_topics() {
        let endpoint = tcp_endpoint();
        let publisher = Socket::new(SocketType::Publisher, SocketOptions::new());
        publisher.bind(&endpoint).expect("bind");

        let subscriber = Socket::new(SocketType::Subscriber, SocketOptions::new());
        subscriber.subscribe(b"topic-a").expect("subscribe");
        subscriber.connect(&endpoint).expect("connect");

        // Wait for the subscription to land at the publisher.
        let deadline = Instant::now() + Duration::from_secs(5);
        while publisher.connection_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        std::thread::sleep(Duration::from_millis(200));

        publisher
            .send(vec![b"topic-b".to_vec(), b"ignored".to_vec()])
            .expect("send");
        publisher
            .send(vec![b"topic-a".to_vec(), b"wanted".to_vec()])
            .expect("send");

        let message = subscriber
            .receive(Some(Duration::from_secs(5)))
            .expect("receive")
            .expect("timed out");
        assert_eq!(message[0], b"topic-a".to_vec());
        assert_eq!(message[1], b"wanted".to_vec());

        subscriber.close();
        publisher.close();
    }

    #[test]
    fn receive_zero_timeout_polls() {
        let socket = Socket::new(SocketType::Subscriber, SocketOptions::new());
        let result = socket.receive(Some(Duration::ZERO)).expect("receive");
        assert!(result.is_none());
        socket.close();
    }

    #[test]
    fn send_on_closed_socket_fails() {
        let socket = Socket::new(SocketType::Publisher, SocketOptions::new());
        socket.close();
        assert!(matches!(
            socket.send(vec![b"x".to_vec()]),
            Err(Error::NotRunning(_))
        ));
    }
}
