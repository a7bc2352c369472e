// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The router service: callback dispatch with identity routing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::authentication::{self, Authenticator, SecurityLevel, ZapOptions};
use crate::error::{Error, Result};
use crate::messaging::transport::{Endpoint, Frame, Socket, SocketOptions, SocketType};
use crate::messaging::{run_callback, Context, MessageCallback};

/// Router service configuration.
#[derive(Clone)]
pub struct RouterOptions {
    address: Option<String>,
    callback: Option<MessageCallback>,
    high_water_mark: usize,
    zap_options: ZapOptions,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            address: None,
            callback: None,
            high_water_mark: 4096,
            zap_options: ZapOptions::new(),
        }
    }
}

impl RouterOptions {
    /// Defaults: HWM 4096, Grasslands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// The bound address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Sets the request callback. Registered once; never mutated
    /// afterwards.
    pub fn set_callback(&mut self, callback: MessageCallback) {
        self.callback = Some(callback);
    }

    /// Sets the inbound/outbound high-water mark.
    pub fn set_high_water_mark(&mut self, hwm: usize) {
        self.high_water_mark = hwm.max(1);
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

/// A request/reply service bound to one endpoint.
///
/// Requests are `[identity, delimiter, type, payload]`; the worker runs
/// the callback and answers on the same identity envelope.
pub struct Router {
    context: Context,
    authenticator: Option<Arc<dyn Authenticator>>,
    auth_service: Mutex<Option<authentication::Service>>,
    socket: Mutex<Option<Arc<Socket>>>,
    callback: Mutex<Option<MessageCallback>>,
    control_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    initialized: AtomicBool,
}

impl Router {
    /// Creates a router with no authenticator (Grasslands only).
    pub fn new(context: &Context) -> Self {
        Self::make(context, None)
    }

    /// Creates a router owning the given authenticator.
    pub fn with_authenticator(context: &Context, authenticator: Arc<dyn Authenticator>) -> Self {
        Self::make(context, Some(authenticator))
    }

    fn make(context: &Context, authenticator: Option<Arc<dyn Authenticator>>) -> Self {
        Self {
            context: context.clone(),
            authenticator,
            auth_service: Mutex::new(None),
            socket: Mutex::new(None),
            callback: Mutex::new(None),
            control_tx: Mutex::new(None),
            worker: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            initialized: AtomicBool::new(false),
        }
    }

    /// Binds the endpoint and starts the authenticator when required.
    pub fn initialize(&self, options: &RouterOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("router address not set".into()))?;
        let callback = options
            .callback
            .clone()
            .ok_or_else(|| Error::InvalidArgument("router callback not set".into()))?;

        let handle = if options.zap_options.security_level() != SecurityLevel::Grasslands {
            let authenticator = self.authenticator.clone().ok_or_else(|| {
                Error::InvalidArgument("configured security level requires an authenticator".into())
            })?;
            let service = authentication::Service::start(authenticator)?;
            let handle = service.handle();
            *self.auth_service.lock() = Some(service);
            Some(handle)
        } else {
            None
        };

        let mut socket_options = SocketOptions::new();
        socket_options.set_receive_high_water_mark(options.high_water_mark);
        socket_options.set_send_high_water_mark(options.high_water_mark);
        socket_options.set_zap_options(&options.zap_options);

        let socket = match handle {
            Some(handle) => Socket::with_authenticator(SocketType::Router, socket_options, handle),
            None => Socket::new(SocketType::Router, socket_options),
        };
        socket.bind(&Endpoint::parse(address)?)?;

        self.context.register_socket();
        *self.socket.lock() = Some(Arc::new(socket));
        *self.callback.lock() = Some(callback);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// True after a successful [`Self::initialize`].
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Starts the dispatch worker.
    pub fn start(&self) -> Result<()> {
        let (socket, callback) = match (self.socket.lock().clone(), self.callback.lock().clone()) {
            (Some(socket), Some(callback)) => (socket, callback),
            _ => return Err(Error::NotInitialized("router service".into())),
        };
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidArgument("router already running".into()));
        }
        let (control_tx, control_rx) = unbounded();
        *self.control_tx.lock() = Some(control_tx);
        let running = self.running.clone();
        let worker = std::thread::Builder::new()
            .name("umps-router".to_string())
            .spawn(move || {
                serve(&socket, &callback, &control_rx);
                socket.close();
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| Error::AlgorithmFailure(format!("spawn router worker: {}", e)))?;
        *self.worker.lock() = Some(worker);
        Ok(())
    }

    /// True while the worker is serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the worker. Idempotent; re-initialize before restarting.
    pub fn stop(&self) {
        if let Some(control_tx) = self.control_tx.lock().take() {
            let _ = control_tx.send(());
        }
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
        if self.socket.lock().take().is_some() {
            self.context.deregister_socket();
        }
        *self.callback.lock() = None;
        if let Some(mut service) = self.auth_service.lock().take() {
            service.stop();
        }
        self.initialized.store(false, Ordering::SeqCst);
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(socket: &Arc<Socket>, callback: &MessageCallback, control_rx: &Receiver<()>) {
    let inbound = socket.raw_receiver();
    loop {
        crossbeam::channel::select! {
            recv(control_rx) -> _ => return,
            recv(inbound) -> raw => {
                let Ok(raw) = raw else { return };
                let Some(parts) = socket.finish_receive(raw) else { continue };
                let Some((envelope, body)) = split_envelope(parts) else {
                    log::warn!("[router] dropped request with malformed envelope");
                    continue;
                };
                if body.len() != 2 {
                    log::warn!("[router] dropped request with {} frames (want 2)", body.len());
                    continue;
                }
                let Ok(message_type) = std::str::from_utf8(&body[0]) else {
                    log::warn!("[router] dropped request with non-UTF-8 type frame");
                    continue;
                };
                let (reply_type, reply_payload) = run_callback(callback, message_type, &body[1]);
                let mut reply = envelope;
                reply.push(reply_type.into_bytes());
                reply.push(reply_payload);
                if let Err(e) = socket.send(reply) {
                    log::warn!("[router] reply failed: {}", e);
                }
            }
        }
    }
}

/// Splits `[identity..., delimiter, body...]` into the envelope (identity
/// frames plus delimiter) and the body.
fn split_envelope(parts: Vec<Frame>) -> Option<(Vec<Frame>, Vec<Frame>)> {
    let delimiter = parts.iter().position(Vec::is_empty)?;
    let body = parts[delimiter + 1..].to_vec();
    let mut envelope = parts;
    envelope.truncate(delimiter + 1);
    Some((envelope, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_splitting() {
        let parts = vec![
            b"client".to_vec(),
            Vec::new(),
            b"type".to_vec(),
            b"payload".to_vec(),
        ];
        let (envelope, body) = split_envelope(parts).expect("split");
        assert_eq!(envelope.len(), 2);
        assert_eq!(envelope[0], b"client".to_vec());
        assert!(envelope[1].is_empty());
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn missing_delimiter_is_rejected() {
        let parts = vec![b"client".to_vec(), b"type".to_vec()];
        assert!(split_envelope(parts).is_none());
    }

    #[test]
    fn start_requires_initialize() {
        let context = Context::new();
        let router = Router::new(&context);
        assert!(matches!(router.start(), Err(Error::NotInitialized(_))));
    }
}
