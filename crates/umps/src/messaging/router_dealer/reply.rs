// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The reply worker behind a dealer backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::messaging::transport::{Endpoint, Socket, SocketOptions, SocketType};
use crate::messaging::{run_callback, Context, MessageCallback};

/// Reply worker configuration.
#[derive(Clone)]
pub struct ReplyOptions {
    address: Option<String>,
    callback: Option<MessageCallback>,
    high_water_mark: usize,
    routing_identifier: Option<Vec<u8>>,
    zap_options: ZapOptions,
}

impl Default for ReplyOptions {
    fn default() -> Self {
        Self {
            address: None,
            callback: None,
            high_water_mark: 4096,
            routing_identifier: None,
            zap_options: ZapOptions::new(),
        }
    }
}

impl ReplyOptions {
    /// Defaults: HWM 4096, Grasslands, routing identity derived from a
    /// unique local token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dealer backend address to connect to.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// The backend address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Sets the callback that turns a request into a reply. Registered
    /// once; never mutated afterwards.
    pub fn set_callback(&mut self, callback: MessageCallback) {
        self.callback = Some(callback);
    }

    /// Sets the inbound/outbound high-water mark.
    pub fn set_high_water_mark(&mut self, hwm: usize) {
        self.high_water_mark = hwm.max(1);
    }

    /// Overrides the worker's routing identity.
    pub fn set_routing_identifier(&mut self, identifier: &[u8]) -> Result<()> {
        if identifier.is_empty() {
            return Err(Error::InvalidArgument("routing identifier is empty".into()));
        }
        self.routing_identifier = Some(identifier.to_vec());
        Ok(())
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

/// A worker that serves requests dealt to it by a router/dealer proxy.
///
/// Multiple repliers on the same backend load-balance the request stream.
pub struct Reply {
    context: Context,
    socket: Mutex<Option<Arc<Socket>>>,
    callback: Mutex<Option<MessageCallback>>,
    control_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    initialized: AtomicBool,
}

impl Reply {
    /// Creates an uninitialized reply worker under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            socket: Mutex::new(None),
            callback: Mutex::new(None),
            control_tx: Mutex::new(None),
            worker: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            initialized: AtomicBool::new(false),
        }
    }

    /// Connects to the dealer backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the address or callback is
    /// missing.
    pub fn initialize(&self, options: &ReplyOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("replier address not set".into()))?;
        let callback = options
            .callback
            .clone()
            .ok_or_else(|| Error::InvalidArgument("replier callback not set".into()))?;

        let mut socket_options = SocketOptions::new();
        socket_options.set_receive_high_water_mark(options.high_water_mark);
        socket_options.set_send_high_water_mark(options.high_water_mark);
        socket_options.set_zap_options(&options.zap_options);
        if let Some(identifier) = options.routing_identifier.as_deref() {
            socket_options.set_routing_identifier(identifier)?;
        }

        let socket = Socket::new(SocketType::Reply, socket_options);
        socket.connect(&Endpoint::parse(address)?)?;

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

    /// Starts the worker loop.
    pub fn start(&self) -> Result<()> {
        let (socket, callback) = match (self.socket.lock().clone(), self.callback.lock().clone()) {
            (Some(socket), Some(callback)) => (socket, callback),
            _ => return Err(Error::NotInitialized("reply worker".into())),
        };
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidArgument("reply worker already running".into()));
        }
        let (control_tx, control_rx) = unbounded();
        *self.control_tx.lock() = Some(control_tx);
        let running = self.running.clone();
        let worker = std::thread::Builder::new()
            .name("umps-reply".to_string())
            .spawn(move || {
                serve(&socket, &callback, &control_rx);
                socket.close();
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| Error::AlgorithmFailure(format!("spawn reply worker: {}", e)))?;
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
        self.initialized.store(false, Ordering::SeqCst);
    }
}

impl Drop for Reply {
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
                if parts.len() != 2 {
                    log::warn!("[reply] dropped request with {} frames (want 2)", parts.len());
                    continue;
                }
                let Ok(message_type) = std::str::from_utf8(&parts[0]) else {
                    log::warn!("[reply] dropped request with non-UTF-8 type frame");
                    continue;
                };
                let (reply_type, reply_payload) = run_callback(callback, message_type, &parts[1]);
                if let Err(e) = socket.send(vec![reply_type.into_bytes(), reply_payload]) {
                    log::warn!("[reply] send failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message_formats::{Message, Text};

    #[test]
    fn initialize_requires_address_and_callback() {
        let context = Context::new();
        let reply = Reply::new(&context);
        let mut options = ReplyOptions::new();
        assert!(reply.initialize(&options).is_err());

        options.set_address("tcp://127.0.0.1:59910").unwrap();
        assert!(reply.initialize(&options).is_err());

        options.set_callback(Arc::new(|_type, payload| {
            let mut text = Text::new();
            text.from_bytes(payload)?;
            Ok(Box::new(text) as Box<dyn Message>)
        }));
        assert!(reply.initialize(&options).is_ok());
        reply.stop();
    }
}
