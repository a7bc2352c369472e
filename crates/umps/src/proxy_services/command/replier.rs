// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The module-side worker of the remote command plane.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::Message;
use crate::messaging::transport::{Endpoint, Frame, Socket, SocketOptions, SocketType};
use crate::messaging::{run_callback, Context, MessageCallback};
use crate::proxy_services::command::{
    PingRequest, PingResponse, RegistrationRequest, RegistrationType,
};
use crate::services::command::ModuleDetails;

/// Module-side replier configuration.
#[derive(Clone)]
pub struct ReplierOptions {
    address: Option<String>,
    module_details: Option<ModuleDetails>,
    callback: Option<MessageCallback>,
    zap_options: ZapOptions,
}

impl Default for ReplierOptions {
    fn default() -> Self {
        Self {
            address: None,
            module_details: None,
            callback: None,
            zap_options: ZapOptions::new(),
        }
    }
}

impl ReplierOptions {
    /// Defaults: Grasslands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the proxy backend address to connect to.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// Sets the module's identity; its name doubles as the routing
    /// identity clients address.
    pub fn set_module_details(&mut self, details: &ModuleDetails) -> Result<()> {
        if details.name().is_empty() {
            return Err(Error::InvalidArgument("module name not set".into()));
        }
        self.module_details = Some(details.clone());
        Ok(())
    }

    /// Sets the callback answering command-plane requests. Pings are
    /// answered by the replier itself.
    pub fn set_callback(&mut self, callback: MessageCallback) {
        self.callback = Some(callback);
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }
}

/// Connects a module to the remote command proxy.
///
/// On `start()` the worker registers the module, then serves: pings are
/// acknowledged internally, everything else goes through the callback.
/// `stop()` deregisters (best effort) before tearing down.
pub struct Replier {
    context: Context,
    socket: Mutex<Option<Arc<Socket>>>,
    details: Mutex<Option<ModuleDetails>>,
    callback: Mutex<Option<MessageCallback>>,
    control_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    initialized: AtomicBool,
}

impl Replier {
    /// Creates an uninitialized replier under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            socket: Mutex::new(None),
            details: Mutex::new(None),
            callback: Mutex::new(None),
            control_tx: Mutex::new(None),
            worker: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            initialized: AtomicBool::new(false),
        }
    }

    /// Connects to the proxy backend.
    pub fn initialize(&self, options: &ReplierOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("replier address not set".into()))?;
        let details = options
            .module_details
            .clone()
            .ok_or_else(|| Error::InvalidArgument("module details not set".into()))?;
        let callback = options
            .callback
            .clone()
            .ok_or_else(|| Error::InvalidArgument("replier callback not set".into()))?;

        let mut socket_options = SocketOptions::new();
        socket_options.set_zap_options(&options.zap_options);
        socket_options.set_routing_identifier(details.name().as_bytes())?;

        let socket = Socket::new(SocketType::Dealer, socket_options);
        socket.connect(&Endpoint::parse(address)?)?;

        self.context.register_socket();
        *self.socket.lock() = Some(Arc::new(socket));
        *self.details.lock() = Some(details);
        *self.callback.lock() = Some(callback);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Registers the module and starts serving.
    pub fn start(&self) -> Result<()> {
        let (socket, details, callback) = match (
            self.socket.lock().clone(),
            self.details.lock().clone(),
            self.callback.lock().clone(),
        ) {
            (Some(socket), Some(details), Some(callback)) => (socket, details, callback),
            _ => return Err(Error::NotInitialized("command replier".into())),
        };
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidArgument("replier already running".into()));
        }
        let (control_tx, control_rx) = unbounded();
        *self.control_tx.lock() = Some(control_tx);
        let running = self.running.clone();
        let worker = std::thread::Builder::new()
            .name("umps-command-replier".to_string())
            .spawn(move || {
                serve(&socket, &details, &callback, &control_rx);
                socket.close();
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| Error::AlgorithmFailure(format!("spawn replier: {}", e)))?;
        *self.worker.lock() = Some(worker);
        Ok(())
    }

    /// True while the worker is serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Deregisters and stops the worker. Idempotent.
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

impl Drop for Replier {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(
    socket: &Arc<Socket>,
    details: &ModuleDetails,
    callback: &MessageCallback,
    control_rx: &Receiver<()>,
) {
    // The proxy may still be coming up; give registration a few tries.
    let mut registered = false;
    for attempt in 0..5 {
        match send_registration(socket, details, RegistrationType::Register) {
            Ok(()) => {
                registered = true;
                break;
            }
            Err(e) => {
                log::debug!("[command-replier] registration attempt {} failed: {}", attempt, e);
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
        }
    }
    if !registered {
        log::error!("[command-replier] could not register with the proxy");
        return;
    }

    let inbound = socket.raw_receiver();
    loop {
        crossbeam::channel::select! {
            recv(control_rx) -> _ => break,
            recv(inbound) -> raw => {
                let Ok(raw) = raw else { break };
                let Some(parts) = socket.finish_receive(raw) else { continue };
                let Some(body) = strip_delimiter(parts) else {
                    log::warn!("[command-replier] dropped frames without delimiter");
                    continue;
                };
                if body.len() != 2 {
                    log::warn!("[command-replier] dropped message with {} frames", body.len());
                    continue;
                }
                handle_request(socket, callback, &body);
            }
        }
    }

    if let Err(e) = send_registration(socket, details, RegistrationType::Deregister) {
        log::debug!("[command-replier] deregistration failed: {}", e);
    }
}

fn handle_request(socket: &Arc<Socket>, callback: &MessageCallback, body: &[Frame]) {
    let ping_type = PingRequest::new();
    if body[0] == ping_type.message_type().as_bytes() {
        let mut ping = ping_type;
        let mut pong = PingResponse::new();
        if ping.from_bytes(&body[1]).is_ok() {
            pong.set_time_microseconds(ping.time_microseconds());
        }
        send_message(socket, &pong);
        return;
    }
    // Registration acknowledgements need no action.
    let registration_ack = crate::proxy_services::command::RegistrationResponse::new();
    if body[0] == registration_ack.message_type().as_bytes() {
        return;
    }
    let Ok(message_type) = std::str::from_utf8(&body[0]) else {
        log::warn!("[command-replier] dropped request with non-UTF-8 type frame");
        return;
    };
    let (reply_type, reply_payload) = run_callback(callback, message_type, &body[1]);
    let framed = vec![Vec::new(), reply_type.into_bytes(), reply_payload];
    if let Err(e) = socket.send(framed) {
        log::warn!("[command-replier] reply failed: {}", e);
    }
}

fn send_registration(
    socket: &Arc<Socket>,
    details: &ModuleDetails,
    registration_type: RegistrationType,
) -> crate::error::Result<()> {
    let mut request = RegistrationRequest::new();
    request.set_module_details(details)?;
    request.set_registration_type(registration_type);
    send_message_checked(socket, &request)
}

fn send_message(socket: &Arc<Socket>, message: &dyn Message) {
    if let Err(e) = send_message_checked(socket, message) {
        log::warn!("[command-replier] send failed: {}", e);
    }
}

fn send_message_checked(socket: &Arc<Socket>, message: &dyn Message) -> crate::error::Result<()> {
    let payload = message.to_bytes()?;
    socket.send(vec![
        Vec::new(),
        message.message_type().as_bytes().to_vec(),
        payload,
    ])
}

fn strip_delimiter(parts: Vec<Frame>) -> Option<Vec<Frame>> {
    if parts.first()?.is_empty() {
        Some(parts[1..].to_vec())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_requires_everything() {
        let context = Context::new();
        let replier = Replier::new(&context);
        let mut options = ReplierOptions::new();
        assert!(replier.initialize(&options).is_err());

        options.set_address("tcp://127.0.0.1:59970").unwrap();
        assert!(replier.initialize(&options).is_err());

        let mut details = ModuleDetails::new();
        details.set_name("scanner").unwrap();
        options.set_module_details(&details).unwrap();
        assert!(replier.initialize(&options).is_err());

        options.set_callback(Arc::new(|_type, _payload| {
            Ok(Box::new(crate::message_formats::Text::new()) as Box<dyn Message>)
        }));
        assert!(replier.initialize(&options).is_ok());
        replier.stop();
    }

    #[test]
    fn delimiter_stripping() {
        let body = strip_delimiter(vec![Vec::new(), b"type".to_vec(), b"x".to_vec()]);
        assert_eq!(body.unwrap().len(), 2);
        assert!(strip_delimiter(vec![b"nope".to_vec()]).is_none());
    }
}
