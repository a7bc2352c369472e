// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The ROUTER/DEALER forwarding worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::authentication::{self, Authenticator, SecurityLevel, ZapOptions};
use crate::error::{Error, Result};
use crate::messaging::transport::{Endpoint, Socket, SocketOptions, SocketType};
use crate::messaging::Context;

/// Router/dealer proxy configuration.
///
/// The frontend and backend may carry different ZAP options; a typical
/// deployment authenticates external clients strictly while the backend
/// worker pool runs a looser level.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    frontend_address: Option<String>,
    backend_address: Option<String>,
    frontend_high_water_mark: usize,
    backend_high_water_mark: usize,
    frontend_zap_options: ZapOptions,
    backend_zap_options: ZapOptions,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            frontend_address: None,
            backend_address: None,
            frontend_high_water_mark: 4096,
            backend_high_water_mark: 4096,
            frontend_zap_options: ZapOptions::new(),
            backend_zap_options: ZapOptions::new(),
        }
    }
}

impl ProxyOptions {
    /// Defaults: HWM 4096 on both sides, Grasslands on both sides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the frontend address clients connect to.
    pub fn set_frontend_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.frontend_address = Some(address.to_string());
        Ok(())
    }

    /// The frontend address.
    pub fn frontend_address(&self) -> Option<&str> {
        self.frontend_address.as_deref()
    }

    /// Sets the backend address repliers connect to.
    pub fn set_backend_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.backend_address = Some(address.to_string());
        Ok(())
    }

    /// The backend address.
    pub fn backend_address(&self) -> Option<&str> {
        self.backend_address.as_deref()
    }

    /// Sets the frontend high-water mark.
    pub fn set_frontend_high_water_mark(&mut self, hwm: usize) {
        self.frontend_high_water_mark = hwm.max(1);
    }

    /// Sets the backend high-water mark.
    pub fn set_backend_high_water_mark(&mut self, hwm: usize) {
        self.backend_high_water_mark = hwm.max(1);
    }

    /// Applies one set of authentication options to both sides.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.frontend_zap_options = zap_options.clone();
        self.backend_zap_options = zap_options.clone();
    }

    /// Sets frontend-only authentication options.
    pub fn set_frontend_zap_options(&mut self, zap_options: &ZapOptions) {
        self.frontend_zap_options = zap_options.clone();
    }

    /// Sets backend-only authentication options.
    pub fn set_backend_zap_options(&mut self, zap_options: &ZapOptions) {
        self.backend_zap_options = zap_options.clone();
    }

    /// The frontend authentication options.
    pub fn frontend_zap_options(&self) -> &ZapOptions {
        &self.frontend_zap_options
    }

    /// The backend authentication options.
    pub fn backend_zap_options(&self) -> &ZapOptions {
        &self.backend_zap_options
    }
}

/// A request/reply intermediary on a dedicated thread.
///
/// Frames from the router frontend keep their identity envelope as the
/// dealer deals them to a replier; replies route back by that envelope.
pub struct Proxy {
    context: Context,
    authenticator: Option<Arc<dyn Authenticator>>,
    auth_service: Mutex<Option<authentication::Service>>,
    frontend: Mutex<Option<Arc<Socket>>>,
    backend: Mutex<Option<Arc<Socket>>>,
    control_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    initialized: AtomicBool,
}

impl Proxy {
    /// Creates a proxy with no authenticator (Grasslands only).
    pub fn new(context: &Context) -> Self {
        Self::make(context, None)
    }

    /// Creates a proxy owning the given authenticator.
    pub fn with_authenticator(context: &Context, authenticator: Arc<dyn Authenticator>) -> Self {
        Self::make(context, Some(authenticator))
    }

    fn make(context: &Context, authenticator: Option<Arc<dyn Authenticator>>) -> Self {
        Self {
            context: context.clone(),
            authenticator,
            auth_service: Mutex::new(None),
            frontend: Mutex::new(None),
            backend: Mutex::new(None),
            control_tx: Mutex::new(None),
            worker: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            initialized: AtomicBool::new(false),
        }
    }

    /// Binds both sides and starts the authenticator when required.
    pub fn initialize(&self, options: &ProxyOptions) -> Result<()> {
        let frontend_address = options
            .frontend_address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("frontend address not set".into()))?;
        let backend_address = options
            .backend_address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("backend address not set".into()))?;

        let needs_auth = options.frontend_zap_options.security_level() != SecurityLevel::Grasslands
            || options.backend_zap_options.security_level() != SecurityLevel::Grasslands;
        let handle = if needs_auth {
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

        let mut frontend_options = SocketOptions::new();
        frontend_options.set_receive_high_water_mark(options.frontend_high_water_mark);
        frontend_options.set_send_high_water_mark(options.frontend_high_water_mark);
        frontend_options.set_zap_options(&options.frontend_zap_options);

        let mut backend_options = SocketOptions::new();
        backend_options.set_receive_high_water_mark(options.backend_high_water_mark);
        backend_options.set_send_high_water_mark(options.backend_high_water_mark);
        backend_options.set_zap_options(&options.backend_zap_options);

        let frontend = match &handle {
            Some(handle) => {
                Socket::with_authenticator(SocketType::Router, frontend_options, handle.clone())
            }
            None => Socket::new(SocketType::Router, frontend_options),
        };
        let backend = match &handle {
            Some(handle) => {
                Socket::with_authenticator(SocketType::Dealer, backend_options, handle.clone())
            }
            None => Socket::new(SocketType::Dealer, backend_options),
        };

        frontend.bind(&Endpoint::parse(frontend_address)?)?;
        backend.bind(&Endpoint::parse(backend_address)?)?;

        self.context.register_socket();
        self.context.register_socket();
        *self.frontend.lock() = Some(Arc::new(frontend));
        *self.backend.lock() = Some(Arc::new(backend));
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// True after a successful [`Self::initialize`].
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Starts the forwarding worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `initialize`; starting an
    /// already running proxy is rejected.
    pub fn start(&self) -> Result<()> {
        let (frontend, backend) = match (self.frontend.lock().clone(), self.backend.lock().clone())
        {
            (Some(frontend), Some(backend)) => (frontend, backend),
            _ => return Err(Error::NotInitialized("router/dealer proxy".into())),
        };
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidArgument("proxy already running".into()));
        }
        let (control_tx, control_rx) = unbounded();
        *self.control_tx.lock() = Some(control_tx);
        let running = self.running.clone();
        let worker = std::thread::Builder::new()
            .name("umps-routerdealer".to_string())
            .spawn(move || {
                forward(&frontend, &backend, &control_rx);
                frontend.close();
                backend.close();
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| Error::AlgorithmFailure(format!("spawn proxy worker: {}", e)))?;
        *self.worker.lock() = Some(worker);
        Ok(())
    }

    /// True while the worker is forwarding.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the worker and tears the sockets down. Idempotent; after
    /// `stop()` the proxy must be re-initialized before `start()`.
    pub fn stop(&self) {
        if let Some(control_tx) = self.control_tx.lock().take() {
            let _ = control_tx.send(());
        }
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
        if self.frontend.lock().take().is_some() {
            self.context.deregister_socket();
        }
        if self.backend.lock().take().is_some() {
            self.context.deregister_socket();
        }
        if let Some(mut service) = self.auth_service.lock().take() {
            service.stop();
        }
        self.initialized.store(false, Ordering::SeqCst);
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The poll loop: requests dealt to the backend, replies routed back.
fn forward(frontend: &Arc<Socket>, backend: &Arc<Socket>, control_rx: &Receiver<()>) {
    let frontend_rx = frontend.raw_receiver();
    let backend_rx = backend.raw_receiver();
    loop {
        crossbeam::channel::select! {
            recv(control_rx) -> _ => return,
            recv(frontend_rx) -> raw => {
                let Ok(raw) = raw else { return };
                if let Some(parts) = frontend.finish_receive(raw) {
                    if let Err(e) = backend.send(parts) {
                        log::warn!("[router/dealer] deal to backend failed: {}", e);
                    }
                }
            }
            recv(backend_rx) -> raw => {
                let Ok(raw) = raw else { return };
                if let Some(parts) = backend.finish_receive(raw) {
                    if let Err(e) = frontend.send(parts) {
                        log::warn!("[router/dealer] route reply failed: {}", e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_requires_initialize() {
        let context = Context::new();
        let proxy = Proxy::new(&context);
        assert!(matches!(proxy.start(), Err(Error::NotInitialized(_))));
    }

    #[test]
    fn double_stop_is_a_no_op() {
        let context = Context::new();
        let proxy = Proxy::new(&context);
        let mut options = ProxyOptions::new();
        let base = 46000 + fastrand::u16(0..5000);
        options
            .set_frontend_address(&format!("tcp://127.0.0.1:{}", base))
            .unwrap();
        options
            .set_backend_address(&format!("tcp://127.0.0.1:{}", base + 1))
            .unwrap();
        proxy.initialize(&options).expect("initialize");
        proxy.start().expect("start");
        proxy.stop();
        proxy.stop();
        assert!(!proxy.is_running());
    }
}
