// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The aggregating proxy with liveness tracking.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::authentication::{self, Authenticator, SecurityLevel, ZapOptions};
use crate::error::{Error, Result};
use crate::message_formats::{Failure, Message};
use crate::messaging::transport::{Endpoint, Frame, Socket, SocketOptions, SocketType};
use crate::messaging::Context;
use crate::proxy_services::command::{
    AvailableModulesRequest, AvailableModulesResponse, ModuleState, PingRequest, PingResponse,
    RegistrationRequest, RegistrationResponse, RegistrationReturnCode, RegistrationType,
};
use crate::services::command::ModuleDetails;

/// Remote command proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    frontend_address: Option<String>,
    backend_address: Option<String>,
    frontend_high_water_mark: usize,
    backend_high_water_mark: usize,
    ping_interval: Duration,
    max_missed_pings: u32,
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
            ping_interval: Duration::from_secs(5),
            max_missed_pings: 3,
            frontend_zap_options: ZapOptions::new(),
            backend_zap_options: ZapOptions::new(),
        }
    }
}

impl ProxyOptions {
    /// Defaults: 5 s ping interval, dead after 3 misses, Grasslands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the frontend address clients connect to.
    pub fn set_frontend_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.frontend_address = Some(address.to_string());
        Ok(())
    }

    /// Sets the backend address module repliers connect to.
    pub fn set_backend_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.backend_address = Some(address.to_string());
        Ok(())
    }

    /// Sets the frontend high-water mark.
    pub fn set_frontend_high_water_mark(&mut self, hwm: usize) {
        self.frontend_high_water_mark = hwm.max(1);
    }

    /// Sets the backend high-water mark.
    pub fn set_backend_high_water_mark(&mut self, hwm: usize) {
        self.backend_high_water_mark = hwm.max(1);
    }

    /// Sets how often each module is pinged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the interval is zero.
    pub fn set_ping_interval(&mut self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::InvalidArgument("ping interval is zero".into()));
        }
        self.ping_interval = interval;
        Ok(())
    }

    /// The ping interval.
    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    /// Sets how many consecutive missed pings mark a module dead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the count is zero.
    pub fn set_max_missed_pings(&mut self, max_missed_pings: u32) -> Result<()> {
        if max_missed_pings == 0 {
            return Err(Error::InvalidArgument("missed ping count is zero".into()));
        }
        self.max_missed_pings = max_missed_pings;
        Ok(())
    }

    /// The miss budget.
    pub fn max_missed_pings(&self) -> u32 {
        self.max_missed_pings
    }

    /// Sets frontend authentication options.
    pub fn set_frontend_zap_options(&mut self, zap_options: &ZapOptions) {
        self.frontend_zap_options = zap_options.clone();
    }

    /// Sets backend authentication options.
    pub fn set_backend_zap_options(&mut self, zap_options: &ZapOptions) {
        self.backend_zap_options = zap_options.clone();
    }
}

struct ModuleEntry {
    details: ModuleDetails,
    routing_id: Vec<u8>,
    state: ModuleState,
    missed_pings: u32,
    last_ping: Instant,
    pending_clients: VecDeque<Vec<u8>>,
}

type ModuleTable = Arc<Mutex<HashMap<String, ModuleEntry>>>;

/// The remote command proxy.
///
/// The backend is a router (not a dealer) because commands address a
/// *named* module; replies are correlated to waiting clients FIFO per
/// module. Cross-module ordering is unspecified.
pub struct Proxy {
    context: Context,
    authenticator: Option<Arc<dyn Authenticator>>,
    auth_service: Mutex<Option<authentication::Service>>,
    frontend: Mutex<Option<Arc<Socket>>>,
    backend: Mutex<Option<Arc<Socket>>>,
    modules: ModuleTable,
    options: Mutex<ProxyOptions>,
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
            modules: Arc::new(Mutex::new(HashMap::new())),
            options: Mutex::new(ProxyOptions::default()),
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
                Socket::with_authenticator(SocketType::Router, backend_options, handle.clone())
            }
            None => Socket::new(SocketType::Router, backend_options),
        };

        frontend.bind(&Endpoint::parse(frontend_address)?)?;
        backend.bind(&Endpoint::parse(backend_address)?)?;

        self.context.register_socket();
        self.context.register_socket();
        *self.frontend.lock() = Some(Arc::new(frontend));
        *self.backend.lock() = Some(Arc::new(backend));
        *self.options.lock() = options.clone();
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// True after a successful [`Self::initialize`].
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Starts the forwarding and liveness worker.
    pub fn start(&self) -> Result<()> {
        let (frontend, backend) = match (self.frontend.lock().clone(), self.backend.lock().clone())
        {
            (Some(frontend), Some(backend)) => (frontend, backend),
            _ => return Err(Error::NotInitialized("command proxy".into())),
        };
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidArgument("proxy already running".into()));
        }
        let modules = self.modules.clone();
        let options = self.options.lock().clone();
        let (control_tx, control_rx) = unbounded();
        *self.control_tx.lock() = Some(control_tx);
        let running = self.running.clone();
        let worker = std::thread::Builder::new()
            .name("umps-command-proxy".to_string())
            .spawn(move || {
                serve(&frontend, &backend, &modules, &options, &control_rx);
                frontend.close();
                backend.close();
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| Error::AlgorithmFailure(format!("spawn proxy worker: {}", e)))?;
        *self.worker.lock() = Some(worker);
        Ok(())
    }

    /// True while the worker is serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the worker and tears the sockets down. Idempotent.
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
        self.modules.lock().clear();
        self.initialized.store(false, Ordering::SeqCst);
    }

    /// The liveness state of a registered module, if known.
    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.modules.lock().get(name).map(|entry| entry.state)
    }

    /// The modules currently answering pings.
    pub fn available_modules(&self) -> Vec<ModuleDetails> {
        live_modules(&self.modules.lock())
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.stop();
    }
}

fn live_modules(modules: &HashMap<String, ModuleEntry>) -> Vec<ModuleDetails> {
    let mut listing: Vec<ModuleDetails> = modules
        .values()
        .filter(|entry| {
            matches!(
                entry.state,
                ModuleState::Registering | ModuleState::Alive | ModuleState::Missed
            )
        })
        .map(|entry| entry.details.clone())
        .collect();
    listing.sort_by(|a, b| a.name().cmp(b.name()));
    listing
}

fn serve(
    frontend: &Arc<Socket>,
    backend: &Arc<Socket>,
    modules: &ModuleTable,
    options: &ProxyOptions,
    control_rx: &Receiver<()>,
) {
    let frontend_rx = frontend.raw_receiver();
    let backend_rx = backend.raw_receiver();
    let tick_period = (options.ping_interval / 4).max(Duration::from_millis(50));
    let ticker = crossbeam::channel::tick(tick_period);
    loop {
        crossbeam::channel::select! {
            recv(control_rx) -> _ => return,
            recv(frontend_rx) -> raw => {
                let Ok(raw) = raw else { return };
                if let Some(parts) = frontend.finish_receive(raw) {
                    handle_frontend(frontend, backend, modules, parts);
                }
            }
            recv(backend_rx) -> raw => {
                let Ok(raw) = raw else { return };
                if let Some(parts) = backend.finish_receive(raw) {
                    handle_backend(frontend, backend, modules, parts);
                }
            }
            recv(ticker) -> _ => {
                ping_modules(backend, modules, options);
            }
        }
    }
}

/// Client traffic: module listings answered here, everything else
/// forwarded to the addressed module.
fn handle_frontend(
    frontend: &Arc<Socket>,
    backend: &Arc<Socket>,
    modules: &ModuleTable,
    parts: Vec<Frame>,
) {
    let Some((client, body)) = split_router_frames(parts) else {
        log::warn!("[command-proxy] dropped malformed client frames");
        return;
    };

    let listing_type = AvailableModulesRequest::new();
    if body.len() == 2 && body[0] == listing_type.message_type().as_bytes() {
        let mut request = listing_type;
        let identifier = request
            .from_bytes(&body[1])
            .map(|()| request.identifier())
            .unwrap_or(0);
        let mut response = AvailableModulesResponse::new();
        response.set_identifier(identifier);
        response.set_modules(live_modules(&modules.lock()));
        reply_to_client(frontend, &client, &response);
        return;
    }

    if body.len() != 3 {
        reply_to_client(
            frontend,
            &client,
            &Failure::from_details("requests must be [module, type, payload] frames"),
        );
        return;
    }
    let module_name = String::from_utf8_lossy(&body[0]).into_owned();
    let routing_id = {
        let mut table = modules.lock();
        table
            .get_mut(&module_name)
            .filter(|entry| entry.state != ModuleState::Dead)
            .map(|entry| {
                entry.pending_clients.push_back(client.clone());
                entry.routing_id.clone()
            })
    };
    let Some(routing_id) = routing_id else {
        reply_to_client(
            frontend,
            &client,
            &Failure::from_details(&format!("module {} is not available", module_name)),
        );
        return;
    };
    let forwarded = vec![
        routing_id,
        Vec::new(),
        body[1].clone(),
        body[2].clone(),
    ];
    if let Err(e) = backend.send(forwarded) {
        log::warn!("[command-proxy] forward to {} failed: {}", module_name, e);
        if let Some(entry) = modules.lock().get_mut(&module_name) {
            entry.pending_clients.pop_back();
        }
        reply_to_client(
            frontend,
            &client,
            &Failure::from_details(&format!("could not reach module {}", module_name)),
        );
    }
}

/// Module traffic: registrations and pings absorbed here, replies routed
/// back to the waiting client.
fn handle_backend(
    frontend: &Arc<Socket>,
    backend: &Arc<Socket>,
    modules: &ModuleTable,
    parts: Vec<Frame>,
) {
    let Some((module_rid, body)) = split_router_frames(parts) else {
        log::warn!("[command-proxy] dropped malformed module frames");
        return;
    };
    if body.len() != 2 {
        log::warn!("[command-proxy] dropped module message with {} frames", body.len());
        return;
    }
    let registration_type = RegistrationRequest::new();
    let pong_type = PingResponse::new();

    if body[0] == registration_type.message_type().as_bytes() {
        let mut request = registration_type;
        let mut response = RegistrationResponse::new();
        match request.from_bytes(&body[1]) {
            Ok(()) => match request.module_details() {
                Some(details) => {
                    let code = apply_registration(
                        modules,
                        details,
                        &module_rid,
                        request.registration_type(),
                    );
                    response.set_return_code(code);
                }
                None => response.set_return_code(RegistrationReturnCode::InvalidRequest),
            },
            Err(_) => response.set_return_code(RegistrationReturnCode::InvalidRequest),
        }
        send_to_module(backend, &module_rid, &response);
        return;
    }

    if body[0] == pong_type.message_type().as_bytes() {
        let mut table = modules.lock();
        if let Some(entry) = table
            .values_mut()
            .find(|entry| entry.routing_id == module_rid)
        {
            entry.missed_pings = 0;
            entry.state = ModuleState::Alive;
        }
        return;
    }

    // A command (or listing) reply: hand it to the oldest waiting client.
    let client = {
        let mut table = modules.lock();
        table
            .values_mut()
            .find(|entry| entry.routing_id == module_rid)
            .and_then(|entry| entry.pending_clients.pop_front())
    };
    match client {
        Some(client) => {
            let framed = vec![client, Vec::new(), body[0].clone(), body[1].clone()];
            if let Err(e) = frontend.send(framed) {
                log::warn!("[command-proxy] reply routing failed: {}", e);
            }
        }
        None => log::warn!("[command-proxy] reply from module with no waiting client"),
    }
}

fn apply_registration(
    modules: &ModuleTable,
    details: &ModuleDetails,
    module_rid: &[u8],
    registration_type: RegistrationType,
) -> RegistrationReturnCode {
    let name = details.name().to_string();
    let mut table = modules.lock();
    match registration_type {
        RegistrationType::Register => {
            if let Some(existing) = table.get(&name) {
                if existing.state != ModuleState::Dead && existing.routing_id != module_rid {
                    return RegistrationReturnCode::Exists;
                }
            }
            log::info!("[command-proxy] registered module {}", name);
            table.insert(
                name,
                ModuleEntry {
                    details: details.clone(),
                    routing_id: module_rid.to_vec(),
                    state: ModuleState::Alive,
                    missed_pings: 0,
                    last_ping: Instant::now(),
                    pending_clients: VecDeque::new(),
                },
            );
            RegistrationReturnCode::Success
        }
        RegistrationType::Deregister => {
            if table
                .get(&name)
                .is_some_and(|entry| entry.routing_id == module_rid)
            {
                log::info!("[command-proxy] deregistered module {}", name);
                table.remove(&name);
            }
            RegistrationReturnCode::Success
        }
    }
}

/// Sends due pings; marks modules dead once the miss budget is spent.
fn ping_modules(backend: &Arc<Socket>, modules: &ModuleTable, options: &ProxyOptions) {
    let mut due: Vec<(String, Vec<u8>)> = Vec::new();
    {
        let mut table = modules.lock();
        for (name, entry) in table.iter_mut() {
            if entry.state == ModuleState::Dead {
                continue;
            }
            if entry.last_ping.elapsed() < options.ping_interval {
                continue;
            }
            if entry.missed_pings >= options.max_missed_pings {
                log::warn!(
                    "[command-proxy] module {} missed {} pings; marking dead",
                    name,
                    entry.missed_pings
                );
                entry.state = ModuleState::Dead;
                entry.pending_clients.clear();
                continue;
            }
            entry.missed_pings += 1;
            entry.state = if entry.missed_pings > 1 {
                ModuleState::Missed
            } else {
                ModuleState::Alive
            };
            entry.last_ping = Instant::now();
            due.push((name.clone(), entry.routing_id.clone()));
        }
    }
    for (name, routing_id) in due {
        let request = PingRequest::new();
        match request.to_bytes() {
            Ok(payload) => {
                let framed = vec![
                    routing_id,
                    Vec::new(),
                    request.message_type().as_bytes().to_vec(),
                    payload,
                ];
                if let Err(e) = backend.send(framed) {
                    log::debug!("[command-proxy] ping to {} failed: {}", name, e);
                }
            }
            Err(e) => log::debug!("[command-proxy] ping encoding failed: {}", e),
        }
    }
}

fn reply_to_client(frontend: &Arc<Socket>, client: &[u8], message: &dyn Message) {
    match message.to_bytes() {
        Ok(payload) => {
            let framed = vec![
                client.to_vec(),
                Vec::new(),
                message.message_type().as_bytes().to_vec(),
                payload,
            ];
            if let Err(e) = frontend.send(framed) {
                log::warn!("[command-proxy] reply to client failed: {}", e);
            }
        }
        Err(e) => log::warn!("[command-proxy] reply encoding failed: {}", e),
    }
}

fn send_to_module(backend: &Arc<Socket>, module_rid: &[u8], message: &dyn Message) {
    match message.to_bytes() {
        Ok(payload) => {
            let framed = vec![
                module_rid.to_vec(),
                Vec::new(),
                message.message_type().as_bytes().to_vec(),
                payload,
            ];
            if let Err(e) = backend.send(framed) {
                log::warn!("[command-proxy] send to module failed: {}", e);
            }
        }
        Err(e) => log::warn!("[command-proxy] encoding failed: {}", e),
    }
}

/// Splits `[peer, delimiter, body...]`.
fn split_router_frames(parts: Vec<Frame>) -> Option<(Vec<u8>, Vec<Frame>)> {
    if parts.len() < 3 || !parts[1].is_empty() {
        return None;
    }
    let peer = parts[0].clone();
    Some((peer, parts[2..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_state_machine() {
        let modules: ModuleTable = Arc::new(Mutex::new(HashMap::new()));
        let mut details = ModuleDetails::new();
        details.set_name("scanner").unwrap();

        let code =
            apply_registration(&modules, &details, b"scanner", RegistrationType::Register);
        assert_eq!(code, RegistrationReturnCode::Success);
        assert_eq!(modules.lock().get("scanner").unwrap().state, ModuleState::Alive);

        // A different connection cannot steal a live name.
        let code = apply_registration(&modules, &details, b"imposter", RegistrationType::Register);
        assert_eq!(code, RegistrationReturnCode::Exists);

        // The same connection may re-register.
        let code = apply_registration(&modules, &details, b"scanner", RegistrationType::Register);
        assert_eq!(code, RegistrationReturnCode::Success);

        let code =
            apply_registration(&modules, &details, b"scanner", RegistrationType::Deregister);
        assert_eq!(code, RegistrationReturnCode::Success);
        assert!(modules.lock().is_empty());
    }

    #[test]
    fn dead_modules_leave_the_listing() {
        let modules: ModuleTable = Arc::new(Mutex::new(HashMap::new()));
        let mut details = ModuleDetails::new();
        details.set_name("picker").unwrap();
        apply_registration(&modules, &details, b"picker", RegistrationType::Register);
        assert_eq!(live_modules(&modules.lock()).len(), 1);

        modules.lock().get_mut("picker").unwrap().state = ModuleState::Dead;
        assert!(live_modules(&modules.lock()).is_empty());
    }

    #[test]
    fn router_frame_splitting() {
        let parts = vec![b"peer".to_vec(), Vec::new(), b"type".to_vec(), b"x".to_vec()];
        let (peer, body) = split_router_frames(parts).expect("split");
        assert_eq!(peer, b"peer".to_vec());
        assert_eq!(body.len(), 2);

        assert!(split_router_frames(vec![b"peer".to_vec(), b"no-delim".to_vec()]).is_none());
    }
}
