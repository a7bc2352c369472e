// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background authenticator worker.
//!
//! Sockets never call an [`Authenticator`] directly. The proxy or service
//! that owns the authenticator starts a [`Service`]; the transport holds a
//! cloneable [`AuthenticatorHandle`] (the in-process authentication
//! endpoint) and submits one request per new peer. Termination is one-way:
//! the owner stops the service, which drains and joins the worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};

use crate::authentication::authenticator::OK_STATUS;
use crate::authentication::{
    AuthenticationRequest, AuthenticationVerdict, Authenticator, Mechanism, SecurityLevel,
};
use crate::error::{Error, Result};

const VERDICT_TIMEOUT: Duration = Duration::from_secs(5);

enum Command {
    Authenticate(AuthenticationRequest, Sender<AuthenticationVerdict>),
    Stop,
}

/// The in-process endpoint the transport submits peers to.
#[derive(Clone)]
pub struct AuthenticatorHandle {
    tx: Sender<Command>,
}

impl AuthenticatorHandle {
    /// Submits a peer for validation and waits for the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] when the service has stopped and
    /// [`Error::Timeout`] when no verdict arrives in time.
    pub fn authenticate(&self, request: AuthenticationRequest) -> Result<AuthenticationVerdict> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(Command::Authenticate(request, reply_tx))
            .map_err(|_| Error::NotRunning("authenticator service stopped".into()))?;
        match reply_rx.recv_timeout(VERDICT_TIMEOUT) {
            Ok(verdict) => Ok(verdict),
            Err(crossbeam::channel::RecvTimeoutError::Timeout) => Err(Error::Timeout),
            Err(crossbeam::channel::RecvTimeoutError::Disconnected) => {
                Err(Error::NotRunning("authenticator service stopped".into()))
            }
        }
    }
}

/// A background thread answering authentication requests.
pub struct Service {
    tx: Sender<Command>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Service {
    /// Starts the worker for the given authenticator.
    pub fn start(authenticator: Arc<dyn Authenticator>) -> Result<Self> {
        let (tx, rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = running.clone();
        let thread = std::thread::Builder::new()
            .name("umps-authenticator".to_string())
            .spawn(move || {
                run(&rx, authenticator.as_ref());
                worker_running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| Error::AlgorithmFailure(format!("spawn authenticator: {}", e)))?;
        Ok(Self {
            tx,
            running,
            thread: Some(thread),
        })
    }

    /// The endpoint sockets submit peers to.
    pub fn handle(&self) -> AuthenticatorHandle {
        AuthenticatorHandle {
            tx: self.tx.clone(),
        }
    }

    /// True while the worker is serving requests.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the worker. Idempotent.
    pub fn stop(&mut self) {
        let _ = self.tx.send(Command::Stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(rx: &Receiver<Command>, authenticator: &dyn Authenticator) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Authenticate(request, reply_tx) => {
                let verdict = evaluate(authenticator, &request);
                if !verdict.is_ok() {
                    log::warn!(
                        "[authenticator] denied {} on domain {}: {} {}",
                        request.address,
                        request.domain,
                        verdict.status,
                        verdict.text
                    );
                }
                let _ = reply_tx.send(verdict);
            }
            Command::Stop => break,
        }
    }
}

/// Combines the authenticator's checks per the socket's security level.
fn evaluate(
    authenticator: &dyn Authenticator,
    request: &AuthenticationRequest,
) -> AuthenticationVerdict {
    if request.security_level == SecurityLevel::Grasslands {
        return AuthenticationVerdict::allowed("", authenticator.minimum_user_privileges());
    }

    let (status, text) = authenticator.is_blacklisted(&request.address);
    if status != OK_STATUS {
        return AuthenticationVerdict::denied(status, text);
    }
    let (status, text) = authenticator.is_whitelisted(&request.address);
    if status != OK_STATUS {
        return AuthenticationVerdict::denied(status, text);
    }

    match request.security_level {
        SecurityLevel::Grasslands | SecurityLevel::Strawhouse => {
            AuthenticationVerdict::allowed("", authenticator.minimum_user_privileges())
        }
        SecurityLevel::Woodhouse => {
            if request.mechanism != Mechanism::Plain {
                return AuthenticationVerdict::denied(
                    "400".to_string(),
                    "plain credentials required".to_string(),
                );
            }
            let Some(credentials) = request.credentials.as_ref() else {
                return AuthenticationVerdict::denied(
                    "400".to_string(),
                    "credentials missing".to_string(),
                );
            };
            let (status, text) = authenticator.is_valid_credentials(credentials);
            if status != OK_STATUS {
                return AuthenticationVerdict::denied(status, text);
            }
            AuthenticationVerdict::allowed(
                credentials.user_name(),
                authenticator.minimum_user_privileges(),
            )
        }
        SecurityLevel::Stonehouse | SecurityLevel::Ironhouse => {
            if request.mechanism != Mechanism::Curve {
                return AuthenticationVerdict::denied(
                    "400".to_string(),
                    "curve key required".to_string(),
                );
            }
            let Some(public_key) = request.public_key else {
                return AuthenticationVerdict::denied(
                    "400".to_string(),
                    "public key missing".to_string(),
                );
            };
            let keys = crate::authentication::Keys::from_public_key(public_key);
            let (status, text) = authenticator.is_valid_keys(&keys);
            if status != OK_STATUS {
                return AuthenticationVerdict::denied(status, text);
            }
            AuthenticationVerdict::allowed("", authenticator.minimum_user_privileges())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::{Grasslands, SqliteAuthenticator, UserNameAndPassword};

    fn request(level: SecurityLevel) -> AuthenticationRequest {
        AuthenticationRequest {
            domain: "global".to_string(),
            address: "127.0.0.1".to_string(),
            mechanism: match level {
                SecurityLevel::Woodhouse => Mechanism::Plain,
                SecurityLevel::Stonehouse | SecurityLevel::Ironhouse => Mechanism::Curve,
                _ => Mechanism::Null,
            },
            security_level: level,
            credentials: None,
            public_key: None,
        }
    }

    #[test]
    fn grasslands_service_allows_everyone() {
        let mut service = Service::start(Arc::new(Grasslands::new())).expect("start");
        let handle = service.handle();
        let verdict = handle
            .authenticate(request(SecurityLevel::Grasslands))
            .expect("verdict");
        assert!(verdict.is_ok());
        service.stop();
        assert!(!service.is_running());
    }

    #[test]
    fn strawhouse_blacklist_denies_peer() {
        let auth = SqliteAuthenticator::in_memory().expect("open");
        auth.add_to_blacklist("127.0.0.1").expect("blacklist");
        let mut service = Service::start(Arc::new(auth)).expect("start");
        let verdict = service
            .handle()
            .authenticate(request(SecurityLevel::Strawhouse))
            .expect("verdict");
        assert!(!verdict.is_ok());
        assert_eq!(verdict.status, "400");
        service.stop();
    }

    #[test]
    fn woodhouse_requires_credentials() {
        let auth = SqliteAuthenticator::in_memory().expect("open");
        auth.add_user("operator", "magma", None, crate::authentication::UserPrivileges::ReadWrite)
            .expect("add user");
        let mut service = Service::start(Arc::new(auth)).expect("start");
        let handle = service.handle();

        let missing = handle
            .authenticate(request(SecurityLevel::Woodhouse))
            .expect("verdict");
        assert!(!missing.is_ok());

        let mut with_creds = request(SecurityLevel::Woodhouse);
        with_creds.credentials = Some(UserNameAndPassword::new("operator", "magma").unwrap());
        let verdict = handle.authenticate(with_creds).expect("verdict");
        assert!(verdict.is_ok());
        assert_eq!(verdict.user_id, "operator");
        service.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let mut service = Service::start(Arc::new(Grasslands::new())).expect("start");
        service.stop();
        service.stop();
        assert!(!service.is_running());
    }
}
