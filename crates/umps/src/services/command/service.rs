// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The module-side IPC command service.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::message_formats::Message;
use crate::messaging::request_router::{Router, RouterOptions};
use crate::messaging::{Context, MessageCallback};
use crate::services::command::{
    ModuleDetails, ModuleTable, TerminateRequest, TerminateResponse,
};

/// Command service configuration.
#[derive(Clone)]
pub struct ServiceOptions {
    module_details: Option<ModuleDetails>,
    ipc_directory: PathBuf,
    callback: Option<MessageCallback>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            module_details: None,
            ipc_directory: std::env::temp_dir().join("umps"),
            callback: None,
        }
    }
}

impl ServiceOptions {
    /// Defaults: IPC sockets and the module table under
    /// `$TMPDIR/umps/`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the module's identity. Required.
    pub fn set_module_details(&mut self, details: &ModuleDetails) -> Result<()> {
        if details.name().is_empty() {
            return Err(Error::InvalidArgument("module name not set".into()));
        }
        self.module_details = Some(details.clone());
        Ok(())
    }

    /// Sets the directory holding IPC sockets and the module table.
    pub fn set_ipc_directory<P: Into<PathBuf>>(&mut self, directory: P) {
        self.ipc_directory = directory.into();
    }

    /// The IPC directory.
    pub fn ipc_directory(&self) -> &std::path::Path {
        &self.ipc_directory
    }

    /// Sets the callback answering `AvailableCommandsRequest` and
    /// `CommandRequest`. `TerminateRequest` is handled by the service
    /// itself.
    pub fn set_callback(&mut self, callback: MessageCallback) {
        self.callback = Some(callback);
    }
}

/// A module's command endpoint.
///
/// `initialize` binds `ipc://<dir>/<executable>.<instance>.<pid>.ipc`
/// and writes the module-table row; `stop` (or an accepted
/// [`TerminateRequest`]) removes the row and tears the router down.
pub struct Service {
    router: Arc<Router>,
    table: Mutex<Option<Arc<ModuleTable>>>,
    module_name: Mutex<Option<String>>,
    ipc_address: Mutex<Option<String>>,
    terminate: Arc<AtomicBool>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    supervisor_stop: Arc<AtomicBool>,
}

impl Service {
    /// Creates an uninitialized command service under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            router: Arc::new(Router::new(context)),
            table: Mutex::new(None),
            module_name: Mutex::new(None),
            ipc_address: Mutex::new(None),
            terminate: Arc::new(AtomicBool::new(false)),
            supervisor: Mutex::new(None),
            supervisor_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Binds the IPC endpoint and registers the module.
    pub fn initialize(&self, options: &ServiceOptions) -> Result<()> {
        let details = options
            .module_details
            .clone()
            .ok_or_else(|| Error::InvalidArgument("module details not set".into()))?;
        let callback = options
            .callback
            .clone()
            .ok_or_else(|| Error::InvalidArgument("command callback not set".into()))?;

        let socket_file = format!(
            "{}.{}.{}.ipc",
            details.executable(),
            details.instance(),
            details.process_identifier()
        );
        let ipc_address = format!(
            "ipc://{}",
            options.ipc_directory.join(socket_file).display()
        );

        let table = Arc::new(ModuleTable::open(&options.ipc_directory)?);
        table.add_module(&details, &ipc_address)?;

        let terminate = self.terminate.clone();
        terminate.store(false, Ordering::SeqCst);
        let wrapped: MessageCallback = Arc::new(move |message_type, payload| {
            let terminate_type = TerminateRequest::new();
            if message_type == terminate_type.message_type() {
                let mut request = terminate_type;
                request.from_bytes(payload)?;
                terminate.store(true, Ordering::SeqCst);
                let mut response = TerminateResponse::new();
                response.set_accepted(true);
                return Ok(Box::new(response) as Box<dyn Message>);
            }
            callback(message_type, payload)
        });

        let mut router_options = RouterOptions::new();
        router_options.set_address(&ipc_address)?;
        router_options.set_callback(wrapped);
        self.router.initialize(&router_options)?;

        *self.table.lock() = Some(table);
        *self.module_name.lock() = Some(details.name().to_string());
        *self.ipc_address.lock() = Some(ipc_address);
        Ok(())
    }

    /// The bound `ipc://` address.
    pub fn ipc_address(&self) -> Option<String> {
        self.ipc_address.lock().clone()
    }

    /// Starts serving and watches for an accepted terminate.
    pub fn start(&self) -> Result<()> {
        self.router.start()?;
        self.supervisor_stop.store(false, Ordering::SeqCst);

        let router = self.router.clone();
        let terminate = self.terminate.clone();
        let supervisor_stop = self.supervisor_stop.clone();
        let supervisor = std::thread::Builder::new()
            .name("umps-command-supervisor".to_string())
            .spawn(move || loop {
                if supervisor_stop.load(Ordering::SeqCst) {
                    return;
                }
                if terminate.load(Ordering::SeqCst) {
                    // Give the in-flight terminate reply time to flush.
                    std::thread::sleep(Duration::from_millis(100));
                    router.stop();
                    return;
                }
                std::thread::sleep(Duration::from_millis(50));
            })
            .map_err(|e| Error::AlgorithmFailure(format!("spawn supervisor: {}", e)))?;
        *self.supervisor.lock() = Some(supervisor);
        Ok(())
    }

    /// True while the module is serving and has not been terminated.
    pub fn is_running(&self) -> bool {
        self.router.is_running()
    }

    /// True when a terminate request was accepted.
    pub fn was_terminated(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Stops the service and withdraws the module-table row. Idempotent.
    pub fn stop(&self) {
        self.supervisor_stop.store(true, Ordering::SeqCst);
        if let Some(supervisor) = self.supervisor.lock().take() {
            let _ = supervisor.join();
        }
        self.router.stop();
        let name = self.module_name.lock().take();
        if let (Some(table), Some(name)) = (self.table.lock().take(), name) {
            if let Err(e) = table.remove_module(&name) {
                log::warn!("[command] could not remove module table row: {}", e);
            }
        }
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::command::{AvailableCommandsResponse, CommandResponse};

    fn echo_callback() -> MessageCallback {
        Arc::new(|message_type, _payload| {
            if message_type.ends_with("AvailableCommandsRequest") {
                let mut response = AvailableCommandsResponse::new();
                response.set_commands("status -- report channel counts\n");
                return Ok(Box::new(response) as Box<dyn Message>);
            }
            let mut response = CommandResponse::new();
            response.set_standard_output("ok");
            Ok(Box::new(response) as Box<dyn Message>)
        })
    }

    #[test]
    fn initialize_requires_details_and_callback() {
        let context = Context::new();
        let service = Service::new(&context);
        let mut options = ServiceOptions::new();
        assert!(service.initialize(&options).is_err());

        let mut details = ModuleDetails::new();
        details.set_name("scanner").unwrap();
        options.set_module_details(&details).unwrap();
        assert!(service.initialize(&options).is_err());
        options.set_callback(echo_callback());

        let dir = tempfile::tempdir().expect("tempdir");
        options.set_ipc_directory(dir.path());
        service.initialize(&options).expect("initialize");
        assert!(service.ipc_address().unwrap().starts_with("ipc://"));
        service.stop();
    }

    #[test]
    fn table_row_appears_and_disappears() {
        let context = Context::new();
        let service = Service::new(&context);
        let dir = tempfile::tempdir().expect("tempdir");

        let mut details = ModuleDetails::new();
        details.set_name("picker").unwrap();
        let mut options = ServiceOptions::new();
        options.set_module_details(&details).unwrap();
        options.set_callback(echo_callback());
        options.set_ipc_directory(dir.path());

        service.initialize(&options).expect("initialize");
        {
            let table = ModuleTable::open(dir.path()).expect("open table");
            assert!(table.ipc_path("picker").unwrap().is_some());
        }
        service.stop();
        let table = ModuleTable::open(dir.path()).expect("open table");
        assert!(table.ipc_path("picker").unwrap().is_none());
    }
}
