// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The registry and its request/router front.

use std::sync::Arc;

use dashmap::DashMap;

use crate::authentication::{Authenticator, ZapOptions};
use crate::error::{Error, Result};
use crate::message_formats::Message;
use crate::messaging::request_router::{Router, RouterOptions};
use crate::messaging::Context;
use crate::services::connection_information::{
    AvailableConnectionsRequest, AvailableConnectionsResponse, ConnectionDetails,
};

/// Connection-information service configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    address: Option<String>,
    zap_options: ZapOptions,
}

impl ServiceOptions {
    /// Defaults: Grasslands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        crate::messaging::transport::Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// The bound address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
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

/// The single discovery point of a deployment.
///
/// Components `insert` their descriptors on start and `remove` them on
/// stop; [`AvailableConnectionsRequest`]s are answered from the current
/// registry snapshot.
pub struct Service {
    registry: Arc<DashMap<String, ConnectionDetails>>,
    router: Router,
}

impl Service {
    /// Creates the service with no authenticator (Grasslands only).
    pub fn new(context: &Context) -> Self {
        Self {
            registry: Arc::new(DashMap::new()),
            router: Router::new(context),
        }
    }

    /// Creates the service owning the given authenticator.
    pub fn with_authenticator(context: &Context, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            registry: Arc::new(DashMap::new()),
            router: Router::with_authenticator(context, authenticator),
        }
    }

    /// Binds the request endpoint.
    pub fn initialize(&self, options: &ServiceOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("service address not set".into()))?;

        let registry = self.registry.clone();
        let mut router_options = RouterOptions::new();
        router_options.set_address(address)?;
        router_options.set_zap_options(&options.zap_options);
        router_options.set_callback(Arc::new(move |message_type, payload| {
            let mut request = AvailableConnectionsRequest::new();
            if message_type != request.message_type() {
                return Err(Error::InvalidMessageType(message_type.to_string()));
            }
            request.from_bytes(payload)?;

            let mut details: Vec<ConnectionDetails> =
                registry.iter().map(|entry| entry.value().clone()).collect();
            details.sort_by(|a, b| a.name().cmp(b.name()));

            let mut response = AvailableConnectionsResponse::new();
            response.set_identifier(request.identifier());
            response.set_details(details);
            Ok(Box::new(response) as Box<dyn Message>)
        }));
        self.router.initialize(&router_options)
    }

    /// Starts answering requests.
    pub fn start(&self) -> Result<()> {
        self.router.start()
    }

    /// True while the service is answering.
    pub fn is_running(&self) -> bool {
        self.router.is_running()
    }

    /// Stops the service. Idempotent.
    pub fn stop(&self) {
        self.router.stop();
    }

    /// Publishes (or replaces) a descriptor.
    pub fn insert(&self, details: ConnectionDetails) {
        self.registry.insert(details.name().to_string(), details);
    }

    /// Withdraws a descriptor by component name.
    pub fn remove(&self, name: &str) {
        self.registry.remove(name);
    }

    /// True when a descriptor is registered under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// Number of registered descriptors.
    pub fn size(&self) -> usize {
        self.registry.len()
    }
}
