// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client side of the connection-information service.

use std::time::Duration;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::{downcast, Messages};
use crate::messaging::request_router;
use crate::messaging::Context;
use crate::services::connection_information::{
    AvailableConnectionsRequest, AvailableConnectionsResponse, ConnectionDetails,
};

/// Requestor configuration.
#[derive(Clone, Default)]
pub struct RequestorOptions {
    address: Option<String>,
    time_out: Option<Duration>,
    zap_options: ZapOptions,
}

impl RequestorOptions {
    /// Defaults: 1 s timeout (applied at initialize), Grasslands.
    pub fn new() -> Self {
        Self {
            time_out: Some(Duration::from_millis(1000)),
            ..Self::default()
        }
    }

    /// Sets the service address.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        crate::messaging::transport::Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// The service address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Sets the request timeout.
    pub fn set_time_out(&mut self, time_out: Option<Duration>) {
        self.time_out = time_out;
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }
}

/// Queries the connection-information service.
pub struct Requestor {
    inner: request_router::Requestor,
}

impl Requestor {
    /// Creates an uninitialized requestor under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            inner: request_router::Requestor::new(context),
        }
    }

    /// Connects to the service.
    pub fn initialize(&mut self, options: &RequestorOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("requestor address not set".into()))?;

        let mut formats = Messages::new();
        formats.add(Box::new(AvailableConnectionsResponse::new()))?;

        let mut inner_options = request_router::RequestorOptions::new();
        inner_options.set_address(address)?;
        inner_options.set_time_out(options.time_out);
        inner_options.set_zap_options(&options.zap_options);
        inner_options.set_message_formats(&formats)?;
        self.inner.initialize(&inner_options)
    }

    /// Fetches every registered endpoint descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the service does not answer in
    /// time.
    pub fn get_all_connection_details(&self) -> Result<Vec<ConnectionDetails>> {
        let request = AvailableConnectionsRequest::new();
        let Some(reply) = self.inner.request(&request)? else {
            return Err(Error::Timeout);
        };
        let response = downcast::<AvailableConnectionsResponse>(reply)?;
        Ok(response.details().to_vec())
    }

    /// Looks up one descriptor by component name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the name is unknown.
    pub fn get_connection_details(&self, name: &str) -> Result<ConnectionDetails> {
        self.get_all_connection_details()?
            .into_iter()
            .find(|details| details.name() == name)
            .ok_or_else(|| Error::InvalidArgument(format!("no connection named {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_requires_address() {
        let context = Context::new();
        let mut requestor = Requestor::new(&context);
        assert!(requestor.initialize(&RequestorOptions::new()).is_err());
    }
}
