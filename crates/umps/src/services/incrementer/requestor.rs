// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client side of the incrementer service.

use std::time::Duration;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::{downcast, Messages};
use crate::messaging::request_router;
use crate::messaging::Context;
use crate::services::incrementer::{
    IncrementRequest, IncrementResponse, ItemsRequest, ItemsResponse, ReturnCode,
};

/// Requestor configuration.
#[derive(Clone, Default)]
pub struct RequestorOptions {
    address: Option<String>,
    time_out: Option<Duration>,
    zap_options: ZapOptions,
}

impl RequestorOptions {
    /// Defaults: 1 s timeout, Grasslands.
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

    /// Sets the request timeout.
    pub fn set_time_out(&mut self, time_out: Option<Duration>) {
        self.time_out = time_out;
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }
}

/// Draws identifiers from the incrementer service.
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
        formats.add(Box::new(IncrementResponse::new()))?;
        formats.add(Box::new(ItemsResponse::new()))?;

        let mut inner_options = request_router::RequestorOptions::new();
        inner_options.set_address(address)?;
        inner_options.set_time_out(options.time_out);
        inner_options.set_zap_options(&options.zap_options);
        inner_options.set_message_formats(&formats)?;
        self.inner.initialize(&inner_options)
    }

    /// Draws the next identifier for an item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the service does not answer and
    /// [`Error::AlgorithmFailure`] when it reports a failure.
    pub fn next_value(&self, item: &str) -> Result<i64> {
        let mut request = IncrementRequest::new();
        request.set_item(item)?;
        let Some(reply) = self.inner.request(&request)? else {
            return Err(Error::Timeout);
        };
        let response = downcast::<IncrementResponse>(reply)?;
        match response.return_code() {
            ReturnCode::Success => Ok(response.value()),
            code => Err(Error::AlgorithmFailure(format!(
                "incrementer returned {:?}",
                code
            ))),
        }
    }

    /// Lists the items with counters.
    pub fn items(&self) -> Result<Vec<String>> {
        let request = ItemsRequest::new();
        let Some(reply) = self.inner.request(&request)? else {
            return Err(Error::Timeout);
        };
        let response = downcast::<ItemsResponse>(reply)?;
        match response.return_code() {
            ReturnCode::Success => Ok(response.items().to_vec()),
            code => Err(Error::AlgorithmFailure(format!(
                "incrementer returned {:?}",
                code
            ))),
        }
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
