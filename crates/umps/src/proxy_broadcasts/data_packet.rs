// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The data-packet broadcast.

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::{downcast, DataPacket, Messages};
use crate::messaging::publisher_subscriber;
use crate::messaging::{ConnectOrBind, Context};

pub use crate::messaging::xpub_xsub::{Proxy, ProxyOptions};

/// Publishes data packets into the broadcast frontend.
pub struct Publisher {
    inner: publisher_subscriber::Publisher,
}

impl Publisher {
    /// Creates an uninitialized publisher under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            inner: publisher_subscriber::Publisher::new(context),
        }
    }

    /// Connects to the broadcast's XSUB frontend.
    pub fn initialize(&mut self, frontend_address: &str, zap_options: &ZapOptions) -> Result<()> {
        let mut options = publisher_subscriber::PublisherOptions::new();
        options.set_address(frontend_address)?;
        options.set_connect_or_bind(ConnectOrBind::Connect);
        options.set_zap_options(zap_options);
        self.inner.initialize(&options)
    }

    /// Publishes one packet.
    pub fn send<T>(&self, packet: &DataPacket<T>) -> Result<()>
    where
        T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
    {
        if !packet.is_complete() {
            return Err(Error::InvalidArgument(
                "data packet is missing its SNCL, sampling rate, or samples".into(),
            ));
        }
        self.inner.send(packet)
    }
}

/// Receives data packets from the broadcast backend.
pub struct Subscriber<T = f64> {
    inner: publisher_subscriber::Subscriber,
    phantom: PhantomData<T>,
}

impl<T> Subscriber<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Creates an uninitialized subscriber under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            inner: publisher_subscriber::Subscriber::new(context),
            phantom: PhantomData,
        }
    }

    /// Connects to the broadcast's XPUB backend.
    pub fn initialize(&mut self, backend_address: &str, zap_options: &ZapOptions) -> Result<()> {
        let mut formats = Messages::new();
        formats.add(Box::new(DataPacket::<T>::new()))?;

        let mut options = publisher_subscriber::SubscriberOptions::new();
        options.set_address(backend_address)?;
        options.set_zap_options(zap_options);
        options.set_message_formats(&formats)?;
        self.inner.initialize(&options)
    }

    /// Receives the next packet; `Ok(None)` on timeout.
    pub fn receive(&self, timeout: Option<Duration>) -> Result<Option<DataPacket<T>>> {
        match self.inner.receive_with_timeout(timeout)? {
            Some(message) => Ok(Some(*downcast::<DataPacket<T>>(message)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_packet_is_rejected() {
        let context = Context::new();
        let mut publisher = Publisher::new(&context);
        publisher
            .initialize("tcp://127.0.0.1:59960", &ZapOptions::new())
            .expect("initialize");
        let packet = DataPacket::<f64>::new();
        assert!(publisher.send(&packet).is_err());
    }
}
