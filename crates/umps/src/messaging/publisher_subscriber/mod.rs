// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Direct one-to-many publish/subscribe.
//!
//! The publisher binds; subscribers connect and filter by message type.
//! Classic pub/sub loss semantics apply: slow joiners miss a prefix and a
//! subscriber past its high-water mark loses messages at the publisher.

mod publisher;
mod subscriber;

pub use publisher::{Publisher, PublisherOptions};
pub use subscriber::{Subscriber, SubscriberOptions};
