// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The broadcast proxy: XSUB frontend for publishers, XPUB backend for
//! subscribers.

mod proxy;

pub use proxy::{Proxy, ProxyOptions};
