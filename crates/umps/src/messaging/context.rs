// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared messaging context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A reference-counted handle grouping the sockets of a deployment
/// component.
///
/// I/O threads belong to the sockets created under a context; cloning the
/// context shares it, and the transport resources of a component are
/// released when its sockets and the last context clone drop. There is no
/// global default context; callers construct one and inject it.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Default)]
struct ContextInner {
    active_sockets: AtomicUsize,
}

impl Context {
    /// Creates a context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sockets currently registered under this context.
    pub fn active_sockets(&self) -> usize {
        self.inner.active_sockets.load(Ordering::SeqCst)
    }

    pub(crate) fn register_socket(&self) {
        self.inner.active_sockets.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn deregister_socket(&self) {
        self.inner.active_sockets.fetch_sub(1, Ordering::SeqCst);
    }
}
