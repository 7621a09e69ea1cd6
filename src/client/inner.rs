//! Internal client implementation.

use crate::dispatch::Dispatcher;

/// State shared by every clone of a [`Client`](crate::Client).
pub(crate) struct ClientInner {
    dispatcher: Dispatcher,
}

impl ClientInner {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
