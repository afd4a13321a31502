//! Shared HTTP adapter state.
//!
//! Handlers depend only on the [`TripDispatch`] driving port so they stay
//! testable with a mock and free of I/O.

use std::sync::Arc;

use crate::domain::ports::TripDispatch;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub dispatch: Arc<dyn TripDispatch>,
}

impl HttpState {
    pub fn new(dispatch: Arc<dyn TripDispatch>) -> Self {
        Self { dispatch }
    }
}
