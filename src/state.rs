// src/state.rs
use std::sync::Arc;

use crate::services::relay::RelayClient;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub relay: RelayClient,
}

impl AppState {
    pub fn new(relay: RelayClient) -> Self {
        Self { relay }
    }
}
