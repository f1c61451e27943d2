use std::sync::Arc;

use crate::session_facade::TradingSessionFacade;

/// Shared application state handed to every `axum` handler. Cheap to
/// clone — it's one `Arc` around the facade, which owns its own lock.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<TradingSessionFacade>,
}

impl AppState {
    pub fn new(facade: Arc<TradingSessionFacade>) -> Self {
        Self { facade }
    }
}
