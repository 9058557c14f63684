//! Shared application state for the Axum API server.

use std::sync::Arc;

use courier_engine::service::NotificationService;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(service: NotificationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
