use crate::common::registry::PanelRegistry;
use std::sync::Arc;

use super::auth::AuthService;

/// Router state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: PanelRegistry,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(registry: PanelRegistry, auth: AuthService) -> Self {
        Self {
            registry,
            auth: Arc::new(auth),
        }
    }
}
