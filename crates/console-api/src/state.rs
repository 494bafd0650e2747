use std::sync::Arc;

use console_persist::ConsoleClient;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// `ConsoleClient` is already a cheap handle over a shared store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub console: ConsoleClient,
}

impl AppState {
    pub fn new(config: Config, console: ConsoleClient) -> Self {
        Self {
            config: Arc::new(config),
            console,
        }
    }
}
