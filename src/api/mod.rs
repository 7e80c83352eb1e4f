mod error;
mod routes;
mod types;

pub use error::ApiError;
pub use routes::create_router;
pub use types::{AskRequest, AskResponse, ErrorResponse, HealthResponse};

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::host::ModelHost;

/// Shared application state
pub struct AppState {
    pub host: Arc<ModelHost>,
    /// One permit per generation allowed to run or wait for the model.
    pub admission: Arc<Semaphore>,
}

impl AppState {
    pub fn new(host: ModelHost, max_pending: usize) -> Self {
        Self {
            host: Arc::new(host),
            admission: Arc::new(Semaphore::new(max_pending)),
        }
    }
}
