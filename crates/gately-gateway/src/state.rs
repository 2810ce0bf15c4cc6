use std::sync::Arc;
use std::time::Duration;

use gately_service::UrlMapper;

#[derive(Clone)]
pub struct AppState {
    mapper: Arc<dyn UrlMapper>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(mapper: Arc<dyn UrlMapper>, request_timeout: Duration) -> Self {
        Self {
            mapper,
            request_timeout,
        }
    }

    pub fn mapper(&self) -> &dyn UrlMapper {
        self.mapper.as_ref()
    }

    /// Deadline applied to every handler's call into the mapper.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
