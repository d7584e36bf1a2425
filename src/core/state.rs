use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::result_store::ResultStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    results: ResultStore,
}

impl AppState {
    pub(crate) fn new(settings: Settings, results: ResultStore) -> Self {
        Self { inner: Arc::new(InnerState { settings, results }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn results(&self) -> &ResultStore {
        &self.inner.results
    }
}
