use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{clock::Clock, config::Settings};

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    clock: Clock,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, clock: Clock) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, clock }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn clock(&self) -> &Clock {
        &self.inner.clock
    }
}
