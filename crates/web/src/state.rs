//! Shared application state

use std::sync::atomic::AtomicBool;

use snow2gcp_core::{Settings, SnowflakeSession};
use tokio::sync::Mutex;

use crate::progress::WebProgress;

/// State shared by every request handler.
///
/// The server keeps at most one Snowflake session: connecting again replaces
/// it, and the session lock is held for the whole duration of an export so
/// browsing requests queue up behind it. `exporting` is the single-flight
/// guard for `/api/export`.
pub struct AppState {
    pub settings: Settings,
    pub session: Mutex<Option<SnowflakeSession>>,
    pub progress: WebProgress,
    pub exporting: AtomicBool,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            session: Mutex::new(None),
            progress: WebProgress::default(),
            exporting: AtomicBool::new(false),
        }
    }
}
