use std::sync::Arc;

use crate::classify::{LabelSet, RoleClassifier};
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Built once at startup and immutable afterwards; every request sees the
/// same model, tokenizer, and label set.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable classifier backend. Production: `OnnxRoleClassifier`; tests
    /// swap in a mock.
    pub classifier: Arc<dyn RoleClassifier>,
    pub labels: Arc<LabelSet>,
    pub config: Config,
}
