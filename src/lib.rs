pub mod adherence;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod sessions;
pub mod state;
pub mod store;

use tracing_subscriber::EnvFilter;

/// Initialize tracing from `RUST_LOG`, falling back to the crate default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Bring up the application core: logging, persisted state, and the AI
/// assistant. Call once, from an async context (the fallback wake ping
/// spawns onto the running runtime).
pub fn init() -> (state::AppState, pipeline::tasks::Assistant) {
    init_tracing();
    tracing::info!("Solace starting v{}", config::APP_VERSION);

    let state = state::AppState::load(store::JsonStore::open_default());
    let assistant = pipeline::tasks::Assistant::from_env();
    assistant.warm_up();

    (state, assistant)
}
