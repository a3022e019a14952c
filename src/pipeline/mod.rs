pub mod executor;
pub mod fallback;
pub mod gemini;
pub mod normalize;
pub mod prompts;
pub mod provider;
pub mod router;
pub mod tasks;

/// Terminal pipeline failures. Individual tier errors never escape the
/// executor — only total exhaustion does, and for most tasks the task layer
/// swallows even that in favor of a degraded default.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("All tiers failed; last error from {last_source}: {last_error}")]
    Exhausted {
        last_source: String,
        last_error: String,
    },
    #[error("No tiers available for this task")]
    NoTiers,
}
