pub mod orchestrator;

pub use orchestrator::{Orchestrator, ResearchSteps};
pub use tokio_util::sync::CancellationToken;
