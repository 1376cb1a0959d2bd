pub mod backend;
pub mod config;
pub mod dispatch;
pub mod extract;
pub mod prompt;
pub mod studio;

#[cfg(test)]
mod testing;

pub use backend::{Backend, BackendRequest, BackendResponse, DryrunBackend, GeminiBackend};
pub use config::StudioConfig;
pub use dispatch::Dispatcher;
pub use prompt::{
    AnalysisRequest, ColorizeRequest, LayoutRequest, PageEditRequest, PageRequest, PromptPlan,
    StoryRequest,
};
pub use studio::Studio;
