mod registry;

pub use registry::{ModelRegistry, ModelSelection, ModelSpec};
