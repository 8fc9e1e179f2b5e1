pub mod artifact;

pub use artifact::{ArtifactCache, ArtifactError, ArtifactLimits};
