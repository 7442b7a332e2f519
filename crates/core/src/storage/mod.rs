//! Artifact storage.
//!
//! One folder per topic under the output root; every artifact of a run
//! shares a base name built from the topic and the run's start time.

mod layout;
mod store;

pub use layout::{base_name, folder_name, ArtifactKind, RunLayout};
pub use store::{ArtifactStore, StorageError};
