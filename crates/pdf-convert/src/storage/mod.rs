//! Storage module for uploaded originals and converted artifacts
//!
//! Provides flat, filesystem-backed directories where the file name is the only key.

mod artifact_store;

pub use artifact_store::ArtifactStore;
