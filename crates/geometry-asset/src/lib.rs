//! Geometry asset pipeline for the engine content tools.
//!
//! This library turns the buffer produced by the model importer into LOD
//! grouped geometry, persists it as a content-hashed asset file, and packs
//! loaded assets into the blob the engine runtime uploads to the GPU.

pub mod asset;
pub mod error;
mod format;
pub mod geometry;
pub mod hash;
pub mod lod;
pub mod naming;
pub mod pack;
pub mod raw;
pub mod settings;
pub mod submesh;
pub mod thumbnail;
