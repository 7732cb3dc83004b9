//! Collaborator interfaces consumed by the capture core: the display pipeline, element
//! resolution and the filesystem.

pub mod filesystem;
pub mod screen;
pub mod target;
