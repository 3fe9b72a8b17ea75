//! Core type definitions used across the NodePlug workspace.

pub mod id;

pub use id::*;
