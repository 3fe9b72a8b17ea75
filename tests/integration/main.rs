//! Integration tests for the NodePlug workspace.

mod helpers;

mod bridge_test;
mod lifecycle_test;
mod registry_test;
mod sync_test;
