//! Drives the `wakedir` binary against temporary config and hosts files.
#![expect(clippy::indexing_slicing, reason = "This is not problematic in tests")]

mod common;
