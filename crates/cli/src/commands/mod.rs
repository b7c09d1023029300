//! Subcommand handlers. Each one re-reads its state from disk.

pub mod alias;
pub mod clone;
pub mod describe;
pub mod descriptions;
pub mod index;
pub mod list;
pub mod manifest;
pub mod register;
pub mod remove;
pub mod settings;
