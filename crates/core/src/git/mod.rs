//! Local Git repository access for treesync.

pub mod client;

pub use client::GitClient;
