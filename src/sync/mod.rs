//! Reconciliation of pulled commits into shadow files.
//!
//! - **Content**: [`ShadowContent`], the append-only hash list of one file
//! - **Naming**: plain or SHA256-hashed shadow file paths
//! - **Orchestration**: [`Synchronizer`] runs units sequentially and
//!   collects a [`SyncReport`]
//! - **Pull files**: JSON hand-off between `pull` and `push`
//!
//! # Example
//!
//! ```ignore
//! use shadowsync::sync::{ShadowNaming, Synchronizer};
//!
//! let mut synchronizer = Synchronizer::new(shadow, ShadowNaming::Plain);
//! let report = synchronizer.run(&units, |event| println!("{event:?}")).await?;
//! report.ensure_complete()?;
//! ```

mod file;
mod hash;
mod push;
mod shadow;
mod types;

pub use file::{atomic_write, read_pull_file, write_pull_file};
pub use hash::{ShadowNaming, content_hash};
pub use push::Synchronizer;
pub use shadow::ShadowContent;
pub use types::{RepoOutcome, SyncEvent, SyncReport};
