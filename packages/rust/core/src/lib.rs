//! Core pipeline for SeoPress.
//!
//! Ties the generation client, keyword store and publisher together into a
//! single run: claim a keyword, assemble an article, publish it, record the
//! outcome.

pub mod assembler;
pub mod mirror;
pub mod pipeline;
pub mod publisher;
pub mod revalidate;

pub use assembler::{Assembler, AssemblyProgress, AssemblyStage, SilentProgress};
pub use mirror::RepositoryMirror;
pub use pipeline::{Controller, RunOutcome, RunRequest, SideEffects, stale_after_duration};
pub use publisher::{ArticleWrite, PublishedDocument, Publisher};
pub use revalidate::Revalidator;
