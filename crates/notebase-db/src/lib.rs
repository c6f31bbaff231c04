//! # notebase-db
//!
//! Database gateway for notebase.
//!
//! This crate provides:
//! - An FQL expression builder ([`fql`])
//! - The HTTP query client and the [`Gateway`] trait ([`client`])
//! - The note repository used by the HTTP service ([`notes`])
//! - The idempotent provisioning sequence behind `notebase-setup` ([`provision`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use notebase_core::{Note, NoteRepository};
//! use notebase_db::{FaunaClient, FaunaConfig, FaunaNoteRepository};
//!
//! # async fn demo() -> notebase_core::Result<()> {
//! let client = FaunaClient::new(FaunaConfig::from_env()?)?;
//! let notes = FaunaNoteRepository::new(client);
//! let doc = notes.insert(Note::new("buy milk")).await?;
//! println!("created {}", doc.reference);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod fql;
pub mod notes;
pub mod provision;

pub use client::{query, FaunaClient, FaunaConfig, Gateway};
pub use fql::Expr;
pub use notes::{FaunaNoteRepository, Page};
pub use provision::{KeyOutcome, KeyPolicy, Outcome, ProvisionConfig, ProvisionReport, SeedOutcome};
