//! # Bunkerhill Inference Rust SDK
//!
//! Rust client for the Bunkerhill Health Inference API: fetch inference
//! results for a model and patient, and download their segmentation
//! artifacts locally.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bunkerhill_inference::{InferenceClient, RsaPrivateKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bunkerhill_inference::Error> {
//!     let client = InferenceClient::builder()
//!         .identity("datashare-admin")
//!         .private_key(RsaPrivateKey::from_pem_file("private_key.pem")?)
//!         .build()?;
//!
//!     let inferences = client
//!         .get_inferences(
//!             "e7ad8122-14cf-4bb2-b57f-075a07b51e2b",
//!             "1",
//!             "/tmp/segmentations",
//!         )
//!         .await?;
//!
//!     for inference in inferences {
//!         println!("{} artifacts", inference.segmentation_presigned_urls.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Resilience
//!
//! - Every network call is retried with exponential backoff
//!   ([`RetryConfig`]).
//! - The bearer token is refreshed automatically when it expires, and is
//!   force-invalidated by the consecutive-failure policy
//!   ([`TokenResetPolicy`]).
//! - Failures surface as precise [`Error`] variants: authentication,
//!   request, response parsing, artifact download, and artifact write
//!   failures are all distinct.
//!
//! ## Key Concepts
//!
//! - One client instance holds one authenticated identity; the token
//!   lives only in memory and is never persisted.
//! - Artifact URLs are pre-signed and time-limited; they are fetched
//!   concurrently within one result, with no auth header.
//! - A failed artifact batch aborts on the first failure and leaves
//!   already-downloaded files in place.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod types;

// Internal transport and download pipeline
mod artifacts;
mod http;

// Re-export main types at crate root for convenience
pub use auth::{Credential, RsaPrivateKey};
pub use client::{InferenceClient, InferenceClientBuilder};
pub use config::{RetryConfig, TokenResetPolicy};
pub use error::{Error, Result};
pub use types::Inference;
