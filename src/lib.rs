//! Hubauth — multi-host authentication orchestrator.
//!
//! Exchanges a username/password for a long-lived application token against a
//! remote host, transparently resolving server-side two-factor challenges
//! through an interactive handler, and caches the resulting credential and
//! identity so later launches skip re-authentication. Login state is tracked
//! per host address, so a client can be authenticated against the public
//! service and any number of enterprise instances at once.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hubauth::prelude::*;
//!
//! # async fn example(handler: Arc<dyn ChallengeHandler>) -> hubauth::error::Result<()> {
//! let registry = HostRegistry::with_config(
//!     &HubAuthConfig::from_env()?,
//!     Arc::new(HttpAuthClientFactory),
//!     handler,
//! );
//! let host = HostAddress::public();
//! match registry.login(&host, "aUsername", "aPassword").await? {
//!     LoginOutcome::Authenticated { identity } => println!("hello, {}", identity.login),
//!     LoginOutcome::Cancelled => println!("login cancelled"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod challenge;
pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod identity;
pub mod orchestrator;
pub mod prelude;
pub mod registry;
pub mod store;
