//! Client crate for the downstream cricket-data collector service.
//!
//! Two concerns live here: obtaining a bearer credential from the token
//! endpoint ([`TokenProvider`]) and delivering shaped payloads to the
//! data endpoints ([`CollectorClient`]). Transport failures are explicit
//! errors; callers log them and proceed degraded rather than aborting.

#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{Credential, TokenProvider};
pub use client::{shape_payload, CollectorClient};
pub use error::{CollectorError, Result};
