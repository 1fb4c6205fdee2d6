//! Identity and session core for the campus platform.
//!
//! Engines live in `usecase`, generic over the ports in
//! `domain::repository`; `infra` provides the sea-orm implementations.

pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;
pub mod usecase;
