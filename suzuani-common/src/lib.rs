//! # SuzuAni Common Library
//!
//! Shared code for the SuzuAni catalog service:
//! - Database schema, initialization and models
//! - Configuration loading and root folder resolution
//! - Authentication primitives (passwords, OTPs, reset and session tokens)
//! - Watch-link to embed-URL rewriting
//! - Outgoing mail seam

pub mod auth;
pub mod config;
pub mod db;
pub mod embed;
pub mod error;
pub mod mail;

pub use error::{Error, Result};
