//! bpl-guard - Login attempt guard
//!
//! This library tracks failed authentication attempts per client, applies
//! exponential backoff between retries and enforces temporary lockouts.

pub mod config;
pub mod models;
pub mod services;
