//! Calamus: a social publishing platform backend.
//!
//! Layering follows the dependency direction `infra` → `application` →
//! `domain`: domain types carry the invariants, application services own the
//! workflows behind repository traits, and infra provides the Postgres and
//! HTTP adapters.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
