//! Mediahouse back-office API
//!
//! Admin accounts with an email approval workflow, layered login defenses,
//! and CRUD over the videos, projects and site settings shown on the
//! public marketing site.

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod security;
pub mod server;

pub use context::AppContext;
pub use error::{ApiError, ApiResult};
