//! # NHC API Server Library
//!
//! HTTP layer of the Nutrition Habit Challenge backend. Domain models,
//! persistence, authentication and mail delivery live in `nhc-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
