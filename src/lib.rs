//! Virtual try-on edge handlers
//!
//! This library provides the three HTTP handlers behind the try-on feature:
//! a generation proxy in front of the image model, the webhook the model
//! provider calls when an asynchronous job finishes, and the status endpoint
//! clients poll. Jobs and results live in Postgres, output images in R2.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
