//! Core use-case services.
//!
//! # Responsibility
//! - Own the projection consumed by presentation code.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod task_repository;
