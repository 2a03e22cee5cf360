//! Core types shared by the whole crate: the error type and the long-lived frame context.

pub mod context;
pub mod error;
