//! Core utilities for tgql.
//!
//! This crate provides foundational types used throughout tgql:
//! - `span`: byte ranges inside type-expression strings
//! - `case`: identifier casing shared by the SDK and the derive macros

pub mod case;
pub mod span;

pub use case::{capitalize_first, to_camel_case};
pub use span::Span;
