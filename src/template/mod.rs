// src/template/mod.rs

//! Template expansion.
//!
//! - [`syntax`]: `${name}` tokenizer shared by both resolvers.
//! - [`resolver`]: recursive resolution of configuration and attachment
//!   names, with memoization, cycle detection and attachment discovery.
//! - [`plain`]: one-level expansion of launch templates against the
//!   finished namespace.
//! - [`ambient`]: environment and host properties captured per launch.

pub mod ambient;
pub mod plain;
pub mod resolver;
pub mod syntax;

pub use ambient::{Ambient, path_separator};
pub use plain::PlainResolver;
pub use resolver::{ResolvedConfiguration, TemplateResolver};
