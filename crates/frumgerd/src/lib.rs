//! # Frumgerd — Entity Graph with Template Persistence
//!
//! An in-memory graph of entity records with parent/child relationships and
//! composable local transforms, backed by a prototype-based store: entities
//! are saved as templates, and a variant of a template persists only what it
//! changes.
//!
//! Start with `use frumgerd::prelude::*`, build an
//! [`EntityGraph`](ecs::EntityGraph), and attach a
//! [`TemplateStore`](template::TemplateStore) when records should outlive it.

pub mod ecs;
pub mod error;
pub mod math;
pub mod prelude;
pub mod template;

pub use error::{GraphError, TemplateError};
