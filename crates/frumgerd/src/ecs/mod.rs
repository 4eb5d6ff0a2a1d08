//! # Entity Graph
//!
//! A flat, id-indexed table of entity records with parent/child relationships.
//! There are no back-pointers: a record lists its children, and the parent of
//! an entity is derived from those lists.
//!
//! ## Module Overview
//!
//! - [`entity`] — Ids, the [`EntityData`] record trait, the stock [`Entity`] record
//! - [`graph`] — [`EntityGraph`]: add, update, cascading destroy, persistence hooks
//! - [`hierarchy`] — [`EntityRef`] / [`EntityMut`] views: navigation and poses

pub mod entity;
pub mod graph;
pub mod hierarchy;

pub use entity::{Capability, ComponentData, Entity, EntityData, EntityId};
pub use graph::{EntityGraph, GraphEvent};
pub use hierarchy::{EntityMut, EntityRef};
