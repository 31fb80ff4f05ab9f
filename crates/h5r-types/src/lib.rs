//! Foundation types for container references.
//!
//! This crate provides the small value types shared by the reference
//! subsystem and the container store it talks to. Every other `h5r` crate
//! depends on `h5r-types`.
//!
//! # Key Types
//!
//! - [`Address`] — Storage address of an entity inside a container
//! - [`LocationId`] — Identifier of an open container, object, or attribute
//! - [`ObjectType`] — Kind of object an address denotes
//! - [`AccessOptions`] — Access properties handed to the store when opening
//! - [`Dataspace`] — N-dimensional extent with an active [`Selection`]

pub mod address;
pub mod dataspace;
pub mod error;
pub mod object;

pub use address::{Address, LocationId};
pub use dataspace::{Dataspace, Hyperslab, Selection};
pub use error::TypeError;
pub use object::{AccessOptions, ObjectType};
