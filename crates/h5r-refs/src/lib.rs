//! Serializable references to objects, dataset regions, and attributes.
//!
//! A [`Reference`] names an entity inside a hierarchical container (or in
//! another container, for the external kinds) in a form that can be stored
//! as attribute or dataset data and resolved again later.
//!
//! # Architecture
//!
//! - **Constructors** resolve a path against an open location and embed the
//!   target address, or embed a filename and pathname for external targets.
//! - **Wire format** frames each reference as `[kind tag][u64 length][payload]`
//!   so streams of references can be decoded and skipped.
//! - **Resolution** decodes embedded selections and names and opens targets
//!   through the [`Store`](h5r_store::Store) collaborator.
//! - **Binding** ties a reference to an open location with one refcount unit,
//!   held until the reference is rebound, destroyed, or dropped.
//!
//! # Modules
//!
//! - [`codec`] — Little-endian integer and length-prefixed name primitives
//! - [`kind`] — [`ReferenceKind`] and its wire tags
//! - [`reference`] — The [`Reference`] value and its payload accessors
//! - [`wire`] — Encoding and decoding of framed references
//! - [`binding`] — [`LocationBinding`] refcount tokens
//! - [`context`] — [`RefContext`], which owns the collaborators
//! - [`create`] — Reference constructors
//! - [`resolve`] — Resolution and [`Entity`]
//! - [`config`] — [`RefConfig`]
//! - [`error`] — [`RefError`]

pub mod binding;
pub mod codec;
pub mod config;
pub mod context;
pub mod create;
pub mod error;
pub mod kind;
pub mod reference;
pub mod resolve;
pub mod wire;

pub use binding::LocationBinding;
pub use config::RefConfig;
pub use context::RefContext;
pub use error::{RefError, RefResult};
pub use kind::ReferenceKind;
pub use reference::{Payload, Reference};
pub use resolve::Entity;
pub use wire::{decode, decode_all, encode, encode_all, encode_into, encoded_len};
