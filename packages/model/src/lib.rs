//! # Folio Model
//!
//! Shared vocabulary for the archival resource graph.
//!
//! ```text
//! Collection ─┬─ Collection ...
//!             └─ Manifest ─┬─ Canvas ── AnnotationPage ── Annotation
//!                          └─ Range ─── Range ...  (+ Canvas references)
//! ```
//!
//! Two shapes of the same data live here:
//!
//! - **Nested** ([`Resource`] and friends): the document as it arrives from
//!   ingest and leaves for persistence/export.
//! - **Flat** ([`Entity`]): one record per node, with children kept out of
//!   line. The store indexes these by id.

mod behavior;
mod document;
mod entity;
mod kind;
mod language;
mod properties;

pub use behavior::{Behavior, Motivation, ViewingDirection};
pub use document::{
    AnnotationPage, Annotation, Canvas, CanvasRef, Collection, CollectionItem, Manifest,
    NodeMut, NodeRef, Range, RangeItem, Resource, Visit,
};
pub use entity::{
    AnnotationEntity, CanvasEntity, CollectionEntity, Entity, ManifestEntity, PageEntity,
    PagePurpose, RangeEntity, RangeItemRef,
};
pub use kind::EntityKind;
pub use language::LanguageMap;
pub use properties::{Dimensions, MetadataEntry, Properties};
