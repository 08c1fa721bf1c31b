//! Declarative screen document: data model, load-time normalization and the
//! build-time placeholder deeplink rewrite.

pub mod model;
pub mod normalize;
pub mod rewrite;

pub use model::{
    Element, EventAction, EventConditions, Screen, ScreenDocument, ScreenEvent, Section,
    SectionPosition,
};
pub use normalize::{load_document, load_document_from_file, normalize};
pub use rewrite::rewrite_placeholder_deeplinks;
