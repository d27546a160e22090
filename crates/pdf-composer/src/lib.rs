//! PDF object-graph union for lopdf documents.
//!
//! Merges a source document into a target document in place:
//! - catalog-level objects (`Info`, `Lang`, embedded files, outlines, `AcroForm`)
//! - optionally the tagged-PDF structure tree, with ID renumbering
//! - the page tree, appended or prepended
//!
//! Every object taken from the source is copied into the target's own id
//! space through an [`ObjectAdopter`], so the target never references the
//! source table.

mod adopt;
mod cos;
mod error;
mod id_alloc;
mod name_tree;
mod pages;
mod struct_tree;
mod union;

pub use adopt::ObjectAdopter;
pub use error::ComposerError;
pub use id_alloc::{IdAllocator, format_key, parse_key};
pub use pages::{PagePlacement, merge_pages};
pub use struct_tree::{STRUCT_TREE_MERGED, StructTreeOutcome};
pub use union::{MergeOptions, merge, union_global_objects};

use lopdf::{Document, ObjectId};

/// What [`append_document`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Target ids of the merged pages, in their final order.
    pub pages: Vec<ObjectId>,
    pub struct_tree: Option<StructTreeOutcome>,
    /// Number of source objects copied into the target.
    pub objects_adopted: usize,
}

/// Unions `source`'s catalog objects into `target`, then merges its pages.
///
/// The catalog union runs first so that the structure-tree step only sees the
/// target's own pages. Both steps share one adopter, so pages already pulled
/// in by the structure tree are not copied twice.
pub fn append_document(
    target: &mut Document,
    source: &Document,
    options: &MergeOptions,
    placement: PagePlacement,
) -> Result<MergeReport, ComposerError> {
    pages::pages_root(target)?;

    let mut adopter = ObjectAdopter::new(source);
    let struct_tree = union_global_objects(target, &mut adopter, options)?;
    let pages = merge_pages(target, &mut adopter, placement)?;

    Ok(MergeReport { pages, struct_tree, objects_adopted: adopter.len() })
}
