//! Merging of tagged-PDF logical structure trees.
//!
//! The source tree is either adopted wholesale (untagged, page-less target) or
//! spliced under the target's top-level structure element. In the second case
//! every source element listed in the source `/IDTree` receives a fresh key
//! from the target's `node########` sequence, and the source top-level
//! children are re-parented onto the target's top-level element.
//!
//! Planning reads both documents and performs every check that can fail;
//! applying only mutates the target. A failed plan leaves the target untouched.

use crate::adopt::ObjectAdopter;
use crate::cos::{self, DictLocation};
use crate::error::ComposerError;
use crate::id_alloc::IdAllocator;
use crate::name_tree::{self, LeafSnapshot};
use log::{debug, info};
use lopdf::{Document, Object, ObjectId};
use std::collections::{BTreeSet, HashMap};

/// Flag set on pages whose structure tree was adopted along with the document,
/// read back by the serializer.
pub const STRUCT_TREE_MERGED: &str = "StructTreeMerged";

const DOCUMENT_TYPE: &[u8] = b"Document";

/// What the structure-tree step will do, decided before any mutation.
#[derive(Debug)]
pub(crate) enum StructTreePlan {
    /// The source carries no structure tree.
    SourceUntagged,
    /// The target has untagged pages; tags cannot be retrofitted onto them.
    TargetUntaggedContent,
    /// The target has neither structure nor pages: take the source tree as is.
    Adopt {
        root: Object,
        mark_info: Option<Object>,
        source_pages: Vec<ObjectId>,
    },
    /// Both sides are tagged: splice the source elements in.
    Splice(SplicePlan),
}

#[derive(Debug)]
pub(crate) struct SplicePlan {
    target_leaf: LeafSnapshot,
    target_top: ObjectId,
    source_top: ObjectId,
    allocator: IdAllocator,
    /// Source ID tree entries to renumber; the wrapper and `/S /Document` elements are excluded.
    entries: Vec<(Vec<u8>, Object)>,
    source_children: Vec<Object>,
}

/// Outcome of an applied plan, for logging and callers that want to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructTreeOutcome {
    SourceUntagged,
    SkippedUntaggedTarget,
    /// `root` is the adopted root's id, `None` when it was stored inline.
    Adopted { root: Option<ObjectId>, pages_flagged: usize },
    Spliced { ids_allocated: usize, children_appended: usize },
}

pub(crate) fn plan(target: &Document, source: &Document) -> Result<StructTreePlan, ComposerError> {
    let source_catalog_id = cos::catalog_id(source)?;
    let source_catalog = source.get_dictionary(source_catalog_id)?;
    let Some(source_root_value) = source_catalog.get(b"StructTreeRoot").ok() else {
        return Ok(StructTreePlan::SourceUntagged);
    };
    if cos::entry_dict(source, source_catalog, b"StructTreeRoot")?.is_none() {
        return Ok(StructTreePlan::SourceUntagged);
    }

    let target_catalog_id = cos::catalog_id(target)?;
    let target_catalog = target.get_dictionary(target_catalog_id)?;
    if cos::entry_dict(target, target_catalog, b"StructTreeRoot")?.is_none() {
        if !target.get_pages().is_empty() {
            return Ok(StructTreePlan::TargetUntaggedContent);
        }
        let mark_info = match cos::entry(source, source_catalog, b"MarkInfo")? {
            Some(_) => source_catalog.get(b"MarkInfo").ok().cloned(),
            None => None,
        };
        return Ok(StructTreePlan::Adopt {
            root: source_root_value.clone(),
            mark_info,
            source_pages: source.get_pages().into_values().collect(),
        });
    }

    let target_root = struct_root(target, target_catalog_id)?;
    let source_root = struct_root(source, source_catalog_id)?;

    // (a) both ID trees must be single leaves.
    let target_leaf = name_tree::read_single_leaf(target, &target_root, b"IDTree")?
        .ok_or(ComposerError::PreconditionMissing { dictionary: "IDTree" })?;
    let source_leaf = name_tree::read_single_leaf(source, &source_root, b"IDTree")?;

    // (b) the target's key scheme must be one we can continue.
    let allocator = match target_leaf.max_key() {
        Some(key) => {
            let text = name_tree::key_bytes(key).ok_or_else(|| ComposerError::IncompatibleIdScheme {
                key: format!("{key:?}"),
            })?;
            IdAllocator::after_key(text)?
        }
        None => IdAllocator::default(),
    };

    let target_top = top_element(target, &target_root)?;
    let source_top = top_element(source, &source_root)?;

    // The source wrapper becomes the target's, which keeps its own ID.
    let mut entries = Vec::new();
    if let Some(leaf) = &source_leaf {
        for (key, value) in leaf.pairs() {
            if value.as_reference().ok() == Some(source_top)
                || cos::struct_type(source, value) == Some(DOCUMENT_TYPE)
            {
                continue;
            }
            let key = name_tree::key_bytes(key)
                .ok_or_else(|| ComposerError::Malformed("/IDTree key is not a string".into()))?;
            entries.push((key.to_vec(), value.clone()));
        }
    }
    allocator.reserve(entries.len())?;

    let source_children = cos::as_list(
        cos::entry(source, source.get_dictionary(source_top)?, b"K")?,
    );

    Ok(StructTreePlan::Splice(SplicePlan {
        target_leaf,
        target_top,
        source_top,
        allocator,
        entries,
        source_children,
    }))
}

pub(crate) fn apply(
    plan: StructTreePlan,
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
) -> Result<StructTreeOutcome, ComposerError> {
    match plan {
        StructTreePlan::SourceUntagged => {
            debug!("[STRUCT] Source has no structure tree; nothing to merge.");
            Ok(StructTreeOutcome::SourceUntagged)
        }
        StructTreePlan::TargetUntaggedContent => {
            info!("[STRUCT] Target already has untagged pages; leaving it untagged.");
            Ok(StructTreeOutcome::SkippedUntaggedTarget)
        }
        StructTreePlan::Adopt { root, mark_info, source_pages } => {
            adopt_whole_tree(target, adopter, root, mark_info, source_pages)
        }
        StructTreePlan::Splice(splice) => splice_trees(target, adopter, splice),
    }
}

fn adopt_whole_tree(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    root: Object,
    mark_info: Option<Object>,
    source_pages: Vec<ObjectId>,
) -> Result<StructTreeOutcome, ComposerError> {
    let root = adopter.adopt_value(target, &root)?;
    let mark_info = match mark_info {
        Some(value) => Some(adopter.adopt_value(target, &value)?),
        None => None,
    };

    let catalog_id = cos::catalog_id(target)?;
    cos::edit_dict(target, catalog_id, |_, catalog| {
        catalog.set("StructTreeRoot", root.clone());
        if let Some(mark_info) = mark_info {
            catalog.set("MarkInfo", mark_info);
        }
        Ok(())
    })?;

    for page in &source_pages {
        let page_id = adopter.adopt(target, *page)?;
        target.get_dictionary_mut(page_id)?.set(STRUCT_TREE_MERGED, true);
    }

    let root_id = root.as_reference().ok();
    info!(
        "[STRUCT] Adopted source structure tree as {:?}; flagged {} pages.",
        root_id,
        source_pages.len()
    );
    Ok(StructTreeOutcome::Adopted { root: root_id, pages_flagged: source_pages.len() })
}

fn splice_trees(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    plan: SplicePlan,
) -> Result<StructTreeOutcome, ComposerError> {
    let SplicePlan { target_leaf, target_top, source_top, mut allocator, entries, source_children } = plan;

    // The source wrapper element is represented by the target's from now on.
    let wrapper_copy = adopter.alias(source_top, target_top);

    let mut renamed: HashMap<Vec<u8>, String> = HashMap::with_capacity(entries.len());
    let mut appended = Vec::with_capacity(entries.len());
    for (old_key, value) in entries {
        let value = adopter.adopt_value(target, &value)?;
        let new_key = allocator.next_key();
        appended.push((Object::string_literal(new_key.as_str()), value));
        renamed.insert(old_key, new_key);
    }
    let ids_allocated = appended.len();
    name_tree::append_to_leaf(target, &target_leaf, appended)?;

    let children = match adopter.adopt_value(target, &Object::Array(source_children))? {
        Object::Array(children) => children,
        _ => Vec::new(),
    };

    repair_subtree(target, &children, &renamed, wrapper_copy, target_top)?;

    let children_appended = children.len();
    cos::edit_dict(target, target_top, |target, top| {
        let mut merged = cos::as_list(cos::entry(target, top, b"K")?);
        merged.extend(children);
        top.set("K", Object::Array(merged));
        Ok(())
    })?;

    info!(
        "[STRUCT] Spliced {} structure elements under {:?}; allocated {} IDs, next is {}.",
        children_appended,
        target_top,
        ids_allocated,
        crate::id_alloc::format_key(allocator.peek())
    );
    Ok(StructTreeOutcome::Spliced { ids_allocated, children_appended })
}

/// Walks the adopted subtree, renaming `/ID`s and re-pointing `/P`s at the target wrapper.
///
/// Elements whose ID was not renumbered (nested `/S /Document` elements) keep it.
fn repair_subtree(
    target: &mut Document,
    roots: &[Object],
    renamed: &HashMap<Vec<u8>, String>,
    wrapper_copy: ObjectId,
    target_top: ObjectId,
) -> Result<(), ComposerError> {
    let mut stack: Vec<ObjectId> = roots.iter().filter_map(|kid| kid.as_reference().ok()).collect();
    let mut visited = BTreeSet::new();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Ok(Object::Dictionary(element)) = target.get_object_mut(id) else {
            continue;
        };
        if !element.has(b"S") {
            continue;
        }

        if let Ok(Object::String(old_id, _)) = element.get(b"ID") {
            if let Some(new_id) = renamed.get(old_id) {
                element.set("ID", Object::string_literal(new_id.as_str()));
            }
        }
        if let Ok(Object::Reference(parent)) = element.get(b"P") {
            if *parent == wrapper_copy {
                element.set("P", target_top);
            }
        }

        for kid in cos::as_list(element.get(b"K").ok()) {
            if let Object::Reference(kid_id) = kid {
                stack.push(kid_id);
            }
        }
    }
    Ok(())
}

fn struct_root(doc: &Document, catalog_id: ObjectId) -> Result<DictLocation, ComposerError> {
    DictLocation::of_entry(doc, catalog_id, b"StructTreeRoot")?
        .ok_or_else(|| ComposerError::Malformed("/StructTreeRoot is missing".into()))
}

/// The single top-level structure element under `/StructTreeRoot /K`.
fn top_element(doc: &Document, root: &DictLocation) -> Result<ObjectId, ComposerError> {
    let kids = cos::as_list(root.read(doc)?.get(b"K").ok());
    match kids.as_slice() {
        [Object::Reference(id)] => {
            doc.get_dictionary(*id)?;
            Ok(*id)
        }
        _ => Err(ComposerError::Malformed(
            "/StructTreeRoot /K must hold exactly one top-level element".into(),
        )),
    }
}
