//! Moving the source document's pages into the target's page tree.

use crate::adopt::ObjectAdopter;
use crate::cos;
use crate::error::ComposerError;
use log::{debug, info};
use lopdf::{Document, Object, ObjectId};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Where the source pages go relative to the target's own pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagePlacement {
    #[default]
    Append,
    Prepend,
}

/// The target's root `Pages` node.
pub(crate) fn pages_root(doc: &Document) -> Result<ObjectId, ComposerError> {
    match cos::catalog(doc)?.get(b"Pages").ok() {
        Some(Object::Reference(id)) => Ok(*id),
        None | Some(Object::Null) => Err(ComposerError::PreconditionMissing { dictionary: "Pages" }),
        Some(_) => Err(ComposerError::Malformed("/Pages is not an indirect reference".into())),
    }
}

/// Adopts every page of the adopter's source into `target`'s root `Pages` node.
///
/// Pages keep their source order. Attributes a page inherited from its source
/// ancestors are copied onto the page itself, since it is reparented directly
/// under the target root. Returns the target ids of the merged pages.
pub fn merge_pages(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    placement: PagePlacement,
) -> Result<Vec<ObjectId>, ComposerError> {
    let root_id = pages_root(target)?;
    let source = adopter.source();
    let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
    if source_pages.is_empty() {
        debug!("[PAGES] Source has no pages.");
        return Ok(Vec::new());
    }

    let mut merged = Vec::with_capacity(source_pages.len());
    for page_id in source_pages {
        let inherited = inherited_attributes(source, page_id)?;
        let new_id = adopter.adopt(target, page_id)?;

        let mut materialized = Vec::with_capacity(inherited.len());
        for (key, value) in inherited {
            materialized.push((key, adopter.adopt_value(target, &value)?));
        }
        cos::edit_dict(target, new_id, |_, page| {
            for (key, value) in materialized {
                page.set(key.to_vec(), value);
            }
            page.set("Parent", root_id);
            Ok(())
        })?;
        merged.push(new_id);
    }

    drop_adopted_page_nodes(target, adopter)?;

    let added = merged.len() as i64;
    cos::edit_dict(target, root_id, |doc, root| {
        let existing = cos::entry_array(doc, root, b"Kids")?.cloned().unwrap_or_default();
        let count = match cos::entry(doc, root, b"Count")? {
            Some(count) => count.as_i64()?,
            None => existing.len() as i64,
        };
        let fresh = merged.iter().map(|id| Object::Reference(*id));
        let kids: Vec<Object> = match placement {
            PagePlacement::Append => existing.into_iter().chain(fresh).collect(),
            PagePlacement::Prepend => fresh.chain(existing).collect(),
        };
        root.set("Kids", kids);
        root.set("Count", count + added);
        Ok(())
    })?;

    info!("[PAGES] Merged {} pages ({:?}).", added, placement);
    Ok(merged)
}

/// Inheritable attributes `page` lacks itself, taken from its nearest ancestor that has them.
fn inherited_attributes(source: &Document, page: ObjectId) -> Result<Vec<(&'static [u8], Object)>, ComposerError> {
    let page_dict = source.get_dictionary(page)?;
    let mut missing: Vec<&'static [u8]> = INHERITABLE.into_iter().filter(|key| !page_dict.has(key)).collect();
    let mut found = Vec::new();
    let mut parent = page_dict.get(b"Parent").and_then(Object::as_reference).ok();
    let mut visited = BTreeSet::new();

    while let Some(node_id) = parent {
        if missing.is_empty() {
            break;
        }
        if !visited.insert(node_id) {
            return Err(ComposerError::Malformed(format!("page tree cycle at {:?}", node_id)));
        }
        let node = source.get_dictionary(node_id)?;
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((*key, value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(found)
}

/// Every intermediate `Pages` node of the source page tree.
fn source_page_nodes(source: &Document) -> Result<Vec<ObjectId>, ComposerError> {
    let Ok(root) = pages_root(source) else {
        return Ok(Vec::new());
    };
    let mut nodes = Vec::new();
    let mut visited = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Ok(node) = source.get_dictionary(id) else {
            continue;
        };
        let Some(kids) = cos::entry_array(source, node, b"Kids")? else {
            continue;
        };
        nodes.push(id);
        stack.extend(kids.iter().filter_map(|kid| kid.as_reference().ok()));
    }
    Ok(nodes)
}

/// Removes target copies of source `Pages` nodes pulled in through `/Parent` links.
fn drop_adopted_page_nodes(target: &mut Document, adopter: &ObjectAdopter<'_>) -> Result<(), ComposerError> {
    let mut dropped = 0;
    for node in source_page_nodes(adopter.source())? {
        if let Some(copy) = adopter.adopted(node) {
            target.objects.remove(&copy);
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!("[PAGES] Dropped {} copied source page-tree nodes.", dropped);
    }
    Ok(())
}
