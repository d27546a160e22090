//! Access to name trees that consist of a single leaf.
//!
//! A leaf is either the only entry of the root's `/Kids`, or the root itself
//! when it carries `/Names` directly. Anything deeper is rejected.

use crate::cos::{self, DictLocation};
use crate::error::ComposerError;
use lopdf::{Dictionary, Document, Object};

/// A snapshot of a single name-tree leaf, read before any mutation.
#[derive(Debug, Clone)]
pub(crate) struct LeafSnapshot {
    pub location: DictLocation,
    /// Whether the leaf is a kid of the root (and so must carry `/Limits`).
    pub is_kid: bool,
    pub names: Vec<Object>,
    pub limits: Option<(Object, Object)>,
}

impl LeafSnapshot {
    /// `(key, value)` pairs in leaf order. A trailing unpaired key is ignored.
    pub fn pairs(&self) -> impl Iterator<Item = (&Object, &Object)> {
        self.names.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// The greatest key physically present: `Limits[1]`, or the last key for a root leaf.
    pub fn max_key(&self) -> Option<&Object> {
        match &self.limits {
            Some((_, max)) => Some(max),
            None => self.pairs().last().map(|(key, _)| key),
        }
    }

    pub fn min_key(&self) -> Option<&Object> {
        match &self.limits {
            Some((min, _)) => Some(min),
            None => self.pairs().next().map(|(key, _)| key),
        }
    }
}

/// Reads the leaf of the name tree stored under `key` of the dictionary at `owner`.
///
/// Returns `None` when `owner` has no such tree.
pub(crate) fn read_single_leaf(
    doc: &Document,
    owner: &DictLocation,
    key: &'static [u8],
) -> Result<Option<LeafSnapshot>, ComposerError> {
    let Some(root_location) = DictLocation::of_located_entry(doc, owner, key)? else {
        return Ok(None);
    };
    let root = root_location.read(doc)?;

    let kids = cos::entry_array(doc, root, b"Kids")?;
    let (location, leaf, is_kid) = match kids.map(Vec::as_slice) {
        None | Some([]) => (root_location, root, false),
        Some([only]) => {
            let kid_id = only.as_reference().map_err(|_| {
                ComposerError::Malformed(format!(
                    "/{} kid is not an indirect reference",
                    String::from_utf8_lossy(key)
                ))
            })?;
            let leaf = doc.get_dictionary(kid_id)?;
            if leaf.has(b"Kids") {
                return Err(ComposerError::MultiLevelIdTreeUnsupported { tree: tree_name(key) });
            }
            (DictLocation::Indirect(kid_id), leaf, true)
        }
        Some(_) => {
            return Err(ComposerError::MultiLevelIdTreeUnsupported { tree: tree_name(key) });
        }
    };

    Ok(Some(LeafSnapshot {
        location,
        is_kid,
        names: cos::entry_array(doc, leaf, b"Names")?.cloned().unwrap_or_default(),
        limits: read_limits(doc, leaf)?,
    }))
}

fn read_limits(doc: &Document, leaf: &Dictionary) -> Result<Option<(Object, Object)>, ComposerError> {
    match cos::entry_array(doc, leaf, b"Limits")?.map(Vec::as_slice) {
        None => Ok(None),
        Some([min, max]) => Ok(Some((min.clone(), max.clone()))),
        Some(_) => Err(ComposerError::Malformed("/Limits must hold exactly two keys".into())),
    }
}

fn tree_name(key: &'static [u8]) -> &'static str {
    std::str::from_utf8(key).unwrap_or("NameTree")
}

/// Appends `(key, value)` pairs to the leaf and moves its upper limit.
pub(crate) fn append_to_leaf(
    doc: &mut Document,
    leaf: &LeafSnapshot,
    appended: Vec<(Object, Object)>,
) -> Result<(), ComposerError> {
    let Some(last_key) = appended.last().map(|(key, _)| key.clone()) else {
        return Ok(());
    };
    let min_key = leaf
        .min_key()
        .cloned()
        .or_else(|| appended.first().map(|(key, _)| key.clone()));

    leaf.location.edit(doc, |doc, dict| {
        let mut names = cos::entry_array(doc, dict, b"Names")?.cloned().unwrap_or_default();
        for (key, value) in appended {
            names.push(key);
            names.push(value);
        }
        dict.set("Names", Object::Array(names));

        if leaf.is_kid || dict.has(b"Limits") {
            let min_key = min_key.unwrap_or_else(|| last_key.clone());
            dict.set("Limits", Object::Array(vec![min_key, last_key]));
        }
        Ok(())
    })
}

/// The text of a name-tree key, which is always a PDF string.
pub(crate) fn key_bytes(key: &Object) -> Option<&[u8]> {
    match key {
        Object::String(bytes, _) => Some(bytes.as_slice()),
        _ => None,
    }
}
