//! Read and edit helpers over the lopdf object table.
//!
//! Catalog-level dictionaries may be stored inline in their parent or behind a
//! reference. Reads go through [`resolve`]; writes go through [`DictLocation`],
//! which clones the dictionary, hands it to an edit closure and stores it back
//! wherever it came from.

use crate::error::ComposerError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// The catalog's object id, taken from the trailer's `/Root`.
pub(crate) fn catalog_id(doc: &Document) -> Result<ObjectId, ComposerError> {
    Ok(doc.trailer.get(b"Root")?.as_reference()?)
}

pub(crate) fn catalog(doc: &Document) -> Result<&Dictionary, ComposerError> {
    Ok(doc.get_dictionary(catalog_id(doc)?)?)
}

/// Follows a reference into the object table; direct values are returned as is.
pub(crate) fn resolve<'a>(doc: &'a Document, value: &'a Object) -> Result<&'a Object, ComposerError> {
    match value {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Looks up `key` and resolves it. Absent entries and `null` both read as `None`.
pub(crate) fn entry<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Result<Option<&'a Object>, ComposerError> {
    match dict.get(key) {
        Ok(value) => match resolve(doc, value)? {
            Object::Null => Ok(None),
            resolved => Ok(Some(resolved)),
        },
        Err(_) => Ok(None),
    }
}

pub(crate) fn entry_dict<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Result<Option<&'a Dictionary>, ComposerError> {
    match entry(doc, dict, key)? {
        Some(Object::Dictionary(found)) => Ok(Some(found)),
        Some(_) => Err(ComposerError::Malformed(format!(
            "/{} is not a dictionary",
            String::from_utf8_lossy(key)
        ))),
        None => Ok(None),
    }
}

pub(crate) fn entry_array<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Result<Option<&'a Vec<Object>>, ComposerError> {
    match entry(doc, dict, key)? {
        Some(Object::Array(items)) => Ok(Some(items)),
        Some(_) => Err(ComposerError::Malformed(format!(
            "/{} is not an array",
            String::from_utf8_lossy(key)
        ))),
        None => Ok(None),
    }
}

/// The `/S` structure type of a structure element value, if it has one.
pub(crate) fn struct_type<'a>(doc: &'a Document, value: &'a Object) -> Option<&'a [u8]> {
    match resolve(doc, value).ok()? {
        Object::Dictionary(dict) => match dict.get(b"S").ok()? {
            Object::Name(name) => Some(name.as_slice()),
            _ => None,
        },
        _ => None,
    }
}

/// Where a dictionary that the engine wants to edit is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DictLocation {
    /// Its own indirect object.
    Indirect(ObjectId),
    /// Inline under `key` of the dictionary stored at the given object.
    InObject(ObjectId, &'static [u8]),
    /// Inline under `key` of a dictionary that is itself inline somewhere.
    InEntry(Box<DictLocation>, &'static [u8]),
    /// Inline under `key` of the trailer.
    InTrailer(&'static [u8]),
}

type EditFn<'f, R> = Box<dyn FnOnce(&mut Document, &mut Dictionary) -> Result<R, ComposerError> + 'f>;

impl DictLocation {
    /// Locates the dictionary under `key` of indirect object `owner`.
    pub(crate) fn of_entry(
        doc: &Document,
        owner: ObjectId,
        key: &'static [u8],
    ) -> Result<Option<Self>, ComposerError> {
        Self::of_located_entry(doc, &DictLocation::Indirect(owner), key)
    }

    /// Locates the dictionary under `key` of the dictionary found at `parent`.
    pub(crate) fn of_located_entry(
        doc: &Document,
        parent: &DictLocation,
        key: &'static [u8],
    ) -> Result<Option<Self>, ComposerError> {
        let inline = match parent {
            DictLocation::Indirect(owner) => DictLocation::InObject(*owner, key),
            nested => DictLocation::InEntry(Box::new(nested.clone()), key),
        };
        Self::classify(doc, parent.read(doc)?.get(key).ok(), key, inline)
    }

    /// Locates the dictionary under `key` of the trailer.
    pub(crate) fn of_trailer_entry(
        doc: &Document,
        key: &'static [u8],
    ) -> Result<Option<Self>, ComposerError> {
        Self::classify(doc, doc.trailer.get(key).ok(), key, DictLocation::InTrailer(key))
    }

    fn classify(
        doc: &Document,
        value: Option<&Object>,
        key: &[u8],
        inline: DictLocation,
    ) -> Result<Option<Self>, ComposerError> {
        match value {
            None | Some(Object::Null) => Ok(None),
            Some(Object::Reference(id)) => match doc.get_object(*id)? {
                Object::Dictionary(_) => Ok(Some(DictLocation::Indirect(*id))),
                Object::Null => Ok(None),
                _ => Err(ComposerError::Malformed(format!(
                    "/{} does not reference a dictionary",
                    String::from_utf8_lossy(key)
                ))),
            },
            Some(Object::Dictionary(_)) => Ok(Some(inline)),
            Some(_) => Err(ComposerError::Malformed(format!(
                "/{} is not a dictionary",
                String::from_utf8_lossy(key)
            ))),
        }
    }

    pub(crate) fn read<'a>(&self, doc: &'a Document) -> Result<&'a Dictionary, ComposerError> {
        let found = match *self {
            DictLocation::Indirect(id) => return Ok(doc.get_dictionary(id)?),
            DictLocation::InObject(owner, key) => entry_dict(doc, doc.get_dictionary(owner)?, key)?,
            DictLocation::InEntry(ref parent, key) => entry_dict(doc, parent.read(doc)?, key)?,
            DictLocation::InTrailer(key) => entry_dict(doc, &doc.trailer, key)?,
        };
        found.ok_or_else(|| missing_entry(key_of(self)))
    }

    /// Runs `edit` against the located dictionary and stores the result back.
    pub(crate) fn edit<'f, R>(
        &self,
        doc: &mut Document,
        edit: impl FnOnce(&mut Document, &mut Dictionary) -> Result<R, ComposerError> + 'f,
    ) -> Result<R, ComposerError> {
        self.edit_boxed(doc, Box::new(edit))
    }

    fn edit_boxed<R>(&self, doc: &mut Document, edit: EditFn<'_, R>) -> Result<R, ComposerError> {
        match *self {
            DictLocation::Indirect(id) => edit_dict(doc, id, edit),
            DictLocation::InObject(owner, key) => edit_dict(doc, owner, |doc, parent| {
                edit_entry_dict(doc, parent, key, false, edit)?
                    .ok_or_else(|| missing_entry(key))
            }),
            DictLocation::InEntry(ref parent, key) => parent.edit_boxed(
                doc,
                Box::new(move |doc: &mut Document, dict: &mut Dictionary| {
                    edit_entry_dict(doc, dict, key, false, edit)?.ok_or_else(|| missing_entry(key))
                }),
            ),
            DictLocation::InTrailer(key) => {
                let mut trailer = std::mem::take(&mut doc.trailer);
                let result = edit_entry_dict(doc, &mut trailer, key, false, edit);
                doc.trailer = trailer;
                result?.ok_or_else(|| missing_entry(key))
            }
        }
    }
}

fn key_of(location: &DictLocation) -> &'static [u8] {
    match *location {
        DictLocation::Indirect(_) => b"",
        DictLocation::InObject(_, key) | DictLocation::InEntry(_, key) | DictLocation::InTrailer(key) => key,
    }
}

fn missing_entry(key: &[u8]) -> ComposerError {
    ComposerError::Malformed(format!("/{} vanished while editing", String::from_utf8_lossy(key)))
}

/// Applies `edit` to the dictionary stored as indirect object `id` and writes it back.
pub(crate) fn edit_dict<R>(
    doc: &mut Document,
    id: ObjectId,
    edit: impl FnOnce(&mut Document, &mut Dictionary) -> Result<R, ComposerError>,
) -> Result<R, ComposerError> {
    let mut dict = doc.get_dictionary(id)?.clone();
    let result = edit(doc, &mut dict)?;
    doc.objects.insert(id, Object::Dictionary(dict));
    Ok(result)
}

/// Applies `edit` to the dictionary under `key` in `parent`, inline or indirect.
///
/// With `create` set, an absent entry becomes a new inline dictionary.
/// Returns `None` when the entry is absent and `create` is not set.
pub(crate) fn edit_entry_dict<R>(
    doc: &mut Document,
    parent: &mut Dictionary,
    key: &[u8],
    create: bool,
    edit: impl FnOnce(&mut Document, &mut Dictionary) -> Result<R, ComposerError>,
) -> Result<Option<R>, ComposerError> {
    match parent.get(key).ok().cloned() {
        Some(Object::Reference(id)) => edit_dict(doc, id, edit).map(Some),
        Some(Object::Dictionary(mut dict)) => {
            let result = edit(doc, &mut dict)?;
            parent.set(key.to_vec(), dict);
            Ok(Some(result))
        }
        Some(Object::Null) | None if create => {
            let mut dict = Dictionary::new();
            let result = edit(doc, &mut dict)?;
            parent.set(key.to_vec(), dict);
            Ok(Some(result))
        }
        Some(Object::Null) | None => Ok(None),
        Some(_) => Err(ComposerError::Malformed(format!(
            "/{} is not a dictionary",
            String::from_utf8_lossy(key)
        ))),
    }
}

/// Normalises a `/K`-style value into a list: absent is empty, a lone value is a singleton.
pub(crate) fn as_list(value: Option<&Object>) -> Vec<Object> {
    match value {
        None | Some(Object::Null) => Vec::new(),
        Some(Object::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}
