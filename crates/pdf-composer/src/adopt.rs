use crate::error::ComposerError;
use log::warn;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Moves objects from a source document into a target document's id space.
///
/// Every source object is copied at most once per adopter: the id map is
/// consulted before copying, so objects shared between several catalog
/// entries stay shared in the target and reference cycles terminate.
/// Ids are reserved before an object's content is copied, and the content is
/// copied from an explicit work list, so arbitrarily long `/Next` chains or
/// deep structure trees never grow the call stack.
pub struct ObjectAdopter<'a> {
    source: &'a Document,
    id_map: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> ObjectAdopter<'a> {
    pub fn new(source: &'a Document) -> Self {
        Self { source, id_map: BTreeMap::new() }
    }

    /// The document objects are adopted from.
    pub fn source(&self) -> &'a Document {
        self.source
    }

    /// The target id a source object was adopted as, if it has been.
    pub fn adopted(&self, source_id: ObjectId) -> Option<ObjectId> {
        self.id_map.get(&source_id).copied()
    }

    /// Number of source objects adopted (or aliased) so far.
    pub fn len(&self) -> usize {
        self.id_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_map.is_empty()
    }

    /// Declares that `source_id` is represented by the existing `target_id`.
    ///
    /// References to `source_id` adopted afterwards point at `target_id` and the
    /// source object itself is never copied. An existing mapping is kept.
    pub fn alias(&mut self, source_id: ObjectId, target_id: ObjectId) -> ObjectId {
        *self.id_map.entry(source_id).or_insert(target_id)
    }

    /// Adopts an indirect object and everything reachable from it.
    pub fn adopt(&mut self, target: &mut Document, source_id: ObjectId) -> Result<ObjectId, ComposerError> {
        let mut pending = Vec::new();
        let target_id = self.reserve(target, source_id, &mut pending);
        self.drain(target, pending)?;
        Ok(target_id)
    }

    /// Rewrites every reference inside a direct value, adopting what it points at.
    pub fn adopt_value(&mut self, target: &mut Document, value: &Object) -> Result<Object, ComposerError> {
        let mut pending = Vec::new();
        let remapped = self.remap(target, value.clone(), &mut pending);
        self.drain(target, pending)?;
        Ok(remapped)
    }

    /// Returns the target id for `source_id`, reserving a placeholder if it is new.
    fn reserve(
        &mut self,
        target: &mut Document,
        source_id: ObjectId,
        pending: &mut Vec<(ObjectId, ObjectId)>,
    ) -> ObjectId {
        if let Some(target_id) = self.id_map.get(&source_id) {
            return *target_id;
        }
        // The placeholder keeps the id allocated until the real content lands.
        let target_id = target.add_object(Object::Null);
        self.id_map.insert(source_id, target_id);
        pending.push((source_id, target_id));
        target_id
    }

    fn drain(
        &mut self,
        target: &mut Document,
        mut pending: Vec<(ObjectId, ObjectId)>,
    ) -> Result<(), ComposerError> {
        while let Some((source_id, target_id)) = pending.pop() {
            let object = match self.source.objects.get(&source_id) {
                Some(object) => object.clone(),
                None => {
                    warn!(
                        "[ADOPT] Source object {:?} does not exist; adopting it as null.",
                        source_id
                    );
                    Object::Null
                }
            };
            let remapped = self.remap(target, object, &mut pending);
            target.objects.insert(target_id, remapped);
        }
        Ok(())
    }

    fn remap(
        &mut self,
        target: &mut Document,
        object: Object,
        pending: &mut Vec<(ObjectId, ObjectId)>,
    ) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.reserve(target, id, pending)),
            Object::Array(items) => Object::Array(
                items
                    .into_iter()
                    .map(|item| self.remap(target, item, pending))
                    .collect(),
            ),
            Object::Dictionary(mut dict) => {
                for (_, value) in dict.iter_mut() {
                    let old = std::mem::replace(value, Object::Null);
                    *value = self.remap(target, old, pending);
                }
                Object::Dictionary(dict)
            }
            Object::Stream(mut stream) => {
                for (_, value) in stream.dict.iter_mut() {
                    let old = std::mem::replace(value, Object::Null);
                    *value = self.remap(target, old, pending);
                }
                Object::Stream(stream)
            }
            other => other,
        }
    }
}
