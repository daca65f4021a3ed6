//! Deep copy of page object graphs between documents.
//!
//! Objects are copied with id remapping. Page and page-tree nodes reached
//! through references are never followed, so copying one page does not drag
//! the rest of the source document along.

use std::collections::{BTreeMap, VecDeque};

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Limit for walking `Parent` chains, guarding against cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Copies objects from one source document into a target document.
///
/// A copier keeps one id map for its whole lifetime, so objects shared by
/// several copied pages (fonts, images) are copied once.
pub struct ObjectCopier<'a> {
    source: &'a Document,
    remap: BTreeMap<ObjectId, ObjectId>,
    pending: VecDeque<(ObjectId, ObjectId)>,
}

impl<'a> ObjectCopier<'a> {
    /// Create a copier reading from `source`.
    pub fn new(source: &'a Document) -> Self {
        Self {
            source,
            remap: BTreeMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Reserve a target id for a source page before copying.
    ///
    /// References to a reserved page (link annotations, `/P` entries) then
    /// resolve to its copy instead of being dropped.
    pub fn reserve_page(&mut self, target: &mut Document, source_page: ObjectId) -> ObjectId {
        if let Some(id) = self.remap.get(&source_page) {
            return *id;
        }
        let id = target.new_object_id();
        self.remap.insert(source_page, id);
        id
    }

    /// Copy a page dictionary into `target` under `target_id`.
    ///
    /// Inherited attributes are written onto the copy and `Parent` is removed;
    /// the caller attaches the page to a tree.
    pub fn copy_page(&mut self, target: &mut Document, source_page: ObjectId, target_id: ObjectId) {
        let mut dict = self
            .source
            .get_dictionary(source_page)
            .cloned()
            .unwrap_or_default();

        for key in INHERITABLE {
            if !dict.has(key)
                && let Some(value) = inherited_attribute(self.source, source_page, key)
            {
                dict.set(key, value.clone());
            }
        }
        dict.remove(b"Parent");
        dict.set("Type", Object::Name(b"Page".to_vec()));

        let copied = self.copy_dictionary(target, &dict);
        target.objects.insert(target_id, Object::Dictionary(copied));
        self.drain(target);
    }

    /// Copy every object reachable from queued references.
    fn drain(&mut self, target: &mut Document) {
        while let Some((source_id, target_id)) = self.pending.pop_front() {
            let copied = match self.source.get_object(source_id) {
                Ok(object) if is_page_node(object) => Object::Null,
                Ok(object) => self.copy_object(target, object),
                // dangling references become null rather than failing the copy
                Err(_) => Object::Null,
            };
            target.objects.insert(target_id, copied);
        }
    }

    fn map_reference(&mut self, target: &mut Document, id: ObjectId) -> ObjectId {
        if let Some(mapped) = self.remap.get(&id) {
            return *mapped;
        }
        let mapped = target.new_object_id();
        self.remap.insert(id, mapped);
        self.pending.push_back((id, mapped));
        mapped
    }

    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.map_reference(target, *id)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(target, item))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(target, dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(target, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.copy_object(target, value));
        }
        copy
    }
}

/// Find an attribute on a page or the nearest ancestor that defines it.
pub fn inherited_attribute<'d>(
    doc: &'d Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'d Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Follow a reference to its target, or return the object itself.
pub fn resolve<'d>(doc: &'d Document, object: &'d Object) -> Option<&'d Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn is_page_node(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Page") | Ok(b"Pages")
    )
}
