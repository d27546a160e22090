use lopdf::{Dictionary, Document, Object, ObjectId};

/// Resolve a value that may be stored inline or behind a reference.
pub fn resolve<'a>(doc: &'a Document, value: &'a Object) -> &'a Object {
    match value {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        other => other,
    }
}

pub fn catalog(doc: &Document) -> &Dictionary {
    doc.catalog().unwrap()
}

/// Resolve `key` of `dict` to a dictionary, panicking if it is absent.
pub fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> &'a Dictionary {
    resolve(doc, dict.get(key).unwrap()).as_dict().unwrap()
}

pub fn info(doc: &Document) -> &Dictionary {
    dict_entry(doc, &doc.trailer, b"Info")
}

pub fn text(object: &Object) -> String {
    match object {
        Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
        other => panic!("expected a string, found {:?}", other),
    }
}

/// The text shown on page `page_number` (1-based).
pub fn page_content(doc: &Document, page_number: u32) -> String {
    let pages = doc.get_pages();
    let content = doc.get_page_content(*pages.get(&page_number).unwrap()).unwrap();
    String::from_utf8_lossy(&content).into_owned()
}

/// The leaf of the structure ID tree.
pub fn id_tree_leaf(doc: &Document) -> &Dictionary {
    let struct_root = dict_entry(doc, catalog(doc), b"StructTreeRoot");
    let id_tree = dict_entry(doc, struct_root, b"IDTree");
    let leaf = &id_tree.get(b"Kids").unwrap().as_array().unwrap()[0];
    resolve(doc, leaf).as_dict().unwrap()
}

pub fn id_tree_keys(doc: &Document) -> Vec<String> {
    let names = id_tree_leaf(doc).get(b"Names").unwrap().as_array().unwrap();
    names.chunks(2).map(|pair| text(&pair[0])).collect()
}

pub fn id_tree_limits(doc: &Document) -> (String, String) {
    let limits = id_tree_leaf(doc).get(b"Limits").unwrap().as_array().unwrap();
    (text(&limits[0]), text(&limits[1]))
}

/// The top-level structure element and its children.
pub fn struct_top(doc: &Document) -> (ObjectId, Vec<ObjectId>) {
    let struct_root = dict_entry(doc, catalog(doc), b"StructTreeRoot");
    let top = struct_root.get(b"K").unwrap().as_reference().unwrap();
    let kids = doc.get_dictionary(top).unwrap().get(b"K").unwrap().as_array().unwrap();
    (top, kids.iter().map(|kid| kid.as_reference().unwrap()).collect())
}

/// Every reference reachable from the object table and the trailer that does not resolve.
pub fn dangling_references(doc: &Document) -> Vec<ObjectId> {
    let mut dangling = Vec::new();
    let mut stack: Vec<&Object> = doc.objects.values().collect();
    stack.extend(doc.trailer.iter().map(|(_, value)| value));
    while let Some(object) = stack.pop() {
        match object {
            Object::Reference(id) => {
                if !doc.objects.contains_key(id) {
                    dangling.push(*id);
                }
            }
            Object::Array(items) => stack.extend(items.iter()),
            Object::Dictionary(dict) => stack.extend(dict.iter().map(|(_, value)| value)),
            Object::Stream(stream) => stack.extend(stream.dict.iter().map(|(_, value)| value)),
            _ => {}
        }
    }
    dangling
}

/// Serialize and parse a document again.
pub fn reload(doc: &mut Document) -> Result<Document, Box<dyn std::error::Error>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(Document::load_mem(&bytes)?)
}

/// Assert that every reference in the document resolves inside its own object table
#[macro_export]
macro_rules! assert_no_dangling_references {
    ($doc:expr) => {
        let dangling = $crate::common::pdf_assertions::dangling_references(&$doc);
        assert!(dangling.is_empty(), "Document has dangling references: {:?}", dangling);
    };
}

/// Assert the number of pages in a document
#[macro_export]
macro_rules! assert_page_count {
    ($doc:expr, $count:expr) => {
        assert_eq!(
            $doc.get_pages().len(),
            $count,
            "Expected {} pages, got {}",
            $count,
            $doc.get_pages().len()
        );
    };
}
