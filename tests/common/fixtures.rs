use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// Create a document with `num_pages` pages, each showing "`prefix` X".
///
/// Pages inherit `MediaBox` and `Resources` from the page tree root, and the
/// trailer carries an empty `/Info` dictionary.
pub fn text_document(num_pages: u32, prefix: &str) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids: Vec<Object> = vec![];
    for i in 1..=num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("{} {}", prefix, i))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => num_pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
        }
        .into(),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(Dictionary::new());
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc
}

pub fn catalog_id(doc: &Document) -> ObjectId {
    doc.trailer.get(b"Root").unwrap().as_reference().unwrap()
}

pub fn set_catalog(doc: &mut Document, key: &str, value: impl Into<Object>) {
    let id = catalog_id(doc);
    doc.get_dictionary_mut(id).unwrap().set(key, value);
}

/// Set `/Info` entries, all as literal strings.
pub fn set_info(doc: &mut Document, entries: &[(&str, &str)]) {
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary_mut(info_id).unwrap();
    for (key, value) in entries {
        info.set(*key, Object::string_literal(*value));
    }
}

/// Give the document an embedded files name tree listing `names`. Returns the file spec ids.
pub fn with_embedded_files(doc: &mut Document, names: &[&str]) -> Vec<ObjectId> {
    let mut list: Vec<Object> = Vec::new();
    let mut specs = Vec::new();
    for name in names {
        let spec = doc.add_object(dictionary! {
            "Type" => "Filespec",
            "F" => Object::string_literal(*name),
        });
        list.push(Object::string_literal(*name));
        list.push(spec.into());
        specs.push(spec);
    }
    let names_id = doc.add_object(dictionary! {
        "EmbeddedFiles" => dictionary! { "Names" => list },
    });
    set_catalog(doc, "Names", names_id);
    specs
}

/// Give the document an outline with one item per title. Returns the outline root id.
pub fn with_outlines(doc: &mut Document, titles: &[&str]) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = titles.iter().map(|_| doc.new_object_id()).collect();
    for (index, title) in titles.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(*title),
            "Parent" => outlines_id,
        };
        if index > 0 {
            item.set("Prev", item_ids[index - 1]);
        }
        if index + 1 < item_ids.len() {
            item.set("Next", item_ids[index + 1]);
        }
        doc.objects.insert(item_ids[index], item.into());
    }
    let mut outlines = dictionary! { "Type" => "Outlines", "Count" => titles.len() as i64 };
    if let (Some(first), Some(last)) = (item_ids.first(), item_ids.last()) {
        outlines.set("First", *first);
        outlines.set("Last", *last);
    }
    doc.objects.insert(outlines_id, outlines.into());
    set_catalog(doc, "Outlines", outlines_id);
    outlines_id
}

/// Give the document an AcroForm whose default resources list `fonts`. Returns the font ids.
pub fn with_acro_form(doc: &mut Document, fonts: &[&str]) -> Vec<ObjectId> {
    let mut font_dict = Dictionary::new();
    let mut ids = Vec::new();
    for name in fonts {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => *name,
        });
        font_dict.set(*name, id);
        ids.push(id);
    }
    let acro_form = doc.add_object(dictionary! {
        "Fields" => Vec::<Object>::new(),
        "DR" => dictionary! { "Font" => font_dict },
    });
    set_catalog(doc, "AcroForm", acro_form);
    ids
}

/// A tagged document: `StructTreeRoot -> Document -> [children]`.
pub struct TaggedDocument {
    pub doc: Document,
    pub struct_root: ObjectId,
    pub top: ObjectId,
    pub children: Vec<ObjectId>,
}

/// Create a tagged document with one structure element per entry of `types`,
/// listed in a single-leaf `/IDTree` under keys `node00000001`, `node00000002`, ...
pub fn tagged_document(types: &[&str], num_pages: u32) -> TaggedDocument {
    let mut doc = text_document(num_pages, "Tagged Page");
    let first_page = doc.get_pages().values().next().copied();
    let struct_root = doc.new_object_id();
    let top = doc.new_object_id();

    let mut names: Vec<Object> = Vec::new();
    let mut children = Vec::new();
    for (index, s) in types.iter().enumerate() {
        let key = format!("node{:08}", index + 1);
        let mut element = dictionary! {
            "Type" => "StructElem",
            "S" => *s,
            "P" => top,
            "ID" => Object::string_literal(key.as_str()),
            "K" => vec![Object::Integer(index as i64)],
        };
        if let Some(page) = first_page {
            element.set("Pg", page);
        }
        let id = doc.add_object(element);
        names.push(Object::string_literal(key));
        names.push(id.into());
        children.push(id);
    }

    let kids: Vec<Object> = children.iter().map(|id| Object::Reference(*id)).collect();
    doc.objects.insert(
        top,
        dictionary! { "Type" => "StructElem", "S" => "Document", "P" => struct_root, "K" => kids }.into(),
    );

    let mut leaf = dictionary! {};
    if names.len() >= 2 {
        leaf.set("Limits", vec![names[0].clone(), names[names.len() - 2].clone()]);
    }
    leaf.set("Names", names);
    let leaf_id = doc.add_object(leaf);
    let id_tree = doc.add_object(dictionary! { "Kids" => vec![leaf_id.into()] });
    doc.objects.insert(
        struct_root,
        dictionary! { "Type" => "StructTreeRoot", "K" => top, "IDTree" => id_tree }.into(),
    );

    set_catalog(&mut doc, "StructTreeRoot", struct_root);
    set_catalog(&mut doc, "MarkInfo", dictionary! { "Marked" => true });
    TaggedDocument { doc, struct_root, top, children }
}
