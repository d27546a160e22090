//! Union of catalog-level objects from a source document into a target.
//!
//! Each field follows its own rule:
//!
//! - `/Info`: every source entry is copied, the source wins on collisions.
//! - `/Lang`: last writer wins.
//! - `/Names /EmbeddedFiles`: the source list is appended to the target's,
//!   only when the target already has one.
//! - `/Outlines`: adopted only when the target has none.
//! - `/AcroForm`: `NeedAppearances` and `SigFlags` are overwritten, `DR /Font`
//!   entries are added unless the target already uses the resource name.
//! - `/StructTreeRoot`: delegated to [`crate::struct_tree`] when requested.
//!
//! Missing optional source data is never an error. All reads the field rules
//! depend on happen in [`plan_union`], before the target is touched: the shape
//! of every merged source entry, the target dictionaries that must exist
//! (`Info`, `AcroForm`) and the structure-tree plan. A failing merge therefore
//! leaves the target unchanged.

use crate::adopt::ObjectAdopter;
use crate::cos::{self, DictLocation};
use crate::error::ComposerError;
use crate::struct_tree::{self, StructTreeOutcome, StructTreePlan};
use log::{debug, info, warn};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Options for [`merge`] and [`union_global_objects`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {
    /// Merge the tagged-PDF logical structure trees as well.
    pub copy_accessibility_tags: bool,
}

/// Unions the catalog-level objects of `source` into `target`.
///
/// Objects reachable from the merged fields are copied into `target`'s id
/// space; `source` is only read. Callers serialize all merges into one target.
pub fn merge(target: &mut Document, source: &Document, options: &MergeOptions) -> Result<(), ComposerError> {
    let mut adopter = ObjectAdopter::new(source);
    union_global_objects(target, &mut adopter, options).map(|_| ())
}

/// [`merge`] with a caller-supplied adopter, so that later steps (page merging)
/// reuse the objects this step already adopted.
///
/// Returns the structure-tree outcome when accessibility tags were requested.
pub fn union_global_objects(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    options: &MergeOptions,
) -> Result<Option<StructTreeOutcome>, ComposerError> {
    let plan = plan_union(target, adopter.source(), options)?;
    let target_catalog_id = cos::catalog_id(target)?;

    if let Some((from, into)) = plan.info {
        merge_info(target, adopter, from, &into)?;
    }
    if let Some(lang) = plan.lang {
        merge_lang(target, adopter, lang, target_catalog_id)?;
    }
    if let Some((files, names)) = plan.embedded_files {
        merge_embedded_files(target, adopter, files, &names)?;
    }
    if let Some(outlines) = plan.outlines {
        merge_outlines(target, adopter, outlines, target_catalog_id)?;
    }

    let outcome = match plan.struct_tree {
        Some(struct_plan) => Some(struct_tree::apply(struct_plan, target, adopter)?),
        None => None,
    };

    if let Some(acro_form) = plan.acro_form {
        merge_acro_form(target, adopter, acro_form)?;
    }

    info!("[UNION] Catalog objects merged; {} source objects adopted.", adopter.len());
    Ok(outcome)
}

/// The field rules that apply to one merge, with their source values borrowed.
struct UnionPlan<'s> {
    info: Option<(&'s Dictionary, DictLocation)>,
    lang: Option<&'s Object>,
    /// The source `/EmbeddedFiles /Names` list and the target's `/Names` dictionary.
    embedded_files: Option<(&'s Vec<Object>, DictLocation)>,
    /// The raw source `/Outlines` value, present only when the target has none.
    outlines: Option<&'s Object>,
    struct_tree: Option<StructTreePlan>,
    acro_form: Option<AcroFormPlan<'s>>,
}

struct AcroFormPlan<'s> {
    into: DictLocation,
    scalars: Vec<(&'static [u8], &'s Object)>,
    /// `None` when the source has no `DR /Font`; the target's is then left alone.
    fonts: Option<Vec<(&'s Vec<u8>, &'s Object)>>,
    /// Source font names the target already uses.
    collisions: Vec<&'s Vec<u8>>,
}

/// Reads everything the field rules need. Never mutates either document.
fn plan_union<'s>(
    target: &Document,
    source: &'s Document,
    options: &MergeOptions,
) -> Result<UnionPlan<'s>, ComposerError> {
    let source_catalog = cos::catalog(source)?;
    let target_catalog_id = cos::catalog_id(target)?;
    let target_catalog = target.get_dictionary(target_catalog_id)?;

    let info = match info_dict(source)? {
        Some(from) => {
            let into = info_location(target, target_catalog_id)?
                .ok_or(ComposerError::PreconditionMissing { dictionary: "Info" })?;
            Some((from, into))
        }
        None => None,
    };

    let lang = cos::entry(source, source_catalog, b"Lang")?;

    let source_files = embedded_file_names(source, source_catalog)?;
    let embedded_files = match source_files {
        Some(files) => match embedded_file_names(target, target_catalog)? {
            Some(_) => DictLocation::of_entry(target, target_catalog_id, b"Names")?.map(|names| (files, names)),
            None => {
                debug!("[UNION] Target has no embedded files name tree; skipping embedded files.");
                None
            }
        },
        None => None,
    };

    let outlines = match cos::entry_dict(source, source_catalog, b"Outlines")? {
        Some(_) => match cos::entry(target, target_catalog, b"Outlines")? {
            Some(_) => {
                debug!("[UNION] Target already has outlines; keeping them.");
                None
            }
            None => Some(source_catalog.get(b"Outlines")?),
        },
        None => None,
    };

    let struct_tree = if options.copy_accessibility_tags {
        Some(struct_tree::plan(target, source)?)
    } else {
        None
    };

    let acro_form = match cos::entry_dict(source, source_catalog, b"AcroForm")? {
        Some(from) => {
            let into = DictLocation::of_entry(target, target_catalog_id, b"AcroForm")?
                .ok_or(ComposerError::PreconditionMissing { dictionary: "AcroForm" })?;
            Some(plan_acro_form(target, source, from, into)?)
        }
        None => None,
    };

    Ok(UnionPlan { info, lang, embedded_files, outlines, struct_tree, acro_form })
}

/// The document information dictionary: the trailer's `/Info`, else the catalog's.
fn info_dict(doc: &Document) -> Result<Option<&Dictionary>, ComposerError> {
    match cos::entry_dict(doc, &doc.trailer, b"Info")? {
        Some(info) => Ok(Some(info)),
        None => cos::entry_dict(doc, cos::catalog(doc)?, b"Info"),
    }
}

fn info_location(doc: &Document, catalog_id: ObjectId) -> Result<Option<DictLocation>, ComposerError> {
    match DictLocation::of_trailer_entry(doc, b"Info")? {
        Some(location) => Ok(Some(location)),
        None => DictLocation::of_entry(doc, catalog_id, b"Info"),
    }
}

fn merge_info(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    from: &Dictionary,
    into: &DictLocation,
) -> Result<(), ComposerError> {
    let mut entries = Vec::new();
    for (key, value) in from.iter() {
        entries.push((key.clone(), adopter.adopt_value(target, value)?));
    }
    let count = entries.len();
    into.edit(target, |_, info| {
        for (key, value) in entries {
            info.set(key, value);
        }
        Ok(())
    })?;
    debug!("[UNION] Copied {} /Info entries.", count);
    Ok(())
}

fn merge_lang(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    lang: &Object,
    target_catalog_id: ObjectId,
) -> Result<(), ComposerError> {
    let lang = adopter.adopt_value(target, lang)?;
    cos::edit_dict(target, target_catalog_id, |_, catalog| {
        catalog.set("Lang", lang);
        Ok(())
    })
}

/// The `/Names /EmbeddedFiles /Names` list of a catalog, if the whole path exists.
fn embedded_file_names<'a>(
    doc: &'a Document,
    catalog: &'a Dictionary,
) -> Result<Option<&'a Vec<Object>>, ComposerError> {
    let Some(names) = cos::entry_dict(doc, catalog, b"Names")? else {
        return Ok(None);
    };
    let Some(embedded) = cos::entry_dict(doc, names, b"EmbeddedFiles")? else {
        return Ok(None);
    };
    cos::entry_array(doc, embedded, b"Names")
}

fn merge_embedded_files(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    source_files: &[Object],
    names_location: &DictLocation,
) -> Result<(), ComposerError> {
    let appended = match adopter.adopt_value(target, &Object::Array(source_files.to_vec()))? {
        Object::Array(items) => items,
        _ => Vec::new(),
    };
    let count = appended.len() / 2;
    names_location.edit(target, |doc, names| {
        cos::edit_entry_dict(doc, names, b"EmbeddedFiles", false, |doc, embedded| {
            let mut files = cos::entry_array(doc, embedded, b"Names")?.cloned().unwrap_or_default();
            files.extend(appended);
            embedded.set("Names", Object::Array(files));
            Ok(())
        })?;
        Ok(())
    })?;
    debug!("[UNION] Appended {} embedded files.", count);
    Ok(())
}

fn merge_outlines(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    outlines: &Object,
    target_catalog_id: ObjectId,
) -> Result<(), ComposerError> {
    let outlines = adopter.adopt_value(target, outlines)?;
    cos::edit_dict(target, target_catalog_id, |_, catalog| {
        catalog.set("Outlines", outlines);
        Ok(())
    })
}

fn plan_acro_form<'s>(
    target: &Document,
    source: &'s Document,
    from: &'s Dictionary,
    into: DictLocation,
) -> Result<AcroFormPlan<'s>, ComposerError> {
    let mut scalars = Vec::new();
    for key in [&b"NeedAppearances"[..], &b"SigFlags"[..]] {
        if let Some(value) = cos::entry(source, from, key)? {
            scalars.push((key, value));
        }
    }

    let source_fonts = match cos::entry_dict(source, from, b"DR")? {
        Some(dr) => cos::entry_dict(source, dr, b"Font")?,
        None => None,
    };

    let mut collisions = Vec::new();
    let fonts = match source_fonts {
        Some(source_fonts) => {
            let existing = target_font_names(target, &into)?;
            let mut fonts = Vec::new();
            for (name, font) in source_fonts.iter() {
                if existing.contains(name) {
                    collisions.push(name);
                } else {
                    fonts.push((name, font));
                }
            }
            Some(fonts)
        }
        None => None,
    };

    Ok(AcroFormPlan { into, scalars, fonts, collisions })
}

fn merge_acro_form(
    target: &mut Document,
    adopter: &mut ObjectAdopter<'_>,
    plan: AcroFormPlan<'_>,
) -> Result<(), ComposerError> {
    let AcroFormPlan { into, scalars, fonts, collisions } = plan;
    for name in collisions {
        warn!(
            "[UNION] AcroForm font resource /{} exists in both documents; keeping the target's.",
            String::from_utf8_lossy(name)
        );
    }

    let mut adopted_scalars = Vec::with_capacity(scalars.len());
    for (key, value) in scalars {
        adopted_scalars.push((key, adopter.adopt_value(target, value)?));
    }
    let adopted_fonts = match fonts {
        Some(fonts) => {
            let mut adopted = Vec::with_capacity(fonts.len());
            for (name, font) in fonts {
                adopted.push((name.clone(), adopter.adopt_value(target, font)?));
            }
            Some(adopted)
        }
        None => None,
    };

    let added_fonts = adopted_fonts.as_ref().map_or(0, Vec::len);
    into.edit(target, |doc, acro_form| {
        for (key, value) in adopted_scalars {
            acro_form.set(key.to_vec(), value);
        }
        if let Some(fonts) = adopted_fonts {
            cos::edit_entry_dict(doc, acro_form, b"DR", true, |doc, dr| {
                cos::edit_entry_dict(doc, dr, b"Font", true, |_, font_dict| {
                    for (name, font) in fonts {
                        font_dict.set(name, font);
                    }
                    Ok(())
                })
            })?;
        }
        Ok(())
    })?;
    debug!("[UNION] Merged AcroForm; added {} default-resource fonts.", added_fonts);
    Ok(())
}

fn target_font_names(target: &Document, acro_form: &DictLocation) -> Result<BTreeSet<Vec<u8>>, ComposerError> {
    let acro_form = acro_form.read(target)?;
    let Some(dr) = cos::entry_dict(target, acro_form, b"DR")? else {
        return Ok(BTreeSet::new());
    };
    let Some(fonts) = cos::entry_dict(target, dr, b"Font")? else {
        return Ok(BTreeSet::new());
    };
    Ok(fonts.iter().map(|(name, _)| name.clone()).collect())
}
