//! Document outline (bookmarks).

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};

use convert_core::document::{Outline, OutlineEntry};
use convert_utils::encoding::decode_pdf_string;

use crate::content::{resolve, resolve_dict};

/// Outline levels below this are ignored.
const MAX_OUTLINE_DEPTH: usize = 16;

/// Name tree and destination chains are followed at most this deep.
const MAX_LOOKUP_DEPTH: usize = 16;

/// Read the `/Outlines` tree of the catalog.
pub fn extract_outline(doc: &Document) -> Outline {
    let mut outline = Outline::new();
    let Some(catalog) = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| resolve_dict(doc, root))
    else {
        return outline;
    };
    let Some(root) = catalog
        .get(b"Outlines")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
    else {
        return outline;
    };

    let reader = OutlineReader {
        doc,
        page_numbers: doc.get_pages().into_iter().map(|(n, id)| (id, n)).collect(),
        named_dests: catalog.get(b"Dests").ok().and_then(|o| resolve_dict(doc, o)),
        dest_tree: catalog
            .get(b"Names")
            .ok()
            .and_then(|o| resolve_dict(doc, o))
            .and_then(|names| names.get(b"Dests").ok())
            .and_then(|o| resolve_dict(doc, o)),
    };

    let mut visited = HashSet::new();
    for entry in reader.read_siblings(root.get(b"First").ok(), &mut visited, 0) {
        outline.add(entry);
    }
    log::debug!("Outline has {} top-level entries", outline.entries.len());
    outline
}

struct OutlineReader<'a> {
    doc: &'a Document,
    page_numbers: HashMap<ObjectId, u32>,
    named_dests: Option<&'a Dictionary>,
    dest_tree: Option<&'a Dictionary>,
}

impl<'a> OutlineReader<'a> {
    fn read_siblings(
        &self,
        first: Option<&'a Object>,
        visited: &mut HashSet<ObjectId>,
        depth: usize,
    ) -> Vec<OutlineEntry> {
        let mut entries = Vec::new();
        let mut next = first.and_then(|o| o.as_reference().ok());

        while let Some(id) = next {
            if !visited.insert(id) {
                log::warn!("Outline item {:?} visited twice; stopping", id);
                break;
            }
            let Ok(item) = self.doc.get_dictionary(id) else {
                break;
            };

            let title = item
                .get(b"Title")
                .ok()
                .and_then(|o| resolve(self.doc, o).as_str().ok())
                .map(|raw| decode_pdf_string(raw).trim().to_string())
                .unwrap_or_default();
            let children = if depth + 1 < MAX_OUTLINE_DEPTH {
                self.read_siblings(item.get(b"First").ok(), visited, depth + 1)
            } else {
                Vec::new()
            };

            if title.is_empty() {
                entries.extend(children);
            } else {
                let mut entry = OutlineEntry::new(title, self.item_page(item));
                for child in children {
                    entry.add_child(child);
                }
                entries.push(entry);
            }

            next = item.get(b"Next").ok().and_then(|o| o.as_reference().ok());
        }
        entries
    }

    /// Page of an outline item, from `/Dest` or a GoTo action's `/D`.
    fn item_page(&self, item: &Dictionary) -> Option<u32> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.destination_page(dest, 0);
        }
        let action = item.get(b"A").ok().and_then(|o| resolve_dict(self.doc, o))?;
        let kind = action.get(b"S").ok().and_then(|o| o.as_name().ok());
        if kind != Some(b"GoTo".as_slice()) {
            return None;
        }
        self.destination_page(action.get(b"D").ok()?, 0)
    }

    fn destination_page(&self, dest: &Object, depth: usize) -> Option<u32> {
        if depth > MAX_LOOKUP_DEPTH {
            return None;
        }
        match resolve(self.doc, dest) {
            Object::Array(items) => match items.first()? {
                Object::Reference(page_id) => self.page_numbers.get(page_id).copied(),
                // Page index, as used by remote destinations.
                Object::Integer(index) => {
                    u32::try_from(*index).ok().and_then(|i| i.checked_add(1))
                }
                _ => None,
            },
            Object::Dictionary(dict) => self.destination_page(dict.get(b"D").ok()?, depth + 1),
            Object::Name(name) => {
                let target = self.named_dests?.get(name).ok()?;
                self.destination_page(target, depth + 1)
            }
            Object::String(name, _) => {
                let target = lookup_name_tree(self.doc, self.dest_tree?, name, 0)?;
                self.destination_page(target, depth + 1)
            }
            _ => None,
        }
    }
}

/// Find `key` in a name tree node (`/Names` pairs or `/Kids`).
fn lookup_name_tree<'a>(
    doc: &'a Document,
    node: &'a Dictionary,
    key: &[u8],
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_LOOKUP_DEPTH {
        return None;
    }
    if let Some(names) = node.get(b"Names").ok().and_then(|o| resolve(doc, o).as_array().ok()) {
        for pair in names.chunks(2) {
            if let [name, value] = pair {
                if resolve(doc, name).as_str().ok() == Some(key) {
                    return Some(value);
                }
            }
        }
    }
    let kids = node.get(b"Kids").ok().and_then(|o| resolve(doc, o).as_array().ok())?;
    kids.iter()
        .filter_map(|kid| resolve_dict(doc, kid))
        .find_map(|kid| lookup_name_tree(doc, kid, key, depth + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::TestPdf;
    use lopdf::dictionary;

    #[test]
    fn test_outline_with_all_destination_kinds() {
        let mut pdf = TestPdf::new();
        let p1 = pdf.page(vec![]);
        let p2 = pdf.page(vec![]);
        let p3 = pdf.page(vec![]);

        let root = pdf.new_id();
        let intro = pdf.new_id();
        let chapter = pdf.new_id();
        let section = pdf.new_id();
        let appendix = pdf.new_id();

        pdf.set_object(
            intro,
            dictionary! {
                "Title" => Object::string_literal("Introduction"),
                "Parent" => root,
                "Next" => chapter,
                "Dest" => Object::Array(vec![p1.into(), "Fit".into()]),
            },
        );
        pdf.set_object(
            chapter,
            dictionary! {
                "Title" => Object::string_literal("Chapter 1"),
                "Parent" => root,
                "Prev" => intro,
                "Next" => appendix,
                "First" => section,
                "Last" => section,
                "A" => dictionary! {
                    "S" => "GoTo",
                    "D" => Object::Array(vec![p2.into(), "XYZ".into(), 0.into(), 0.into(), 0.into()]),
                },
            },
        );
        pdf.set_object(
            section,
            dictionary! {
                "Title" => Object::string_literal("Section 1.1"),
                "Parent" => chapter,
                "Dest" => "sec11",
            },
        );
        pdf.set_object(
            appendix,
            dictionary! {
                "Title" => Object::string_literal("Appendix"),
                "Parent" => root,
                "Prev" => chapter,
                "Dest" => Object::string_literal("app"),
            },
        );
        pdf.set_object(
            root,
            dictionary! { "Type" => "Outlines", "First" => intro, "Last" => appendix },
        );
        pdf.catalog_entry("Outlines", root);
        pdf.catalog_entry(
            "Dests",
            dictionary! { "sec11" => dictionary! { "D" => Object::Array(vec![p2.into(), "Fit".into()]) } },
        );
        pdf.catalog_entry(
            "Names",
            dictionary! {
                "Dests" => dictionary! {
                    "Kids" => vec![Object::Dictionary(dictionary! {
                        "Names" => vec![
                            Object::string_literal("app"),
                            Object::Array(vec![p3.into(), "Fit".into()]),
                        ],
                    })],
                },
            },
        );
        let (doc, _) = pdf.build();

        let outline = extract_outline(&doc);
        let flat: Vec<(usize, &str, Option<u32>)> = outline
            .iter_depth_first()
            .map(|(level, e)| (level, e.title.as_str(), e.page))
            .collect();
        assert_eq!(
            flat,
            vec![
                (1, "Introduction", Some(1)),
                (1, "Chapter 1", Some(2)),
                (2, "Section 1.1", Some(2)),
                (1, "Appendix", Some(3)),
            ]
        );
    }

    #[test]
    fn test_cyclic_outline_terminates() {
        let mut pdf = TestPdf::new();
        let p1 = pdf.page(vec![]);
        let root = pdf.new_id();
        let a = pdf.new_id();
        let b = pdf.new_id();
        pdf.set_object(
            a,
            dictionary! {
                "Title" => Object::string_literal("A"),
                "Next" => b,
                "Dest" => Object::Array(vec![p1.into(), "Fit".into()]),
            },
        );
        pdf.set_object(
            b,
            dictionary! { "Title" => Object::string_literal("B"), "Next" => a, "First" => a },
        );
        pdf.set_object(root, dictionary! { "First" => a });
        pdf.catalog_entry("Outlines", root);
        let (doc, _) = pdf.build();

        let outline = extract_outline(&doc);
        assert_eq!(outline.entries.len(), 2);
        assert_eq!(outline.entries[1].title, "B");
        assert!(outline.entries[1].children.is_empty());
        assert_eq!(outline.entries[1].page, None);
    }

    #[test]
    fn test_page_index_destinations() {
        let mut pdf = TestPdf::new();
        pdf.page(vec![]);
        let root = pdf.new_id();
        let second = pdf.new_id();
        let out_of_range = pdf.new_id();
        pdf.set_object(
            second,
            dictionary! {
                "Title" => Object::string_literal("Second"),
                "Next" => out_of_range,
                "Dest" => Object::Array(vec![Object::Integer(1), "Fit".into()]),
            },
        );
        pdf.set_object(
            out_of_range,
            dictionary! {
                "Title" => Object::string_literal("Nowhere"),
                "Dest" => Object::Array(vec![Object::Integer(u32::MAX as i64), "Fit".into()]),
            },
        );
        pdf.set_object(root, dictionary! { "First" => second });
        pdf.catalog_entry("Outlines", root);
        let (doc, _) = pdf.build();

        let outline = extract_outline(&doc);
        assert_eq!(outline.entries.len(), 2);
        assert_eq!(outline.entries[0].page, Some(2));
        assert_eq!(outline.entries[1].title, "Nowhere");
        assert_eq!(outline.entries[1].page, None);
    }

    #[test]
    fn test_no_outline() {
        let mut pdf = TestPdf::new();
        pdf.page(vec![]);
        let (doc, _) = pdf.build();
        assert!(extract_outline(&doc).is_empty());
    }
}
