//! In-memory PDF fixtures for unit tests.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Builds a small PDF with shared resources: `F1` Helvetica, `F2`
/// Helvetica-Bold, `F3` Helvetica-Oblique, plus any registered XObjects.
pub struct TestPdf {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    xobjects: Dictionary,
    catalog: Dictionary,
    info: Option<Dictionary>,
}

impl TestPdf {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            xobjects: Dictionary::new(),
            catalog: Dictionary::new(),
            info: None,
        }
    }

    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Reserve an id for an object that refers to itself indirectly.
    pub fn new_id(&mut self) -> ObjectId {
        self.doc.new_object_id()
    }

    pub fn set_object<T: Into<Object>>(&mut self, id: ObjectId, object: T) {
        self.doc.objects.insert(id, object.into());
    }

    pub fn image_resource(&mut self, name: &str, id: ObjectId) {
        self.xobjects.set(name, id);
    }

    pub fn catalog_entry<T: Into<Object>>(&mut self, key: &str, value: T) {
        self.catalog.set(key, value);
    }

    pub fn info(&mut self, info: Dictionary) {
        self.info = Some(info);
    }

    /// Append a US Letter page drawing `operations`.
    pub fn page(&mut self, operations: Vec<Operation>) -> ObjectId {
        self.page_with_box(operations, None)
    }

    pub fn page_with_box(&mut self, operations: Vec<Operation>, media_box: Option<[i64; 4]>) -> ObjectId {
        let content = Content { operations };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        };
        if let Some([x0, y0, x1, y1]) = media_box {
            page.set("MediaBox", Object::Array(vec![x0.into(), y0.into(), x1.into(), y1.into()]));
        }
        let id = self.doc.add_object(page);
        self.page_ids.push(id);
        id
    }

    pub fn build(mut self) -> (Document, Vec<ObjectId>) {
        let font = |base: &str| {
            dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            }
        };
        let fonts = dictionary! {
            "F1" => self.doc.add_object(font("Helvetica")),
            "F2" => self.doc.add_object(font("Helvetica-Bold")),
            "F3" => self.doc.add_object(font("Helvetica-Oblique")),
        };
        let resources_id = self.doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => self.xobjects.clone(),
        });

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        };
        for (key, value) in self.catalog.iter() {
            catalog.set(key.clone(), value.clone());
        }
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", catalog_id);

        if let Some(info) = self.info.take() {
            let info_id = self.doc.add_object(info);
            self.doc.trailer.set("Info", info_id);
        }

        (self.doc, self.page_ids)
    }

    pub fn save(self, path: &Path) -> Vec<ObjectId> {
        let (mut doc, pages) = self.build();
        doc.save(path).unwrap();
        pages
    }
}

/// An uncompressed 8-bit image XObject.
pub fn image_xobject_stream(width: i64, height: i64, color_space: &str, data: Vec<u8>) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        },
        data,
    )
}

/// A DCT-encoded image XObject wrapping `jpeg` as is.
pub fn jpeg_xobject_stream(width: i64, height: i64, jpeg: Vec<u8>) -> Stream {
    let mut stream = image_xobject_stream(width, height, "DeviceRGB", jpeg);
    stream.dict.set("Filter", "DCTDecode");
    stream
}

/// `BT /font size Tf x y Td (text) Tj ET`
pub fn text_ops(font: &str, size: i64, x: f64, y: f64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![Object::Real(x as f32), Object::Real(y as f32)]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}
