//! `word/styles.xml` and `word/settings.xml`.

use convert_utils::xml::XmlBuilder;

use crate::body::NS_W;

/// Font size of each heading level in half-points.
const HEADING_SIZES: [u32; 6] = [40, 32, 28, 26, 24, 22];

/// Body text size in half-points.
const BODY_SIZE: &str = "22";

pub fn styles_xml() -> String {
    let mut xml = XmlBuilder::new();
    xml.open_tag("w:styles", &[("xmlns:w", NS_W)]);

    xml.open_tag("w:docDefaults", &[])
        .open_tag("w:rPrDefault", &[])
        .open_tag("w:rPr", &[])
        .empty_tag(
            "w:rFonts",
            &[
                ("w:ascii", "Calibri"),
                ("w:hAnsi", "Calibri"),
                ("w:eastAsia", "Calibri"),
                ("w:cs", "Calibri"),
            ],
        )
        .empty_tag("w:sz", &[("w:val", BODY_SIZE)])
        .empty_tag("w:szCs", &[("w:val", BODY_SIZE)])
        .empty_tag("w:lang", &[("w:val", "en-US")])
        .close_tag("w:rPr")
        .close_tag("w:rPrDefault")
        .open_tag("w:pPrDefault", &[])
        .open_tag("w:pPr", &[])
        .empty_tag(
            "w:spacing",
            &[("w:after", "120"), ("w:line", "264"), ("w:lineRule", "auto")],
        )
        .close_tag("w:pPr")
        .close_tag("w:pPrDefault")
        .close_tag("w:docDefaults");

    xml.open_tag(
        "w:style",
        &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
    )
    .empty_tag("w:name", &[("w:val", "Normal")])
    .empty_tag("w:qFormat", &[])
    .close_tag("w:style");

    for (i, size) in HEADING_SIZES.iter().enumerate() {
        let level = i + 1;
        let id = format!("Heading{}", level);
        let name = format!("heading {}", level);
        let outline = i.to_string();
        let size = size.to_string();
        xml.open_tag("w:style", &[("w:type", "paragraph"), ("w:styleId", &id)])
            .empty_tag("w:name", &[("w:val", &name)])
            .empty_tag("w:basedOn", &[("w:val", "Normal")])
            .empty_tag("w:next", &[("w:val", "Normal")])
            .empty_tag("w:qFormat", &[])
            .open_tag("w:pPr", &[])
            .empty_tag("w:keepNext", &[])
            .empty_tag("w:spacing", &[("w:before", "240"), ("w:after", "120")])
            .empty_tag("w:outlineLvl", &[("w:val", &outline)])
            .close_tag("w:pPr")
            .open_tag("w:rPr", &[])
            .empty_tag("w:b", &[])
            .empty_tag("w:sz", &[("w:val", &size)])
            .empty_tag("w:szCs", &[("w:val", &size)])
            .close_tag("w:rPr")
            .close_tag("w:style");
    }

    xml.open_tag("w:style", &[("w:type", "table"), ("w:styleId", "TableGrid")])
        .empty_tag("w:name", &[("w:val", "Table Grid")])
        .open_tag("w:tblPr", &[])
        .open_tag("w:tblBorders", &[]);
    for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
        xml.empty_tag(
            side,
            &[("w:val", "single"), ("w:sz", "4"), ("w:space", "0"), ("w:color", "auto")],
        );
    }
    xml.close_tag("w:tblBorders")
        .open_tag("w:tblCellMar", &[])
        .empty_tag("w:left", &[("w:w", "108"), ("w:type", "dxa")])
        .empty_tag("w:right", &[("w:w", "108"), ("w:type", "dxa")])
        .close_tag("w:tblCellMar")
        .close_tag("w:tblPr")
        .close_tag("w:style");

    xml.close_tag("w:styles");
    xml.build()
}

pub fn settings_xml() -> String {
    let mut xml = XmlBuilder::new();
    xml.open_tag("w:settings", &[("xmlns:w", NS_W)])
        .empty_tag("w:defaultTabStop", &[("w:val", "720")])
        .empty_tag("w:characterSpacingControl", &[("w:val", "doNotCompress")])
        .open_tag("w:compat", &[])
        .empty_tag(
            "w:compatSetting",
            &[
                ("w:name", "compatibilityMode"),
                ("w:uri", "http://schemas.microsoft.com/office/word"),
                ("w:val", "15"),
            ],
        )
        .close_tag("w:compat")
        .close_tag("w:settings");
    xml.build()
}
