//! Fixture builders shared by the engine unit tests.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

/// Wrap each text in its own run inside one paragraph.
pub fn paragraph(runs: &[&str]) -> String {
    let mut xml = String::from("<w:p>");
    for text in runs {
        xml.push_str(r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">"#);
        xml.push_str(text);
        xml.push_str("</w:t></w:r>");
    }
    xml.push_str("</w:p>");
    xml
}

/// Wrap paragraphs into a minimal part document.
pub fn part_xml(paragraphs: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        paragraphs.concat()
    )
}

/// Build a package with a content-types entry followed by `entries`.
pub fn docx(entries: &[(&str, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Package with only a body made of the given paragraphs.
pub fn body_only(paragraphs: &[String]) -> Vec<u8> {
    docx(&[("word/document.xml", part_xml(paragraphs))])
}

pub fn read_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}
