//! Fixture packages and multipart payloads for the integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BOUNDARY: &str = "----docx-template-test-boundary";

/// One paragraph whose text is split into the given runs.
pub fn paragraph(runs: &[&str]) -> String {
    let mut xml = String::from("<w:p>");
    for text in runs {
        xml.push_str(r#"<w:r><w:rPr><w:i/></w:rPr><w:t xml:space="preserve">"#);
        xml.push_str(text);
        xml.push_str("</w:t></w:r>");
    }
    xml.push_str("</w:p>");
    xml
}

pub fn part(root: &str, paragraphs: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:{root} xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{}</w:{root}>"#,
        paragraphs.concat()
    )
}

/// Package with a body and optional single header and footer.
pub fn docx(body: &[String], header: Option<&[String]>, footer: Option<&[String]>) -> Vec<u8> {
    let mut entries = vec![
        (
            "[Content_Types].xml".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#.to_string(),
        ),
        ("word/document.xml".to_string(), part("document", body)),
    ];
    if let Some(header) = header {
        entries.push(("word/header1.xml".to_string(), part("hdr", header)));
    }
    if let Some(footer) = footer {
        entries.push(("word/footer1.xml".to_string(), part("ftr", footer)));
    }
    entries.push((
        "word/media/logo.bin".to_string(),
        "\u{1}\u{2}binary-ish".to_string(),
    ));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn read_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

pub fn read_entry_bytes(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    content
}

pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(|n| n.to_string()).collect::<Vec<_>>()
}

/// Entry names in stored order.
pub fn ordered_entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// A multipart form part: field name, optional filename, content.
pub struct FormPart<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content: &'a [u8],
}

pub fn text_part<'a>(name: &'a str, value: &'a str) -> FormPart<'a> {
    FormPart {
        name,
        filename: None,
        content: value.as_bytes(),
    }
}

pub fn file_part<'a>(name: &'a str, filename: &'a str, content: &'a [u8]) -> FormPart<'a> {
    FormPart {
        name,
        filename: Some(filename),
        content,
    }
}

/// Content type header value and body of a `multipart/form-data` request.
pub fn multipart_body(parts: &[FormPart<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        part.name
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
