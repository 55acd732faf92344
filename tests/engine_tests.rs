mod common;

use chrono::NaiveDate;
use common::{docx, entry_names, paragraph, read_entry, read_entry_bytes};
use docx_template_server::engine::{
    build_archive, extract_fields, validate_rows, BatchGenerator, Bindings, DocumentMerger,
    EngineError,
};

fn merger() -> DocumentMerger {
    DocumentMerger::with_date(NaiveDate::from_ymd_opt(2025, 10, 14).unwrap())
}

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_extract_then_merge_round_trip() {
    let template = docx(
        &[
            paragraph(&["Dear {{Name}},"]),
            paragraph(&["your order {{Order}} ships on {{today}}."]),
        ],
        Some(&[paragraph(&["{{Company}}"])]),
        Some(&[paragraph(&["Page for {{name}}"])]),
    );

    let found = extract_fields(&template).unwrap();
    assert_eq!(found, vec!["Name", "Order", "Company"]);

    let bindings: Bindings = [("name", "Alice"), ("COMPANY", "Acme")].into_iter().collect();
    let output = merger().merge(&template, &bindings).unwrap();

    let body = read_entry(&output, "word/document.xml");
    assert!(body.contains("Dear Alice,"));
    assert!(body.contains("your order {{Order}} ships on 14. října 2025."));
    assert!(read_entry(&output, "word/header1.xml").contains(">Acme<"));
    assert!(read_entry(&output, "word/footer1.xml").contains("Page for Alice"));

    // Unbound placeholders survive, so a second extraction finds only them.
    assert_eq!(extract_fields(&output).unwrap(), vec!["Order"]);
}

#[test]
fn test_untouched_entries_are_preserved() {
    let template = docx(&[paragraph(&["{{A}}"])], None, None);
    let output = merger()
        .merge(&template, &[("a", "1")].into_iter().collect())
        .unwrap();

    assert_eq!(entry_names(&output).len(), entry_names(&template).len());
    assert_eq!(
        read_entry_bytes(&output, "word/media/logo.bin"),
        read_entry_bytes(&template, "word/media/logo.bin")
    );
}

#[test]
fn test_placeholder_split_over_three_runs() {
    let template = docx(&[paragraph(&["Total: {{", "Čás", "tka}} CZK"])], None, None);

    assert_eq!(extract_fields(&template).unwrap(), vec!["Částka"]);

    let output = merger()
        .merge(&template, &[("částka", "1 200")].into_iter().collect())
        .unwrap();
    let body = read_entry(&output, "word/document.xml");
    assert!(body.contains("Total: 1 200"));
    assert!(!body.contains("{{"));
    assert!(body.contains(" CZK"));
}

#[test]
fn test_case_folding_without_diacritic_folding() {
    let template = docx(&[paragraph(&["Hello {{jméno}}"])], None, None);

    let bound = merger()
        .merge(&template, &[("Jméno", "Jan")].into_iter().collect())
        .unwrap();
    assert!(read_entry(&bound, "word/document.xml").contains("Hello Jan"));

    let unbound = merger()
        .merge(&template, &[("jmeno", "Jan")].into_iter().collect())
        .unwrap();
    assert!(read_entry(&unbound, "word/document.xml").contains("Hello {{jméno}}"));
}

#[test]
fn test_values_are_xml_escaped() {
    let template = docx(&[paragraph(&["{{Company}}"])], None, None);
    let output = merger()
        .merge(
            &template,
            &[("company", r#"Smith & Sons <"Ltd">"#)].into_iter().collect(),
        )
        .unwrap();

    let body = read_entry(&output, "word/document.xml");
    assert!(body.contains("Smith &amp; Sons &lt;&quot;Ltd&quot;&gt;"));
}

#[test]
fn test_today_is_never_extracted_and_always_merged() {
    let template = docx(&[paragraph(&["{{TODAY}} / {{ Today }}"])], None, None);

    assert!(extract_fields(&template).unwrap().is_empty());

    let bindings: Bindings = [("today", "yesterday")].into_iter().collect();
    let output = merger().merge(&template, &bindings).unwrap();
    assert!(read_entry(&output, "word/document.xml")
        .contains("14. října 2025 / 14. října 2025"));
}

#[test]
fn test_garbage_bytes_are_a_malformed_package() {
    assert!(matches!(
        extract_fields(b"definitely not a zip"),
        Err(EngineError::MalformedPackage(_))
    ));
    assert!(matches!(
        merger().merge(b"", &Bindings::new()),
        Err(EngineError::MalformedPackage(_))
    ));
}

#[test]
fn test_missing_columns_exclude_today() {
    let result = validate_rows("NAZEV;Jméno\nf;Jan\n", &fields(&["Jméno", "Částka", "today"]));

    assert!(!result.is_valid());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("Částka"));
    assert!(!result.errors[0].contains("today"));
}

#[test]
fn test_bulk_pipeline_numbers_duplicates_and_archives() {
    let template = docx(&[paragraph(&["Invoice for {{Jméno}}: {{Částka}}"])], None, None);
    let template_fields = extract_fields(&template).unwrap();
    let raw = "NAZEV;JMÉNO;částka;poznámka\nfaktura;Jan;100;x\nfaktura;Eva;200;y\nfaktura;Petr;300;z\n";

    let (parsed, warnings) = validate_rows(raw, &template_fields).into_result().unwrap();
    assert!(warnings.iter().any(|w| w.contains("poznámka")));
    assert!(warnings.iter().any(|w| w.starts_with("Duplicate filenames")));

    let output = BatchGenerator::with_renderer(merger())
        .generate(&template, &template_fields, parsed.rows)
        .unwrap();
    assert_eq!(output.report.total_rows, 3);
    assert_eq!(output.report.successful_documents, 3);
    assert!(!output.report.has_failures());

    let archive = build_archive(&output.documents).unwrap();
    assert_eq!(
        common::ordered_entry_names(&archive),
        vec!["faktura.docx", "faktura_1.docx", "faktura_2.docx"]
    );

    let second = read_entry_bytes(&archive, "faktura_1.docx");
    assert!(read_entry(&second, "word/document.xml").contains("Invoice for Eva: 200"));
}

#[test]
fn test_names_differing_only_by_extension_share_one_archive() {
    let template = docx(&[paragraph(&["{{Name}}"])], None, None);
    let template_fields = extract_fields(&template).unwrap();

    let (parsed, warnings) = validate_rows("file;Name\nx;a\nx.docx;b\n", &template_fields)
        .into_result()
        .unwrap();
    assert!(warnings.iter().any(|w| w.starts_with("Duplicate filenames")));

    let output = BatchGenerator::with_renderer(merger())
        .generate(&template, &template_fields, parsed.rows)
        .unwrap();
    let archive = build_archive(&output.documents).unwrap();

    assert_eq!(
        common::ordered_entry_names(&archive),
        vec!["x.docx", "x_1.docx"]
    );
}
