//! Data-format encoders for widget snapshots.
//!
//! These run on blocking workers (the queue wraps them in
//! `spawn_blocking`); they are plain synchronous byte producers.
//!
//! The XLSX encoder writes the SpreadsheetML container directly over the
//! `zip` crate: one worksheet per widget, numbers as native cells, text as
//! inline strings. It covers the tabular snapshots the dashboard exports,
//! nothing more.

use crate::error::{ExportError, Result};
use crate::job::ExportFormat;
use crate::widget::WidgetSnapshot;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Encode snapshots in the given tabular format.
pub fn encode(format: ExportFormat, widgets: &[WidgetSnapshot]) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Json => encode_json(widgets),
        ExportFormat::Csv => encode_csv(widgets),
        ExportFormat::Excel => encode_xlsx(widgets),
        other => Err(ExportError::Encode(format!(
            "{:?} is not a tabular format",
            other
        ))),
    }
}

/// Pretty-printed JSON array of widget snapshots.
pub fn encode_json(widgets: &[WidgetSnapshot]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(widgets)?)
}

/// CSV with one titled section per widget, blank-line separated.
pub fn encode_csv(widgets: &[WidgetSnapshot]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    for (index, widget) in widgets.iter().enumerate() {
        if index > 0 {
            writer
                .write_record(&[""])
                .map_err(|e| ExportError::Encode(e.to_string()))?;
        }
        writer
            .write_record(&[widget.title.as_str()])
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        writer
            .write_record(&widget.columns)
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        for row in &widget.rows {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            writer
                .write_record(&cells)
                .map_err(|e| ExportError::Encode(e.to_string()))?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Encode(e.to_string()))
}

/// Minimal XLSX container: one worksheet per widget.
pub fn encode_xlsx(widgets: &[WidgetSnapshot]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let sheet_names = sheet_names(widgets);

    // [Content_Types].xml
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    for index in 1..=widgets.len().max(1) {
        content_types.push_str(&format!(
            "\n<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            index
        ));
    }
    content_types.push_str("\n</Types>");
    write_entry(&mut zip, "[Content_Types].xml", &content_types, options)?;

    // Package relationships
    write_entry(
        &mut zip,
        "_rels/.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
        options,
    )?;

    // Workbook with one sheet entry per widget
    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>"#,
    );
    let mut workbook_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (index, name) in sheet_names.iter().enumerate() {
        let n = index + 1;
        workbook.push_str(&format!(
            "\n<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            xml_escape(name),
            n,
            n
        ));
        workbook_rels.push_str(&format!(
            "\n<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            n, n
        ));
    }
    workbook.push_str("\n</sheets>\n</workbook>");
    workbook_rels.push_str("\n</Relationships>");
    write_entry(&mut zip, "xl/workbook.xml", &workbook, options)?;
    write_entry(&mut zip, "xl/_rels/workbook.xml.rels", &workbook_rels, options)?;

    // Worksheets
    if widgets.is_empty() {
        write_entry(&mut zip, "xl/worksheets/sheet1.xml", &worksheet_xml(&[], &[]), options)?;
    }
    for (index, widget) in widgets.iter().enumerate() {
        let xml = worksheet_xml(&widget.columns, &widget.rows);
        write_entry(
            &mut zip,
            &format!("xl/worksheets/sheet{}.xml", index + 1),
            &xml,
            options,
        )?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn write_entry(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    content: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

fn worksheet_xml(columns: &[String], rows: &[Vec<serde_json::Value>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>"#,
    );

    if !columns.is_empty() {
        xml.push_str("\n<row>");
        for column in columns {
            xml.push_str(&inline_str_cell(column));
        }
        xml.push_str("</row>");
    }

    for row in rows {
        xml.push_str("\n<row>");
        for cell in row {
            xml.push_str(&value_cell(cell));
        }
        xml.push_str("</row>");
    }

    xml.push_str("\n</sheetData>\n</worksheet>");
    xml
}

fn value_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Number(n) => format!("<c><v>{}</v></c>", n),
        serde_json::Value::Bool(b) => {
            format!("<c t=\"b\"><v>{}</v></c>", if *b { 1 } else { 0 })
        }
        serde_json::Value::Null => "<c/>".to_string(),
        serde_json::Value::String(s) => inline_str_cell(s),
        other => inline_str_cell(&other.to_string()),
    }
}

fn inline_str_cell(text: &str) -> String {
    format!("<c t=\"inlineStr\"><is><t>{}</t></is></c>", xml_escape(text))
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Worksheet names: invalid characters stripped, 31-char limit, uniqued.
fn sheet_names(widgets: &[WidgetSnapshot]) -> Vec<String> {
    let mut names = Vec::with_capacity(widgets.len());
    for (index, widget) in widgets.iter().enumerate() {
        let mut name: String = widget
            .title
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
            .take(28)
            .collect();
        if name.trim().is_empty() {
            name = format!("Sheet{}", index + 1);
        }
        if names.contains(&name) {
            name = format!("{} {}", name, index + 1);
        }
        names.push(name);
    }
    if names.is_empty() {
        names.push("Sheet1".to_string());
    }
    names
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
