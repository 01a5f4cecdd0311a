//! End-to-end runs over fixture data directories.

use std::fs;
use std::io::Write;
use std::path::Path;

use consolidator::error::PipelineStage;
use consolidator::{run, CanonicalField, Config, FileStatus};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

// =============================================================================
// FIXTURES
// =============================================================================

fn write_file(dir: &Path, rel: &str, bytes: &[u8]) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn column_name(mut idx: usize) -> String {
    let mut name = String::new();
    loop {
        name.insert(0, (b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    name
}

fn sheet_xml(rows: &[&[&str]]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                column_name(c),
                r + 1,
                xml_escape(value)
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Minimal xlsx package with inline-string cells.
fn write_xlsx(dir: &Path, rel: &str, sheets: &[(&str, &[&[&str]])]) {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut workbook_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            n
        ));
        workbook.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            xml_escape(name),
            n,
            n
        ));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, n
        ));
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets></workbook>");
    workbook_rels.push_str("</Relationships>");

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut add = |name: &str, body: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        };
        add("[Content_Types].xml", &content_types);
        add("_rels/.rels", root_rels);
        add("xl/workbook.xml", &workbook);
        add("xl/_rels/workbook.xml.rels", &workbook_rels);
        for (i, (_, rows)) in sheets.iter().enumerate() {
            add(&format!("xl/worksheets/sheet{}.xml", i + 1), &sheet_xml(rows));
        }
        zip.finish().unwrap();
    }
    write_file(dir, rel, &buf);
}

fn config_in(dir: &TempDir) -> Config {
    Config::rooted_at(dir.path())
}

fn write_manifest(config: &mut Config, json: &str) {
    let path = config.data_dir.parent().unwrap().join("agencies.json");
    fs::write(&path, json).unwrap();
    config.manifest = Some(path);
}

fn read_artifact(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn column(field: CanonicalField) -> usize {
    field.index()
}

/// State (clean CSV under a title block), Energy (xlsx without a stage
/// column), Labor (binary garbage) and Agriculture (composite IDs).
fn mixed_fixture(dir: &TempDir) -> Config {
    let mut config = config_in(dir);
    let data = config.data_dir.clone();

    write_file(
        &data,
        "department-of-state/inventory.csv",
        b"FY2025 AI Use Case Inventory,,,\n\
          ,,,\n\
          Use Case ID,Use Case Name,Stage of Development,Vendor(s) Name\n\
          DOS-001,Visa Triage,Deployed,Acme Corp\n\
          DOS-002,Cable Summaries,b) Pilot,#N/A\n",
    );
    write_xlsx(
        &data,
        "department-of-energy/inventory.xlsx",
        &[(
            "Inventory",
            &[
                &["Use Case ID", "Use Case Name", "Bureau"],
                &["DOE-1", "Grid Forecasting", "EERE"],
                &["DOE-2", "Fusion Control", "Science"],
            ],
        )],
    );
    write_file(
        &data,
        "department-of-labor/inventory.csv",
        b"Use Case ID,Use Case Name,Stage\n\x81\x8d\x00\x90\n",
    );
    write_file(
        &data,
        "department-of-agriculture/inventory.csv",
        b"Use Case Name,Stage\nUSDA-001: Soil Sensor AI,Stage 4 - Operation and Maintenance\n",
    );

    write_manifest(
        &mut config,
        r#"{
            "version": "2025",
            "agencies": [
                { "id": "department-of-state", "name": "Department of State" },
                { "id": "department-of-energy", "name": "Department of Energy", "kind": "spreadsheet" },
                { "id": "department-of-labor", "name": "Department of Labor" },
                { "id": "department-of-agriculture", "name": "Department of Agriculture" }
            ]
        }"#,
    );
    config
}

// =============================================================================
// RUNS
// =============================================================================

#[test]
fn test_mixed_sources_continue_past_failures() {
    let dir = TempDir::new().unwrap();
    let config = mixed_fixture(&dir);
    let result = run(config.clone()).unwrap();

    let statuses: Vec<FileStatus> = result.log.entries().iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            FileStatus::Ok,
            FileStatus::Partial,
            FileStatus::Failed,
            FileStatus::Ok
        ]
    );

    let energy = &result.log.entries()[1];
    assert_eq!(energy.source_file, "department-of-energy/inventory.xlsx#Inventory");
    assert_eq!(energy.missing, vec![CanonicalField::StageOfDevelopmentRaw]);
    assert_eq!(energy.rows, 2);

    let labor = &result.log.entries()[2];
    assert_eq!(labor.stage, Some(PipelineStage::Read));
    assert!(labor.detail.as_deref().unwrap().contains("not valid UTF-8"));

    let (headers, rows) = read_artifact(&config.output);
    assert_eq!(headers.len(), CanonicalField::COUNT);
    assert_eq!(headers[column(CanonicalField::StageOfDevelopmentRaw)], "Stage of Development (Raw)");
    assert_eq!(rows.len(), 5);

    let ids: Vec<&str> = rows
        .iter()
        .map(|r| r[column(CanonicalField::UseCaseId)].as_str())
        .collect();
    assert_eq!(ids, vec!["DOS-001", "DOS-002", "DOE-1", "DOE-2", "USDA-001"]);

    let state = &rows[1];
    assert_eq!(state[column(CanonicalField::Agency)], "Department of State");
    assert_eq!(state[column(CanonicalField::StageOfDevelopmentRaw)], "b) Pilot");
    assert_eq!(state[column(CanonicalField::StageOfDevelopmentNormalized)], "In Development");
    assert_eq!(state[column(CanonicalField::VendorName)], "");

    let energy_row = &rows[2];
    assert_eq!(energy_row[column(CanonicalField::StageOfDevelopmentRaw)], "");
    assert_eq!(energy_row[column(CanonicalField::StageOfDevelopmentNormalized)], "Unknown");
    assert_eq!(energy_row[column(CanonicalField::BureauComponent)], "EERE");

    let usda = &rows[4];
    assert_eq!(usda[column(CanonicalField::UseCaseName)], "Soil Sensor AI");
    assert_eq!(usda[column(CanonicalField::StageOfDevelopmentNormalized)], "In Operation");

    let log = fs::read_to_string(&config.log_file).unwrap();
    assert!(log.contains("Sources: 2 ok, 1 partial, 1 failed, 0 skipped"));
    assert!(log.contains("Department of Labor / department-of-labor/inventory.csv: read stage failed"));
    assert!(log.contains("spreadsheet error value '#N/A'"));
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let dir = TempDir::new().unwrap();
    let config = mixed_fixture(&dir);

    run(config.clone()).unwrap();
    let first = fs::read(&config.output).unwrap();
    run(config.clone()).unwrap();
    let second = fs::read(&config.output).unwrap();
    assert_eq!(first, second);

    let log = fs::read_to_string(&config.log_file).unwrap();
    assert_eq!(log.matches("AI INVENTORY CONSOLIDATION LOG").count(), 2);
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut config = mixed_fixture(&dir);
    config.dry_run = true;

    let result = run(config.clone()).unwrap();
    assert_eq!(result.inventory.len(), 5);
    assert!(!config.output.exists());
    assert!(!config.log_file.exists());
}

#[test]
fn test_adapter_sheet_selection() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    let data = config.data_dir.clone();

    write_xlsx(
        &data,
        "department-of-justice/doj-inventory.xlsx",
        &[
            ("Summary", &[&["Total use cases", "1"]]),
            (
                "Reportable AI Use Cases",
                &[
                    &["Use Case ID", "Use Case Name", "Stage of Development"],
                    &["DOJ-2024-0012", "Tip Triage", "Initiated"],
                ],
            ),
        ],
    );
    write_xlsx(
        &data,
        "justice-archive/old.xlsx",
        &[("Summary", &[&["Total use cases", "0"]])],
    );
    write_manifest(
        &mut config,
        r#"{
            "agencies": [
                { "id": "department-of-justice", "name": "Department of Justice" },
                { "id": "justice-archive", "name": "Justice Archive", "adapter": "department-of-justice" }
            ]
        }"#,
    );

    let result = run(config.clone()).unwrap();
    let entries = result.log.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, FileStatus::Ok);
    assert_eq!(
        entries[0].source_file,
        "department-of-justice/doj-inventory.xlsx#Reportable AI Use Cases"
    );
    assert_eq!(entries[1].status, FileStatus::Failed);
    assert!(entries[1]
        .detail
        .as_deref()
        .unwrap()
        .contains("sheet 'Reportable AI Use Cases' not found"));

    let (_, rows) = read_artifact(&config.output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column(CanonicalField::UseCaseId)], "DOJ-2024-0012");
    assert_eq!(rows[0][column(CanonicalField::StageOfDevelopmentNormalized)], "In Development");
}

#[test]
fn test_all_sheets_selector() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    write_xlsx(
        &config.data_dir,
        "department-of-commerce/inventory.xlsx",
        &[
            (
                "NOAA",
                &[&["Use Case Name", "Stage"], &["Storm Tracking", "Deployed"]],
            ),
            (
                "NIST",
                &[&["Use Case Name", "Stage"], &["Metrology Assist", "Retired"]],
            ),
        ],
    );
    write_manifest(
        &mut config,
        r#"{ "agencies": [ { "id": "department-of-commerce", "sheet": "*" } ] }"#,
    );

    let result = run(config.clone()).unwrap();
    let labels: Vec<&str> = result
        .log
        .entries()
        .iter()
        .map(|e| e.source_file.as_str())
        .collect();
    assert_eq!(
        labels,
        vec![
            "department-of-commerce/inventory.xlsx#NOAA",
            "department-of-commerce/inventory.xlsx#NIST"
        ]
    );
    let (_, rows) = read_artifact(&config.output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][column(CanonicalField::Agency)], "Department Of Commerce");
    assert_eq!(rows[1][column(CanonicalField::StageOfDevelopmentNormalized)], "Retired");
}

#[test]
fn test_discovery_without_manifest_writes_header_only_artifact() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    write_file(&config.data_dir, "department-of-the-interior/inventory.pdf", b"%PDF-1.7");
    write_file(&config.data_dir, "2023/old.csv", b"Use Case Name,Stage\nOld,Deployed\n");
    fs::create_dir_all(config.data_dir.join("tennessee-valley-authority")).unwrap();

    let result = run(config.clone()).unwrap();
    let statuses: Vec<(&str, FileStatus)> = result
        .log
        .entries()
        .iter()
        .map(|e| (e.agency.as_str(), e.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("Department Of The Interior", FileStatus::Skipped),
            ("Tennessee Valley Authority", FileStatus::Skipped),
        ]
    );

    let text = fs::read_to_string(&config.output).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("Agency,Use Case ID,"));
}

#[test]
fn test_unreadable_manifest_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.manifest = Some(dir.path().join("missing.json"));
    assert!(run(config.clone()).is_err());
    assert!(!config.output.exists());

    write_manifest(&mut config, "{ not json");
    assert!(run(config).is_err());
}
