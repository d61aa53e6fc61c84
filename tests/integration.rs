//! Integration tests for the fleet ETL pipeline.
//!
//! This suite runs real files through the shipped `config/` directory:
//! - Equipment allocation billing (correction and partitioned export)
//! - Weekly timecards (SUN..SAT) from CSV and XLSX
//! - Daily hours ledgers, including Windows-1252 input
//! - Job-cost billing ledgers with currency amounts
//! - Batches with unreadable files, skipped rows and residual violations

use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::TempDir;

use chrono::Weekday;
use fleet_etl::config::ConfigLoader;
use fleet_etl::export::{ExportFormat, Exporter};
use fleet_etl::ingest::StaticSource;
use fleet_etl::models::{IssueKind, Period, Severity};
use fleet_etl::pipeline::Pipeline;

// =============================================================================
// Test Helpers
// =============================================================================

fn loader() -> ConfigLoader {
    ConfigLoader::load("./config").expect("Failed to load config")
}

fn pipeline(source: &str) -> Pipeline {
    Pipeline::from_loader(&loader(), source).expect("Unknown source")
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn write_file(dir: &Path, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

const ALLOCATION_CSV: &str = "\
Equipment Billing Report
March 2024

Equip #,Job,Units,Rate,Division
EX-1,JOBA,0.7,100,DFW
EX-1,JOBB,0.6,100,DFW
EX-2,JOBA,0.4,50,HOU
";

const TIMECARD_CSV: &str = "\
Weekly Timecards
Week ending 03/09/2024

Emp ID,Employee Name,Division,SUN,MON,TUE,WED,THU,FRI,SAT,Total
E100,Ann Smith,DFW,,8:00,7.5,8:30,8,7.25h,,39.25
E200,Raj Patel,HOU,4,8,,,,,,12
";

// =============================================================================
// SECTION 1: Equipment Allocation
// =============================================================================

#[test]
fn test_allocation_csv_is_corrected() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "billing.csv", ALLOCATION_CSV);

    let outcome = pipeline("equipment_billing").process_files(&[&path]);
    let result = outcome.data.allocations().unwrap();

    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.rows[0].units, decimal("0.5385"));
    assert_eq!(result.rows[0].amount, decimal("53.85"));
    assert_eq!(result.rows[1].units, decimal("0.4615"));
    assert_eq!(result.rows[1].amount, decimal("46.15"));
    assert_eq!(result.rows[2].units, decimal("0.4"));
    assert_eq!(result.rows[2].amount, decimal("20"));
    assert_eq!(result.rows[0].location.line, 5);

    assert_eq!(result.adjustments.len(), 1);
    assert_eq!(result.adjustments[0].equipment_id, "EX-1");
    assert_eq!(result.adjustments[0].old_total, decimal("1.3"));
    assert!(result.residual_violations.is_empty());

    assert_eq!(outcome.report.files_processed, 1);
    assert_eq!(outcome.report.rows_processed, 3);
    assert!(outcome.report.is_clean());
}

#[test]
fn test_allocation_export_is_partitioned_by_division() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "billing.csv", ALLOCATION_CSV);
    let out = dir.path().join("out");

    let pipeline = pipeline("equipment_billing");
    let mut outcome = pipeline.process_files(&[&input]);
    let summary = outcome
        .export(&Exporter::new(pipeline.source(), &out), ExportFormat::Csv)
        .unwrap();

    assert_eq!(summary.files.len(), 2);
    let dfw = read_lines(&out.join("equipment_billing_DFW.csv"));
    assert_eq!(dfw[0], "Equipment,Job,Units,Rate,Amount");
    assert_eq!(dfw[1], "EX-1,JOBA,0.5385,100,53.85");
    assert_eq!(dfw[2], "EX-1,JOBB,0.4615,100,46.15");

    let hou = read_lines(&out.join("equipment_billing_HOU.csv"));
    assert_eq!(hou, vec!["Equipment,Job,Units,Rate,Amount", "EX-2,JOBA,0.4,50,20"]);
}

#[test]
fn test_coarse_rounding_reports_residual_violation() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "billing.csv",
        "Equip #,Job,Units,Rate\nEX-9,JOBA,0.9,10\nEX-9,JOBB,0.9,10\n",
    );

    let loader = loader();
    let mut config = loader.pipeline().clone();
    config.correction.unit_precision = 0;
    let source = loader.get_source("equipment_billing").unwrap().clone();
    let outcome = Pipeline::new(config, source).process_files(&[&path]);

    assert_eq!(outcome.report.residual_violations, 1);
    assert_eq!(outcome.report.count(IssueKind::ResidualAllocationViolation), 1);
    let issue = outcome
        .report
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::ResidualAllocationViolation)
        .unwrap();
    assert_eq!(issue.severity, Severity::High);
    assert_eq!(issue.origin, "EX-9");
    assert!(!outcome.report.is_clean());
}

#[test]
fn test_injected_feed_matches_file_result() {
    let feed = StaticSource::from_values(
        "telematics",
        vec![
            serde_json::json!({"Equip": "EX-1", "Job": "JOBA", "Units": "0.7", "Rate": "100"}),
            serde_json::json!({"Equip": "EX-1", "Job": "JOBB", "Units": "0.6", "Rate": "100"}),
        ],
    );
    let outcome = pipeline("equipment_billing").process_source(&feed);
    let result = outcome.data.allocations().unwrap();

    assert_eq!(result.rows[0].units, decimal("0.5385"));
    assert_eq!(result.rows[1].units, decimal("0.4615"));
    assert_eq!(result.rows[0].location.origin, "telematics");
}

// =============================================================================
// SECTION 2: Weekly Timecards
// =============================================================================

#[test]
fn test_timecard_week_total_is_sum_of_days() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "week10.csv", TIMECARD_CSV);

    let outcome = pipeline("timecard").process_files(&[&path]);
    let records = outcome.data.records().unwrap();

    assert_eq!(records.len(), 2);
    let ann = &records[0];
    assert_eq!(ann.entity_id(), "E100");
    assert_eq!(ann.entries().len(), 7);
    assert_eq!(ann.value_on(Weekday::Sun), Decimal::ZERO);
    assert_eq!(ann.value_on(Weekday::Wed), decimal("8.5"));
    assert_eq!(ann.total(), decimal("39.25"));
    assert_eq!(ann.attribute("division"), Some("DFW"));
    assert_eq!(records[1].total(), decimal("12"));

    // Preferred sheet "Timecards" is absent from a CSV; the single sheet is used.
    assert_eq!(outcome.report.sheets_processed, 1);
    assert_eq!(outcome.report.count(IssueKind::HeaderNotFound), 0);
}

#[test]
fn test_timecard_export_reports_empty_division() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "week10.csv", TIMECARD_CSV);
    let out = dir.path().join("out");

    let pipeline = pipeline("timecard");
    let mut outcome = pipeline.process_files(&[&input]);
    let summary = outcome
        .export(&Exporter::new(pipeline.source(), &out), ExportFormat::Both)
        .unwrap();

    assert!(out.join("weekly_hours_DFW.csv").exists());
    assert!(out.join("weekly_hours_HOU.csv").exists());
    assert!(!out.join("weekly_hours_WTX.csv").exists());
    assert!(out.join("weekly_hours.xlsx").exists());
    assert_eq!(summary.files.len(), 3);

    let dfw = read_lines(&out.join("weekly_hours_DFW.csv"));
    assert_eq!(
        dfw[0],
        "Employee ID,Employee Name,Division,Sun,Mon,Tue,Wed,Thu,Fri,Sat,Weekly Total"
    );
    assert_eq!(dfw[1], "E100,Ann Smith,DFW,0,8,7.5,8.5,8,7.25,0,39.25");

    assert_eq!(outcome.report.count(IssueKind::EmptyPartition), 1);
    let empty = outcome
        .report
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::EmptyPartition)
        .unwrap();
    assert!(empty.message.contains("WTX"));
}

#[test]
fn test_timecard_xlsx_uses_preferred_sheet() {
    use rust_xlsxwriter::{Format, Workbook};

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("week10.xlsx");

    let mut workbook = Workbook::new();
    let notes = workbook.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "Prepared by dispatch").unwrap();

    let clock = Format::new().set_num_format("h:mm");
    let sheet = workbook.add_worksheet();
    sheet.set_name("Timecards").unwrap();
    sheet.write_string(0, 0, "Weekly Timecards").unwrap();
    let headers = ["Emp ID", "Employee Name", "Division", "SUN", "MON", "TUE"];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(2, col as u16, *header).unwrap();
    }
    sheet.write_string(3, 0, "E300").unwrap();
    sheet.write_string(3, 1, "Lee Wong").unwrap();
    sheet.write_string(3, 2, "WTX").unwrap();
    sheet.write_number(3, 3, 8.0).unwrap();
    sheet.write_number_with_format(3, 4, 0.34375, &clock).unwrap();
    sheet.write_string(3, 5, "7:45").unwrap();
    workbook.save(&path).unwrap();

    let outcome = pipeline("timecard").process_files(&[&path]);
    let records = outcome.data.records().unwrap();

    assert_eq!(outcome.report.sheets_processed, 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value_on(Weekday::Mon), decimal("8.25"));
    assert_eq!(records[0].total(), decimal("24"));
    assert_eq!(records[0].location().sheet, "Timecards");
    assert_eq!(records[0].location().line, 4);
}

#[test]
fn test_timecard_xlsx_with_date_typed_headers() {
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("week09.xlsx");

    let date_format = Format::new().set_num_format("mm/dd/yyyy");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Timecards").unwrap();
    sheet.write_string(0, 0, "Emp ID").unwrap();
    sheet.write_string(0, 1, "Employee Name").unwrap();
    for (col, day) in [(2u16, 3u8), (3, 4), (4, 5)] {
        let date = ExcelDateTime::from_ymd(2024, 3, day).unwrap();
        sheet.write_datetime_with_format(0, col, &date, &date_format).unwrap();
    }
    sheet.write_string(1, 0, "E100").unwrap();
    sheet.write_string(1, 1, "Smith").unwrap();
    sheet.write_number(1, 2, 8.0).unwrap();
    sheet.write_string(1, 3, "7:30").unwrap();
    sheet.write_number(1, 4, 6.0).unwrap();
    workbook.save(&path).unwrap();

    let outcome = pipeline("timecard").process_files(&[&path]);
    let records = outcome.data.records().unwrap();

    assert_eq!(records.len(), 1);
    let entries = records[0].entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(
        entries[0].period,
        Period::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 3).unwrap())
    );
    assert_eq!(entries[1].value, decimal("7.5"));
    assert_eq!(records[0].total(), decimal("21.5"));
}

#[test]
fn test_timecard_xlsx_falls_back_to_first_sheet() {
    use rust_xlsxwriter::Workbook;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("week11.xlsx");

    let mut workbook = Workbook::new();
    let week = workbook.add_worksheet();
    week.set_name("Week 11").unwrap();
    for (col, header) in ["Emp ID", "SUN", "MON"].iter().enumerate() {
        week.write_string(0, col as u16, *header).unwrap();
    }
    week.write_string(1, 0, "E100").unwrap();
    week.write_number(1, 1, 6.0).unwrap();
    week.write_number(1, 2, 8.0).unwrap();
    let archive = workbook.add_worksheet();
    archive.set_name("Archive").unwrap();
    archive.write_string(0, 0, "old data").unwrap();
    workbook.save(&path).unwrap();

    let pipeline = pipeline("timecard");
    let outcome = pipeline.process_files(&[&path]);
    let records = outcome.data.records().unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].location().sheet, "Week 11");
    assert_eq!(records[0].total(), decimal("14"));

    let inspections = pipeline.inspect_file(&path).unwrap();
    assert_eq!(inspections.len(), 2);
    assert!(inspections[0].selected);
    assert!(!inspections[1].selected);
}

// =============================================================================
// SECTION 3: Ledgers
// =============================================================================

#[test]
fn test_daily_hours_windows_1252_ledger() {
    let dir = TempDir::new().unwrap();
    let mut content = b"Driver ID,Driver Name,Date,Hours,Division\n".to_vec();
    content.extend_from_slice(b"D-12,Jos\xe9 Garc\xeda,03/04/2024,8:30,DFW\n");
    content.extend_from_slice(b"D-12,Jos\xe9 Garc\xeda,2024-03-05,7.25h,DFW\n");
    content.extend_from_slice(b"D-14,Ken Ito,3/4/24,10,HOU\n");
    let input = write_file(dir.path(), "daily.csv", content);

    let pipeline = pipeline("daily_hours");
    let mut outcome = pipeline.process_files(&[&input]);
    let records = outcome.data.records().unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].attribute("employee_name"), Some("José García"));
    assert_eq!(
        records[0].entries()[0].period,
        Period::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
    );

    let totals = outcome.entity_totals();
    assert_eq!(totals.len(), 2);
    assert_eq!(totals[0].entity_id, "D-12");
    assert_eq!(totals[0].total, decimal("15.75"));
    assert_eq!(totals[0].periods.len(), 2);

    let out = dir.path().join("out");
    outcome
        .export(&Exporter::new(pipeline.source(), &out), ExportFormat::Csv)
        .unwrap();
    let lines = read_lines(&out.join("daily_hours.csv"));
    assert_eq!(lines[0], "Driver ID,Driver Name,Date,Job,Cost Code,Hours");
    assert_eq!(lines[1], "D-12,José García,2024-03-04,,,8.5");
}

#[test]
fn test_billing_ledger_amounts_and_unassigned_partition() {
    let dir = TempDir::new().unwrap();
    let input = write_file(
        dir.path(),
        "jobcost.csv",
        "Asset,Job,Cost Code,Date,Amount,Region\n\
         EX-1,2019-044,0100,2024-03-04,\"$1,234.50\",DFW\n\
         EX-2,2019-044,0200,2024-03-04,(12.00),\n",
    );
    let out = dir.path().join("out");

    let pipeline = pipeline("billing");
    let mut outcome = pipeline.process_files(&[&input]);
    let records = outcome.data.records().unwrap();

    assert_eq!(records[0].total(), decimal("1234.50"));
    assert_eq!(records[0].cost_code(), Some("0100"));
    assert_eq!(records[1].total(), decimal("-12.00"));

    let summary = outcome
        .export(&Exporter::new(pipeline.source(), &out), ExportFormat::Both)
        .unwrap();
    assert!(out.join("billing_DFW.csv").exists());
    assert!(out.join("billing_UNASSIGNED.csv").exists());
    assert!(out.join("billing.xlsx").exists());

    let names: Vec<&str> = summary.partitions.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["DFW", "UNASSIGNED"]);
    assert_eq!(summary.partitions[1].total, decimal("-12"));
}

// =============================================================================
// SECTION 4: Batch Robustness
// =============================================================================

#[test]
fn test_unreadable_files_do_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let broken = write_file(dir.path(), "broken.xlsx", "this is not a zip archive");
    let unsupported = write_file(dir.path(), "notes.pdf", "%PDF-1.4");
    let good = write_file(dir.path(), "billing.csv", ALLOCATION_CSV);

    let outcome = pipeline("equipment_billing").process_files(&[&broken, &unsupported, &good]);

    assert_eq!(outcome.report.files_processed, 1);
    assert_eq!(outcome.report.files_skipped, 2);
    assert_eq!(outcome.report.count(IssueKind::FileUnreadable), 2);
    assert_eq!(outcome.data.len(), 3);
    assert!(!outcome.report.is_clean());
}

#[test]
fn test_rows_without_entity_are_counted() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "week.csv",
        "Emp ID,SUN,MON\nE100,8,8\n,,\n,4,4\n\nE200,1,\n",
    );

    let outcome = pipeline("timecard").process_files(&[&path]);

    assert_eq!(outcome.report.rows_processed, 2);
    assert_eq!(outcome.report.rows_skipped, 1);
    let skipped = outcome
        .report
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::RowSkipped)
        .unwrap();
    assert!(skipped.message.contains("lines 4"));
    assert_eq!(outcome.data.records().unwrap()[1].location().line, 6);
}

#[test]
fn test_headerless_sheet_is_flagged() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "odd.csv", "alpha,beta\ngamma,delta\n");

    let outcome = pipeline("timecard").process_files(&[&path]);

    assert_eq!(outcome.report.count(IssueKind::HeaderNotFound), 1);
    let entity_issue = outcome
        .report
        .issues
        .iter()
        .find(|i| i.kind == IssueKind::FieldUnmapped && i.message.contains("employee_id"))
        .unwrap();
    assert_eq!(entity_issue.severity, Severity::High);
    assert_eq!(outcome.report.rows_skipped, 1);
    assert!(outcome.data.is_empty());
}

#[test]
fn test_report_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "billing.csv", ALLOCATION_CSV);
    let outcome = pipeline("equipment_billing").process_files(&[&path]);

    let json = serde_json::to_value(&outcome.report).unwrap();
    assert_eq!(json["source"], "equipment_billing");
    assert_eq!(json["engine_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["rows_processed"], 3);
    assert!(json["run_id"].is_string());
    assert!(json["issues"].is_array());
}
