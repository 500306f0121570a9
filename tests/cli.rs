mod common;

use common::TestWorkspace;
use predicates::prelude::*;
use predicates::str::contains;

const BUDGET_CSV: &str = "\
Name,Amount,Paid On,,Ignored
Bob,\"$1,200\",03/05/2024,,x
,,,,
O'Brien,7,2024-12-31,,y
";

fn dry_run_args(sheet: &str) -> Vec<String> {
    [
        "--schema", "raw", "--table", "budget", "--sheet", sheet, "--dry-run", "--verbose",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn dry_run_prints_create_and_insert() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .assert()
        .success()
        .stdout(contains(
            "CREATE OR REPLACE TABLE raw.budget (\n    source string,\n    imported_at timestamp_tz,\n    data variant\n);",
        ))
        .stdout(contains(
            "INSERT INTO raw.budget\nSELECT column1, column2, parse_json(column3)\nFROM VALUES\n",
        ))
        .stdout(contains(
            r#"('budget', current_timestamp, '{"name":"Bob","amount":"$1,200","paid_on":"03/05/2024"}')"#,
        ))
        .stdout(contains(r#""name":"O''Brien""#))
        .stdout(contains("Ignored").not());
}

#[test]
fn coercions_are_applied_to_json_rows() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .args(["--coercions", r#"{"amount": "int", "paid_on": "date"}"#])
        .assert()
        .success()
        .stdout(contains(r#"{"name":"Bob","amount":1200,"paid_on":"2024-03-05"}"#))
        .stdout(contains(r#"{"name":"O''Brien","amount":7,"paid_on":"2024-12-31"}"#));
}

#[test]
fn day_first_changes_ambiguous_dates() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .args(["--coercions", r#"{"paid_on": "date"}"#, "--day-first"])
        .assert()
        .success()
        .stdout(contains(r#""paid_on":"2024-05-03""#));
}

#[test]
fn batch_size_splits_inserts() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    let output = ws
        .command()
        .args(dry_run_args("budget.csv"))
        .args(["--batch-size", "1"])
        .output()
        .expect("run sheetload");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(stdout.matches("INSERT INTO raw.budget").count(), 2);
}

#[test]
fn header_only_sheet_creates_table_without_insert() {
    let ws = TestWorkspace::new();
    ws.write("empty.csv", "Name,Amount\n,\n");

    ws.command()
        .args(dry_run_args("empty.csv"))
        .assert()
        .success()
        .stdout(contains("CREATE OR REPLACE TABLE raw.budget"))
        .stdout(contains("INSERT").not());
}

#[test]
fn quiet_dry_run_prints_nothing() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args([
            "--schema", "raw", "--table", "budget", "--sheet", "budget.csv", "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn missing_db_config_fails() {
    let ws = TestWorkspace::bare();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .assert()
        .failure()
        .stderr(contains("error:"))
        .stderr(contains("Failed to read database config"));
}

#[test]
fn explicit_db_config_path_is_used() {
    let ws = TestWorkspace::bare();
    ws.write("budget.csv", BUDGET_CSV);
    ws.write("warehouse.json", r#"{"account": "acme"}"#);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .args(["--db-config", "warehouse.json"])
        .assert()
        .success();
}

#[test]
fn unparseable_coerced_value_fails() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .args(["--coercions", r#"{"name": "float"}"#])
        .assert()
        .failure()
        .stderr(contains("column 'name'"));
}

#[test]
fn unknown_coercion_target_warns_and_passes_value_through() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .env_remove("RUST_LOG")
        .args(dry_run_args("budget.csv"))
        .args(["--coercions", r#"{"name": "bool"}"#])
        .assert()
        .success()
        .stderr(contains(r#"Unknown coercion target "bool""#))
        .stdout(contains(r#""name":"Bob""#));
}

#[test]
fn spelled_out_dates_with_short_years_load_in_this_century() {
    let ws = TestWorkspace::new();
    ws.write("paid.csv", "Name,Paid\nBob,05-Mar-24\nAnn,5th March 2024\n");

    ws.command()
        .args(dry_run_args("paid.csv"))
        .args(["--coercions", r#"{"paid": "date"}"#])
        .assert()
        .success()
        .stdout(contains(r#"{"name":"Bob","paid":"2024-03-05"}"#))
        .stdout(contains(r#"{"name":"Ann","paid":"2024-03-05"}"#))
        .stdout(contains("0024").not());
}

#[test]
fn malformed_coercions_fail() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .args(["--coercions", "[1, 2]"])
        .assert()
        .failure()
        .stderr(contains("Invalid coercions"));
}

#[test]
fn unknown_worksheet_title_fails() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .args(["--worksheet", "Summary"])
        .assert()
        .failure()
        .stderr(contains("Invalid worksheet selector"));
}

#[test]
fn zero_batch_size_is_rejected() {
    let ws = TestWorkspace::new();
    ws.write("budget.csv", BUDGET_CSV);

    ws.command()
        .args(dry_run_args("budget.csv"))
        .args(["--batch-size", "0"])
        .assert()
        .failure()
        .stderr(contains("at least 1"));
}
