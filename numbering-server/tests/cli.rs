//! `numbering` CLI against a temp database

mod common;

use clap::Parser;
use common::*;
use numbering_server::cli::{self, Cli};
use numbering_server::db::repository::document;
use shared::models::DocumentType;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use std::io::Cursor;
use std::process::ExitCode;
use std::str::FromStr;

async fn run_cli(db: &TestDb, args: &[&str], stdin: &str) -> (ExitCode, String) {
    let mut argv = vec!["numbering", "--database", db.path.as_str()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();

    let mut input = Cursor::new(stdin.as_bytes().to_vec());
    let mut out = Vec::new();
    let code = cli::run(cli, test_config(&db.path), &mut input, &mut out)
        .await
        .unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_check_prints_report() {
    let db = open_db().await;
    drop_guard(db.pool()).await;
    let scope = scope(1, Some(7), DocumentType::PurchaseReturn);
    insert_raw(db.pool(), 1, &scope, "PR-202510-0001", 1).await;
    insert_raw(db.pool(), 2, &scope, "PR-202510-0001", 2).await;

    let (code, out) = run_cli(&db, &["check"], "").await;

    assert_eq!(code, ExitCode::SUCCESS);
    assert!(out.contains("uq_document_number_partner"), "{out}");
    assert!(out.contains("MISSING"), "{out}");
    assert!(out.contains("Duplicate groups:    1"), "{out}");
    assert!(out.contains("Duplicate documents: 2"), "{out}");

    // Reporting only: the guard is still missing afterwards
    let statuses = db.state.store.guard_status().await.unwrap();
    assert!(statuses.iter().all(|s| !s.present));
}

#[tokio::test]
async fn test_check_keeps_journal_mode() {
    let db = open_db().await;
    db.state.pool.close().await;

    let rollback = SqliteConnectOptions::from_str(&format!("sqlite:{}", db.path))
        .unwrap()
        .journal_mode(SqliteJournalMode::Delete);
    SqlitePool::connect_with(rollback).await.unwrap().close().await;

    let (code, _) = run_cli(&db, &["check"], "").await;
    assert_eq!(code, ExitCode::SUCCESS);
    let (code, _) = run_cli(&db, &["repair"], "").await;
    assert_eq!(code, ExitCode::SUCCESS);

    let inspect = SqlitePool::connect(&format!("sqlite:{}", db.path)).await.unwrap();
    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&inspect)
        .await
        .unwrap();
    assert_eq!(mode, "delete");
}

#[tokio::test]
async fn test_check_missing_database_still_succeeds() {
    let db = open_db().await;
    let missing = db.dir.path().join("absent.db").to_string_lossy().into_owned();
    let cli = Cli::try_parse_from(["numbering", "--database", missing.as_str(), "check"]).unwrap();
    let mut out = Vec::new();

    let code = cli::run(cli, test_config(&missing), &mut Cursor::new(Vec::new()), &mut out)
        .await
        .unwrap();

    assert_eq!(code, ExitCode::SUCCESS);
    assert!(String::from_utf8(out).unwrap().contains("could not complete"));
}

#[tokio::test]
async fn test_repair_defaults_to_dry_run() {
    let db = open_db().await;
    drop_guard(db.pool()).await;
    let scope = scope(1, Some(7), DocumentType::PurchaseReturn);
    insert_raw(db.pool(), 1, &scope, "PR-202510-0001", 1).await;
    insert_raw(db.pool(), 2, &scope, "PR-202510-0001", 2).await;

    let (code, out) = run_cli(&db, &["repair"], "").await;

    assert_eq!(code, ExitCode::SUCCESS);
    assert!(out.contains("dry run"), "{out}");
    assert!(out.contains("renumber 2"), "{out}");
    let doc = document::find_by_id(db.pool(), 2).await.unwrap().unwrap();
    assert_eq!(doc.document_number, "PR-202510-0001");
}

#[tokio::test]
async fn test_apply_requires_typed_confirmation() {
    let db = open_db().await;
    drop_guard(db.pool()).await;
    let scope = scope(1, Some(7), DocumentType::PurchaseReturn);
    insert_raw(db.pool(), 1, &scope, "PR-202510-0001", 1).await;
    insert_raw(db.pool(), 2, &scope, "PR-202510-0001", 2).await;

    let (code, out) = run_cli(&db, &["repair", "--apply"], "y\n").await;
    assert_eq!(code, ExitCode::FAILURE);
    assert!(out.contains("Aborted"), "{out}");
    let doc = document::find_by_id(db.pool(), 2).await.unwrap().unwrap();
    assert_eq!(doc.document_number, "PR-202510-0001");

    let (code, out) = run_cli(&db, &["repair", "--apply"], "yes\n").await;
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(out.contains("applied"), "{out}");
    let doc = document::find_by_id(db.pool(), 2).await.unwrap().unwrap();
    assert_eq!(doc.document_number, "PR-202510-0002");

    // Apply mode restores the guard
    let statuses = db.state.store.guard_status().await.unwrap();
    assert!(statuses.iter().all(|s| s.present && s.correct));
}

#[tokio::test]
async fn test_apply_delete_with_yes_flag() {
    let db = open_db().await;
    drop_guard(db.pool()).await;
    let scope = scope(3, None, DocumentType::PurchaseOrder);
    insert_raw(db.pool(), 1, &scope, "PO-202510-0001", 1).await;
    insert_raw(db.pool(), 2, &scope, "PO-202510-0001", 2).await;

    let (code, out) = run_cli(
        &db,
        &[
            "--json", "repair", "--store", "3", "--apply", "--yes", "--delete", "--operator", "ops",
        ],
        "",
    )
    .await;

    assert_eq!(code, ExitCode::SUCCESS);
    let summary: shared::models::RepairSummary = serde_json::from_str(&out).unwrap();
    assert_eq!(summary.removed, 1);
    assert!(document::find_by_id(db.pool(), 2).await.unwrap().unwrap().is_removed());
}
