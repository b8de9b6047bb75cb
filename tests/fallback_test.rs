use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let log = common::callback_log(&["checkout, o-1, p-1, buyer-1, , ,"]);

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path())
        .arg("--catalog")
        .arg(common::CATALOG)
        .arg("--db-path")
        .arg("some_db");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."))
        .stdout(predicate::str::contains("o-1,p-1,buyer-1,5,PI,pending,,,"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let log = common::callback_log(&["checkout, o-1, p-1, buyer-1, , ,"]);

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path())
        .arg("--catalog")
        .arg(common::CATALOG)
        .arg("--db-path")
        .arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING").not());
}
