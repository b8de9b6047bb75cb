use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_completion_after_cancel_rejected() {
    let log = common::callback_log(&[
        "checkout, o-1, p-1, buyer-1, , ,",
        "cancel, o-1, , , pay-1, ,",
        "complete, o-1, , , pay-1, T1,",
    ]);

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path()).arg("--catalog").arg(common::CATALOG);

    // The late completion must not resurrect the cancelled order.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("o-1,p-1,buyer-1,5,PI,cancelled,,,"));
}

#[test]
fn test_completion_after_cancel_last_write_wins() {
    let log = common::callback_log(&[
        "checkout, o-1, p-1, buyer-1, , ,",
        "cancel, o-1, , , pay-1, ,",
        "complete, o-1, , , pay-1, T1,",
    ]);

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path())
        .arg("--catalog")
        .arg(common::CATALOG)
        .arg("--policy")
        .arg("last-write-wins");

    // Known gap of the unguarded flow: the order flips to completed.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("o-1,p-1,buyer-1,5,PI,completed,,T1,"));
}

#[test]
fn test_error_callback_marks_failed() {
    let log = common::callback_log(&[
        "checkout, o-1, p-2, buyer-1, , ,",
        "approve, o-1, , , pay-1, ,",
        "error, o-1, , , pay-1, , insufficient balance",
    ]);

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path()).arg("--catalog").arg(common::CATALOG);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("o-1,p-2,buyer-1,2.5,PI,failed,pay-1,,"));
}

#[test]
fn test_inactive_product_checkout_refused() {
    let log = common::callback_log(&["checkout, o-1, p-3, buyer-1, , ,"]);

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path()).arg("--catalog").arg(common::CATALOG);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error starting checkout"))
        .stdout(predicate::str::contains("o-1").not());
}

#[test]
fn test_callback_for_unknown_order_ignored() {
    let log = common::callback_log(&[
        "checkout, o-1, p-1, buyer-1, , ,",
        "complete, o-999, , , pay-9, T9,",
    ]);

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path()).arg("--catalog").arg(common::CATALOG);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Order not found: o-999"))
        .stdout(predicate::str::contains("o-1,p-1,buyer-1,5,PI,pending,,,"))
        .stdout(predicate::str::contains("o-999").not());
}

#[test]
fn test_oversized_download_window_does_not_abort_replay() {
    let mut catalog = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut catalog,
        br#"[{"id": "p-1", "user_id": "seller-1", "title": "Archive", "price": "5", "currency": "PI",
             "download_expiry_hours": 4294967295}]"#,
    )
    .unwrap();
    let log = common::callback_log(&[
        "checkout, o-1, p-1, buyer-1, , ,",
        "complete, o-1, , , pay-1, T1,",
        "checkout, o-2, p-1, buyer-2, , ,",
    ]);

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path()).arg("--catalog").arg(catalog.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("out of range"))
        .stdout(predicate::str::contains("o-1,p-1,buyer-1,5,PI,pending,,,"))
        .stdout(predicate::str::contains("o-2,p-1,buyer-2,5,PI,pending,,,"));
}

#[test]
fn test_stale_threshold_out_of_range_is_reported() {
    let log = common::callback_log(&["checkout, o-1, p-1, buyer-1, , ,"]);

    let mut cmd = Command::new(cargo_bin!("pi-checkout"));
    cmd.arg(log.path())
        .arg("--catalog")
        .arg(common::CATALOG)
        .arg("--stale-after-minutes")
        .arg("9223372036854775807");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("out of range"));
}
