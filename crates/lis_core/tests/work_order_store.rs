use chrono::NaiveDate;
use lis_core::{
    open_db_in_memory, ErrorKind, Patient, PatientRepository, RepoError, Sex,
    SqlitePatientRepository, SqliteWorkOrderRepository, WorkOrder, WorkOrderRepository,
};
use rusqlite::Transaction;

#[test]
fn create_then_get_keeps_test_code_order() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    let work_order = work_order("WO-001", "p-1", &["CBC", "LFT", "RFT"]);
    repo.create(&tx, &work_order).unwrap();

    let loaded = repo.get_by_no_order(&tx, "WO-001").unwrap();
    assert_eq!(loaded, work_order);
    assert_eq!(loaded.test_codes, vec!["CBC", "LFT", "RFT"]);
}

#[test]
fn duplicate_test_codes_are_kept() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    repo.create(&tx, &work_order("WO-001", "p-1", &["CBC", "CBC"]))
        .unwrap();
    let loaded = repo.get_by_no_order(&tx, "WO-001").unwrap();
    assert_eq!(loaded.test_codes, vec!["CBC", "CBC"]);
}

#[test]
fn update_fully_replaces_test_codes() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    repo.create(&tx, &work_order("WO-001", "p-1", &["CBC"])).unwrap();

    let mut changed = work_order("WO-001", "p-1", &["GLU", "TSH"]);
    changed.analyst = "Rina".to_string();
    changed.doctor = "dr. Hadi".to_string();
    repo.update(&tx, &changed).unwrap();

    let loaded = repo.get_by_no_order(&tx, "WO-001").unwrap();
    assert_eq!(loaded.test_codes, vec!["GLU", "TSH"]);
    assert_eq!(loaded.analyst, "Rina");
    assert_eq!(loaded.doctor, "dr. Hadi");
    assert_eq!(test_code_rows(&tx, "WO-001"), 2);
}

#[test]
fn update_with_empty_codes_clears_children() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    repo.create(&tx, &work_order("WO-001", "p-1", &["CBC", "LFT"]))
        .unwrap();
    repo.update(&tx, &work_order("WO-001", "p-1", &[])).unwrap();

    assert!(repo.get_by_no_order(&tx, "WO-001").unwrap().test_codes.is_empty());
    assert_eq!(test_code_rows(&tx, "WO-001"), 0);
}

#[test]
fn update_missing_order_returns_not_found_and_writes_nothing() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    let err = repo
        .update(&tx, &work_order("WO-404", "p-1", &["CBC"]))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "work_order", ref key } if key == "WO-404"));
    assert_eq!(test_code_rows(&tx, "WO-404"), 0);
}

#[test]
fn delete_removes_children_and_parent() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    repo.create(&tx, &work_order("WO-001", "p-1", &["CBC", "LFT"]))
        .unwrap();
    repo.create(&tx, &work_order("WO-002", "p-1", &[])).unwrap();

    repo.delete(&tx, "WO-001").unwrap();
    repo.delete(&tx, "WO-002").unwrap();

    assert_eq!(test_code_rows(&tx, "WO-001"), 0);
    assert_eq!(
        repo.get_by_no_order(&tx, "WO-001").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        repo.delete(&tx, "WO-002").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn create_with_unknown_patient_returns_constraint_violation() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();

    let err = repo
        .create(&tx, &work_order("WO-001", "ghost", &["CBC"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

#[test]
fn create_duplicate_order_number_returns_duplicate_key() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    repo.create(&tx, &work_order("WO-001", "p-1", &["CBC"])).unwrap();
    let err = repo
        .create(&tx, &work_order("WO-001", "p-1", &["GLU"]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert_eq!(
        repo.get_by_no_order(&tx, "WO-001").unwrap().test_codes,
        vec!["CBC"]
    );
}

#[test]
fn create_rejects_blank_test_code() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    let err = repo
        .create(&tx, &work_order("WO-001", "p-1", &["CBC", " "]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert!(repo.get_all(&tx).unwrap().is_empty());
}

#[test]
fn list_filters_by_doctor_and_analyst_ordered_by_order_number() {
    let db = open_db_in_memory().unwrap();
    let mut conn = db.connect().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteWorkOrderRepository::new();
    seed_patient(&tx, "p-1");

    for (no_order, doctor, analyst, codes) in [
        ("WO-003", "dr. Hadi", "Rina", &["CBC"][..]),
        ("WO-001", "dr. Hadi", "Tono", &["LFT", "RFT"][..]),
        ("WO-002", "dr. Sari", "Rina", &[][..]),
    ] {
        let mut item = work_order(no_order, "p-1", codes);
        item.doctor = doctor.to_string();
        item.analyst = analyst.to_string();
        repo.create(&tx, &item).unwrap();
    }

    let all = order_numbers(repo.get_all(&tx).unwrap());
    assert_eq!(all, vec!["WO-001", "WO-002", "WO-003"]);

    let by_doctor = repo.get_by_doctor(&tx, "dr. Hadi").unwrap();
    assert_eq!(by_doctor[0].test_codes, vec!["LFT", "RFT"]);
    assert_eq!(order_numbers(by_doctor), vec!["WO-001", "WO-003"]);

    let by_analyst = order_numbers(repo.get_by_analyst(&tx, "Rina").unwrap());
    assert_eq!(by_analyst, vec!["WO-002", "WO-003"]);

    assert!(repo.get_by_doctor(&tx, "dr. hadi").unwrap().is_empty());
    assert!(repo.get_by_analyst(&tx, "nobody").unwrap().is_empty());
}

fn seed_patient(tx: &Transaction<'_>, id: &str) {
    let patient = Patient::new(
        id,
        "Ana",
        "Smith",
        NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
        Sex::Female,
    );
    SqlitePatientRepository::new().create(tx, &patient).unwrap();
}

fn work_order(no_order: &str, patient_id: &str, codes: &[&str]) -> WorkOrder {
    let mut work_order = WorkOrder::new(no_order, patient_id);
    work_order.test_codes = codes.iter().map(|code| code.to_string()).collect();
    work_order
}

fn test_code_rows(tx: &Transaction<'_>, no_order: &str) -> i64 {
    tx.query_row(
        "SELECT COUNT(*) FROM work_order_test_codes WHERE no_order = ?1;",
        [no_order],
        |row| row.get(0),
    )
    .unwrap()
}

fn order_numbers(work_orders: Vec<WorkOrder>) -> Vec<String> {
    work_orders.into_iter().map(|item| item.no_order).collect()
}
