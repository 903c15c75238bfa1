//! Work order store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the `work_orders` parent row and its `work_order_test_codes` children.
//! - Own full-replace synchronization of test codes on update.
//!
//! # Invariants
//! - Test codes are returned in insertion order (`ORDER BY id`).
//! - Children are written after and deleted before their parent.
//! - A failed child write fails the whole call; the caller's rollback removes
//!   any partial rows.
//! - List operations return parents ordered by `no_order ASC`.

use crate::model::work_order::WorkOrder;
use crate::repo::{RepoError, RepoResult, SqlContext, WORK_ORDER_ENTITY};
use rusqlite::{params, OptionalExtension, Row, Transaction};

const WORK_ORDER_SELECT_SQL: &str = "SELECT
    no_order,
    patient_id,
    analyst,
    doctor
FROM work_orders";

/// Transaction-scoped work order store.
pub trait WorkOrderRepository {
    fn create(&self, tx: &Transaction<'_>, work_order: &WorkOrder) -> RepoResult<()>;
    fn get_by_no_order(&self, tx: &Transaction<'_>, no_order: &str) -> RepoResult<WorkOrder>;
    /// Overwrites analyst/doctor and fully replaces the test-code list.
    fn update(&self, tx: &Transaction<'_>, work_order: &WorkOrder) -> RepoResult<()>;
    fn delete(&self, tx: &Transaction<'_>, no_order: &str) -> RepoResult<()>;
    fn get_all(&self, tx: &Transaction<'_>) -> RepoResult<Vec<WorkOrder>>;
    fn get_by_doctor(&self, tx: &Transaction<'_>, doctor: &str) -> RepoResult<Vec<WorkOrder>>;
    fn get_by_analyst(&self, tx: &Transaction<'_>, analyst: &str) -> RepoResult<Vec<WorkOrder>>;
}

/// SQLite-backed work order store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteWorkOrderRepository;

impl SqliteWorkOrderRepository {
    pub fn new() -> Self {
        Self
    }
}

impl WorkOrderRepository for SqliteWorkOrderRepository {
    fn create(&self, tx: &Transaction<'_>, work_order: &WorkOrder) -> RepoResult<()> {
        work_order.validate()?;

        tx.execute(
            "INSERT INTO work_orders (
                no_order,
                patient_id,
                analyst,
                doctor
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                work_order.no_order.as_str(),
                work_order.patient_id.as_str(),
                work_order.analyst.as_str(),
                work_order.doctor.as_str(),
            ],
        )
        .context("create work order", WORK_ORDER_ENTITY, &work_order.no_order)?;

        insert_test_codes(tx, &work_order.no_order, &work_order.test_codes)
    }

    fn get_by_no_order(&self, tx: &Transaction<'_>, no_order: &str) -> RepoResult<WorkOrder> {
        let mut stmt = tx
            .prepare_cached(&format!("{WORK_ORDER_SELECT_SQL} WHERE no_order = ?1;"))
            .context("get work order", WORK_ORDER_ENTITY, no_order)?;

        let mut work_order = stmt
            .query_row([no_order], parse_work_order_row)
            .optional()
            .context("get work order", WORK_ORDER_ENTITY, no_order)?
            .ok_or_else(|| RepoError::not_found(WORK_ORDER_ENTITY, no_order))?;

        work_order.test_codes = load_test_codes(tx, no_order)?;
        Ok(work_order)
    }

    fn update(&self, tx: &Transaction<'_>, work_order: &WorkOrder) -> RepoResult<()> {
        work_order.validate()?;

        let changed = tx
            .execute(
                "UPDATE work_orders
                 SET
                    analyst = ?1,
                    doctor = ?2
                 WHERE no_order = ?3;",
                params![
                    work_order.analyst.as_str(),
                    work_order.doctor.as_str(),
                    work_order.no_order.as_str(),
                ],
            )
            .context("update work order", WORK_ORDER_ENTITY, &work_order.no_order)?;

        if changed == 0 {
            return Err(RepoError::not_found(WORK_ORDER_ENTITY, &work_order.no_order));
        }

        // Full replace: test codes carry no identity across updates.
        delete_test_codes(tx, &work_order.no_order)?;
        insert_test_codes(tx, &work_order.no_order, &work_order.test_codes)
    }

    fn delete(&self, tx: &Transaction<'_>, no_order: &str) -> RepoResult<()> {
        delete_test_codes(tx, no_order)?;

        let changed = tx
            .execute("DELETE FROM work_orders WHERE no_order = ?1;", [no_order])
            .context("delete work order", WORK_ORDER_ENTITY, no_order)?;

        if changed == 0 {
            return Err(RepoError::not_found(WORK_ORDER_ENTITY, no_order));
        }

        Ok(())
    }

    fn get_all(&self, tx: &Transaction<'_>) -> RepoResult<Vec<WorkOrder>> {
        list_work_orders(tx, "list work orders", None)
    }

    fn get_by_doctor(&self, tx: &Transaction<'_>, doctor: &str) -> RepoResult<Vec<WorkOrder>> {
        list_work_orders(tx, "list work orders by doctor", Some(("doctor", doctor)))
    }

    fn get_by_analyst(&self, tx: &Transaction<'_>, analyst: &str) -> RepoResult<Vec<WorkOrder>> {
        list_work_orders(tx, "list work orders by analyst", Some(("analyst", analyst)))
    }
}

/// Loads parent rows with an optional exact-match column filter, then
/// enriches each with one child lookup.
fn list_work_orders(
    tx: &Transaction<'_>,
    op: &'static str,
    filter: Option<(&'static str, &str)>,
) -> RepoResult<Vec<WorkOrder>> {
    let key = filter.map_or("*", |(_, value)| value);
    let sql = match filter {
        Some((column, _)) => {
            format!("{WORK_ORDER_SELECT_SQL} WHERE {column} = ?1 ORDER BY no_order ASC;")
        }
        None => format!("{WORK_ORDER_SELECT_SQL} ORDER BY no_order ASC;"),
    };

    let mut work_orders = {
        let mut stmt = tx.prepare_cached(&sql).context(op, WORK_ORDER_ENTITY, key)?;
        let rows = match filter {
            Some((_, value)) => stmt.query_map([value], parse_work_order_row),
            None => stmt.query_map([], parse_work_order_row),
        }
        .context(op, WORK_ORDER_ENTITY, key)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context(op, WORK_ORDER_ENTITY, key)?
    };

    for work_order in &mut work_orders {
        work_order.test_codes = load_test_codes(tx, &work_order.no_order)?;
    }

    Ok(work_orders)
}

fn parse_work_order_row(row: &Row<'_>) -> rusqlite::Result<WorkOrder> {
    Ok(WorkOrder {
        no_order: row.get("no_order")?,
        patient_id: row.get("patient_id")?,
        test_codes: Vec::new(),
        analyst: row.get("analyst")?,
        doctor: row.get("doctor")?,
    })
}

fn load_test_codes(tx: &Transaction<'_>, no_order: &str) -> RepoResult<Vec<String>> {
    let mut stmt = tx
        .prepare_cached(
            "SELECT test_code
             FROM work_order_test_codes
             WHERE no_order = ?1
             ORDER BY id ASC;",
        )
        .context("load test codes", WORK_ORDER_ENTITY, no_order)?;

    let codes = stmt
        .query_map([no_order], |row| row.get::<_, String>(0))
        .context("load test codes", WORK_ORDER_ENTITY, no_order)?
        .collect::<Result<Vec<_>, _>>()
        .context("load test codes", WORK_ORDER_ENTITY, no_order)?;
    Ok(codes)
}

fn insert_test_codes(tx: &Transaction<'_>, no_order: &str, test_codes: &[String]) -> RepoResult<()> {
    if test_codes.is_empty() {
        return Ok(());
    }

    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO work_order_test_codes (no_order, test_code) VALUES (?1, ?2);",
        )
        .context("insert test code", WORK_ORDER_ENTITY, no_order)?;

    for test_code in test_codes {
        stmt.execute(params![no_order, test_code.as_str()])
            .context("insert test code", WORK_ORDER_ENTITY, no_order)?;
    }

    Ok(())
}

fn delete_test_codes(tx: &Transaction<'_>, no_order: &str) -> RepoResult<()> {
    tx.execute(
        "DELETE FROM work_order_test_codes WHERE no_order = ?1;",
        [no_order],
    )
    .context("delete test codes", WORK_ORDER_ENTITY, no_order)?;
    Ok(())
}
