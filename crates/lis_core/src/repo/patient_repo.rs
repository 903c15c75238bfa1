//! Patient store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and substring search over `patients`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Every operation runs on the caller's transaction.
//! - Timestamps are written by column defaults / SQL, never from the entity.
//! - Listing order is `first_name ASC, last_name ASC, id ASC`.

use crate::model::patient::{Patient, Sex};
use crate::repo::{like_contains_pattern, RepoError, RepoResult, SqlContext, PATIENT_ENTITY};
use rusqlite::{params, OptionalExtension, Row, Transaction};

const PATIENT_SELECT_SQL: &str = "SELECT
    id,
    first_name,
    last_name,
    birthdate,
    sex,
    address,
    phone,
    email,
    created_at,
    updated_at
FROM patients";

/// Transaction-scoped patient store.
pub trait PatientRepository {
    fn create(&self, tx: &Transaction<'_>, patient: &Patient) -> RepoResult<()>;
    fn get_by_id(&self, tx: &Transaction<'_>, id: &str) -> RepoResult<Patient>;
    fn update(&self, tx: &Transaction<'_>, patient: &Patient) -> RepoResult<()>;
    fn delete(&self, tx: &Transaction<'_>, id: &str) -> RepoResult<()>;
    fn get_all(&self, tx: &Transaction<'_>) -> RepoResult<Vec<Patient>>;
    /// Case-insensitive substring match over first/last name, phone and email.
    fn search(&self, tx: &Transaction<'_>, query: &str) -> RepoResult<Vec<Patient>>;
}

/// SQLite-backed patient store.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlitePatientRepository;

impl SqlitePatientRepository {
    pub fn new() -> Self {
        Self
    }
}

impl PatientRepository for SqlitePatientRepository {
    fn create(&self, tx: &Transaction<'_>, patient: &Patient) -> RepoResult<()> {
        patient.validate()?;

        tx.execute(
            "INSERT INTO patients (
                id,
                first_name,
                last_name,
                birthdate,
                sex,
                address,
                phone,
                email
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                patient.id.as_str(),
                patient.first_name.as_str(),
                patient.last_name.as_str(),
                patient.birth_date,
                patient.sex.as_str(),
                patient.address.as_str(),
                patient.phone.as_str(),
                patient.email.as_str(),
            ],
        )
        .context("create patient", PATIENT_ENTITY, &patient.id)?;

        Ok(())
    }

    fn get_by_id(&self, tx: &Transaction<'_>, id: &str) -> RepoResult<Patient> {
        let mut stmt = tx
            .prepare_cached(&format!("{PATIENT_SELECT_SQL} WHERE id = ?1;"))
            .context("get patient", PATIENT_ENTITY, id)?;

        let patient = stmt
            .query_row([id], |row| Ok(parse_patient_row(row)))
            .optional()
            .context("get patient", PATIENT_ENTITY, id)?;

        match patient {
            Some(parsed) => parsed,
            None => Err(RepoError::not_found(PATIENT_ENTITY, id)),
        }
    }

    fn update(&self, tx: &Transaction<'_>, patient: &Patient) -> RepoResult<()> {
        patient.validate()?;

        let changed = tx
            .execute(
                "UPDATE patients
                 SET
                    first_name = ?1,
                    last_name = ?2,
                    birthdate = ?3,
                    sex = ?4,
                    address = ?5,
                    phone = ?6,
                    email = ?7,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?8;",
                params![
                    patient.first_name.as_str(),
                    patient.last_name.as_str(),
                    patient.birth_date,
                    patient.sex.as_str(),
                    patient.address.as_str(),
                    patient.phone.as_str(),
                    patient.email.as_str(),
                    patient.id.as_str(),
                ],
            )
            .context("update patient", PATIENT_ENTITY, &patient.id)?;

        if changed == 0 {
            return Err(RepoError::not_found(PATIENT_ENTITY, &patient.id));
        }

        Ok(())
    }

    fn delete(&self, tx: &Transaction<'_>, id: &str) -> RepoResult<()> {
        let changed = tx
            .execute("DELETE FROM patients WHERE id = ?1;", [id])
            .context("delete patient", PATIENT_ENTITY, id)?;

        if changed == 0 {
            return Err(RepoError::not_found(PATIENT_ENTITY, id));
        }

        Ok(())
    }

    fn get_all(&self, tx: &Transaction<'_>) -> RepoResult<Vec<Patient>> {
        let mut stmt = tx
            .prepare_cached(&format!(
                "{PATIENT_SELECT_SQL} ORDER BY first_name ASC, last_name ASC, id ASC;"
            ))
            .context("list patients", PATIENT_ENTITY, "*")?;
        let mut rows = stmt.query([]).context("list patients", PATIENT_ENTITY, "*")?;

        let mut patients = Vec::new();
        while let Some(row) = rows.next().context("list patients", PATIENT_ENTITY, "*")? {
            patients.push(parse_patient_row(row)?);
        }

        Ok(patients)
    }

    fn search(&self, tx: &Transaction<'_>, query: &str) -> RepoResult<Vec<Patient>> {
        let pattern = like_contains_pattern(query);
        let mut stmt = tx
            .prepare_cached(&format!(
                "{PATIENT_SELECT_SQL}
                 WHERE first_name LIKE ?1 ESCAPE '\\'
                    OR last_name LIKE ?1 ESCAPE '\\'
                    OR phone LIKE ?1 ESCAPE '\\'
                    OR email LIKE ?1 ESCAPE '\\'
                 ORDER BY first_name ASC, last_name ASC, id ASC;"
            ))
            .context("search patients", PATIENT_ENTITY, query)?;
        let mut rows = stmt
            .query([pattern.as_str()])
            .context("search patients", PATIENT_ENTITY, query)?;

        let mut patients = Vec::new();
        while let Some(row) = rows
            .next()
            .context("search patients", PATIENT_ENTITY, query)?
        {
            patients.push(parse_patient_row(row)?);
        }

        Ok(patients)
    }
}

fn parse_patient_row(row: &Row<'_>) -> RepoResult<Patient> {
    let id: String = row.get("id").context("read patient row", PATIENT_ENTITY, "?")?;
    let read = |column: &str| -> RepoResult<String> {
        row.get(column)
            .context("read patient row", PATIENT_ENTITY, &id)
    };

    let sex_text = read("sex")?;
    let sex = Sex::parse(&sex_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid sex `{sex_text}` in patients.sex for `{id}`"))
    })?;

    let birth_date = row.get("birthdate").map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid birthdate in patients.birthdate for `{id}`: {err}"
        ))
    })?;

    Ok(Patient {
        first_name: read("first_name")?,
        last_name: read("last_name")?,
        birth_date,
        sex,
        address: read("address")?,
        phone: read("phone")?,
        email: read("email")?,
        created_at: row
            .get("created_at")
            .context("read patient row", PATIENT_ENTITY, &id)?,
        updated_at: row
            .get("updated_at")
            .context("read patient row", PATIENT_ENTITY, &id)?,
        id,
    })
}
