//! Request and response shapes exchanged with transport layers.
//!
//! # Responsibility
//! - Map validated requests to entities and entities to responses.
//! - Keep JSON field names stable (`birth_date`, `test_code`, `no_order`).
//!
//! # Invariants
//! - Requests never carry identifiers or timestamps owned by storage.
//! - Patient updates always overwrite names, birth date and sex; address, phone
//!   and email only when the request value is non-empty.

use crate::model::patient::{Patient, PatientId, Sex};
use crate::model::work_order::{OrderNumber, WorkOrder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRequest {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl PatientRequest {
    /// Builds a new patient entity under a freshly generated identifier.
    pub fn to_entity(&self, id: impl Into<PatientId>) -> Patient {
        let mut patient = Patient::new(
            id,
            self.first_name.clone(),
            self.last_name.clone(),
            self.birth_date,
            self.sex,
        );
        patient.address = self.address.clone();
        patient.phone = self.phone.clone();
        patient.email = self.email.clone();
        patient
    }

    /// Applies this request onto an existing patient.
    pub fn apply_to(&self, patient: &mut Patient) {
        patient.first_name = self.first_name.clone();
        patient.last_name = self.last_name.clone();
        patient.birth_date = self.birth_date;
        patient.sex = self.sex;
        if !self.address.is_empty() {
            patient.address = self.address.clone();
        }
        if !self.phone.is_empty() {
            patient.phone = self.phone.clone();
        }
        if !self.email.is_empty() {
            patient.email = self.email.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientResponse {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Patient> for PatientResponse {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            birth_date: patient.birth_date,
            sex: patient.sex,
            address: patient.address,
            phone: patient.phone,
            email: patient.email,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

/// Work order request with an embedded patient that is created alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderRequest {
    pub no_order: OrderNumber,
    #[serde(rename = "test_code", default)]
    pub test_codes: Vec<String>,
    pub patient: PatientRequest,
    #[serde(default)]
    pub analyst: String,
    #[serde(default)]
    pub doctor: String,
}

impl WorkOrderRequest {
    pub fn to_entity(&self, patient_id: impl Into<PatientId>) -> WorkOrder {
        let mut work_order = WorkOrder::new(self.no_order.clone(), patient_id);
        work_order.test_codes = self.test_codes.clone();
        work_order.analyst = self.analyst.clone();
        work_order.doctor = self.doctor.clone();
        work_order
    }

    /// Applies mutable order fields. The order number and patient link stay.
    pub fn apply_to(&self, work_order: &mut WorkOrder) {
        work_order.test_codes = self.test_codes.clone();
        work_order.analyst = self.analyst.clone();
        work_order.doctor = self.doctor.clone();
    }
}

/// Work order request that links to an already registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachWorkOrderRequest {
    pub no_order: OrderNumber,
    pub patient_id: PatientId,
    #[serde(rename = "test_code", default)]
    pub test_codes: Vec<String>,
    #[serde(default)]
    pub analyst: String,
    #[serde(default)]
    pub doctor: String,
}

impl AttachWorkOrderRequest {
    pub fn to_entity(&self) -> WorkOrder {
        let mut work_order = WorkOrder::new(self.no_order.clone(), self.patient_id.clone());
        work_order.test_codes = self.test_codes.clone();
        work_order.analyst = self.analyst.clone();
        work_order.doctor = self.doctor.clone();
        work_order
    }
}

/// Work order composed with its patient.
///
/// `patient` is `None` only on best-effort list reads whose patient
/// reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderResponse {
    pub no_order: OrderNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientResponse>,
    #[serde(rename = "test_code")]
    pub test_codes: Vec<String>,
    pub analyst: String,
    pub doctor: String,
}

impl WorkOrderResponse {
    pub fn compose(work_order: WorkOrder, patient: Option<Patient>) -> Self {
        Self {
            no_order: work_order.no_order,
            patient: patient.map(PatientResponse::from),
            test_codes: work_order.test_codes,
            analyst: work_order.analyst,
            doctor: work_order.doctor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PatientRequest, WorkOrderRequest, WorkOrderResponse};
    use crate::model::patient::Sex;
    use crate::model::work_order::WorkOrder;
    use chrono::NaiveDate;

    fn request() -> PatientRequest {
        PatientRequest {
            first_name: "Budi".to_string(),
            last_name: "Santoso".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 1, 30).unwrap(),
            sex: Sex::Male,
            address: "Jl. Merdeka 1".to_string(),
            phone: "0812".to_string(),
            email: "budi@lab.example".to_string(),
        }
    }

    #[test]
    fn apply_to_keeps_contact_fields_when_request_values_are_empty() {
        let mut patient = request().to_entity("p-1");
        let update = PatientRequest {
            first_name: "Budi".to_string(),
            last_name: "Wijaya".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 2, 1).unwrap(),
            sex: Sex::Male,
            address: String::new(),
            phone: "0813".to_string(),
            email: String::new(),
        };

        update.apply_to(&mut patient);

        assert_eq!(patient.last_name, "Wijaya");
        assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(1985, 2, 1).unwrap());
        assert_eq!(patient.address, "Jl. Merdeka 1");
        assert_eq!(patient.phone, "0813");
        assert_eq!(patient.email, "budi@lab.example");
    }

    #[test]
    fn work_order_request_apply_keeps_keys() {
        let request = WorkOrderRequest {
            no_order: "IGNORED".to_string(),
            test_codes: vec!["GLU".to_string()],
            patient: request(),
            analyst: "Rina".to_string(),
            doctor: "Dr. Hadi".to_string(),
        };
        let mut order = WorkOrder::new("WO-1", "p-1");

        request.apply_to(&mut order);

        assert_eq!(order.no_order, "WO-1");
        assert_eq!(order.patient_id, "p-1");
        assert_eq!(order.test_codes, vec!["GLU".to_string()]);
        assert_eq!(order.doctor, "Dr. Hadi");
    }

    #[test]
    fn compose_without_patient_leaves_patient_empty() {
        let mut order = WorkOrder::new("WO-1", "p-1");
        order.test_codes = vec!["CBC".to_string()];

        let response = WorkOrderResponse::compose(order, None);

        assert!(response.patient.is_none());
        assert_eq!(response.test_codes, vec!["CBC".to_string()]);
    }

    #[test]
    fn work_order_request_reads_wire_field_names() {
        let request: WorkOrderRequest = serde_json::from_str(
            r#"{
                "no_order": "WO-7",
                "test_code": ["CBC", "LFT"],
                "patient": {
                    "first_name": "Sinta",
                    "birth_date": "1992-03-04",
                    "sex": "female"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(request.test_codes, vec!["CBC".to_string(), "LFT".to_string()]);
        assert_eq!(request.patient.sex, Sex::Female);
        assert!(request.patient.last_name.is_empty());
        assert!(request.doctor.is_empty());
    }

    #[test]
    fn response_without_patient_omits_patient_field() {
        let response = WorkOrderResponse::compose(WorkOrder::new("WO-1", "p-1"), None);

        let value = serde_json::to_value(&response).unwrap();

        assert!(value.get("patient").is_none());
        assert_eq!(value["test_code"], serde_json::json!([]));
        assert_eq!(value["no_order"], "WO-1");
    }
}
