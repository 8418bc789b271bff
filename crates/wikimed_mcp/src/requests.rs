//! Tool argument types
//!
//! Every field is optional at the schema level so that a missing argument
//! reaches the operation validator and comes back as an error result instead
//! of a protocol-level rejection.

use serde::{Deserialize, Serialize};

/// Arguments for tools that take nothing but the caller id
#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ClientRequest {
    /// Caller identifier from `configure_client`; the default endpoint is used when omitted
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ConfigureClientRequest {
    /// Identifier the caller will pass as `client_id` on later calls
    pub client_id: Option<String>,
    /// Base URL of the clinic's WikiMed endpoint, e.g. http://host:port
    pub base_url: Option<String>,
    /// Clinic credential code (HCode)
    #[serde(alias = "hcode")]
    pub credential_code: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct FindDoctorByNameRequest {
    /// Doctor name, full or partial (required)
    pub doctor_name: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct FindDoctorByCodeRequest {
    /// Doctor code (required)
    pub doctor_code: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct CreateAppointmentRequest {
    /// Doctor code (required)
    pub doctor_code: Option<String>,
    /// Patient phone number (required)
    pub patient_phone: Option<String>,
    /// Appointment date, DD/MM/YYYY (required)
    pub appointment_date: Option<String>,
    /// Appointment time, HH:MM (required)
    pub appointment_time: Option<String>,
    /// Patient name
    pub patient_name: Option<String>,
    /// Patient national id
    pub social_id: Option<String>,
    /// Branch id, defaults to "1"
    pub branch_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct FindNearestSlotRequest {
    /// Doctor code (required)
    pub doctor_code: Option<String>,
    /// Search from this date, DD/MM/YYYY
    pub preferred_date: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ConfirmAppointmentRequest {
    /// Appointment number (required)
    pub appointment_number: Option<String>,
    /// One of confirm, cancel, update; defaults to confirm
    pub action: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetAppointmentRequest {
    /// Appointment number (required)
    pub appointment_number: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ListAppointmentsRequest {
    /// Day to list, DD/MM/YYYY (required)
    pub date: Option<String>,
    /// Restrict to one doctor
    pub doctor_code: Option<String>,
    /// Restrict to one branch
    pub branch_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchPatientRequest {
    /// Patient file number
    pub file_no: Option<String>,
    /// Patient phone number
    pub phone: Option<String>,
    /// Patient national id
    pub social_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetPatientInvoiceRequest {
    /// Patient file number
    pub patient_file_no: Option<String>,
    /// Patient phone number
    pub patient_phone: Option<String>,
    /// Patient national id
    pub social_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetDailyIncomeRequest {
    /// Report day, DD/MM/YYYY (required)
    pub date: Option<String>,
    pub client_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hcode_alias_is_accepted() {
        let request: ConfigureClientRequest = serde_json::from_value(serde_json::json!({
            "client_id": "clinic",
            "base_url": "http://clinic.example",
            "hcode": "123"
        }))
        .unwrap();
        assert_eq!(request.credential_code.as_deref(), Some("123"));
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let request: CreateAppointmentRequest =
            serde_json::from_value(serde_json::json!({ "doctor_code": "D1" })).unwrap();
        assert_eq!(request.doctor_code.as_deref(), Some("D1"));
        assert!(request.patient_phone.is_none());
        assert!(request.client_id.is_none());
    }
}
