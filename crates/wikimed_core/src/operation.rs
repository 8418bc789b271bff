//! Declarative descriptions of the WikiMed operations.
//!
//! Every tool is a fixed `MType` code plus a mapping from tool argument names
//! to upstream query fields. [`OperationSpec::build_request`] is the single
//! routine that validates arguments against a descriptor and produces the
//! [`OperationRequest`] handed to the dispatcher.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::{CoreError, Result};

/// Query key carrying the numeric operation code.
pub const OPERATION_CODE_FIELD: &str = "MType";

/// Query key carrying the caller's credential code.
pub const CREDENTIAL_FIELD: &str = "HCode";

const DATE_HINT: &str = "in format DD/MM/YYYY";

/// The upstream dispatch code (`MType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationCode(pub u16);

impl OperationCode {
    pub const SYSTEM_INFO: Self = Self(100);
    pub const LIST_DOCTORS: Self = Self(500);
    pub const FIND_DOCTOR: Self = Self(600);
    pub const CREATE_APPOINTMENT: Self = Self(700);
    pub const NEAREST_SLOT: Self = Self(800);
    pub const UPDATE_APPOINTMENT: Self = Self(900);
    pub const GET_APPOINTMENT: Self = Self(910);
    pub const LIST_APPOINTMENTS: Self = Self(1000);
    pub const SEARCH_PATIENT: Self = Self(1100);
    /// Shared by patient invoices and the daily income report.
    pub const FINANCE: Self = Self(1200);
    pub const RESTART_SERVICE: Self = Self(1300);
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an argument participates in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-empty.
    Required { hint: Option<&'static str> },
    /// Sent only when non-empty.
    Optional,
    /// Always sent; the default stands in for a missing or empty value.
    Defaulted(&'static str),
    /// Always sent; restricted to a closed set. Absent means `default`.
    Choice {
        default: &'static str,
        allowed: &'static [&'static str],
    },
}

/// One argument → query field mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Tool argument name
    pub arg: &'static str,
    /// Upstream query key
    pub field: &'static str,
    pub presence: Presence,
}

impl FieldSpec {
    pub const fn required(arg: &'static str, field: &'static str) -> Self {
        Self {
            arg,
            field,
            presence: Presence::Required { hint: None },
        }
    }

    pub const fn required_with_hint(
        arg: &'static str,
        field: &'static str,
        hint: &'static str,
    ) -> Self {
        Self {
            arg,
            field,
            presence: Presence::Required { hint: Some(hint) },
        }
    }

    pub const fn optional(arg: &'static str, field: &'static str) -> Self {
        Self {
            arg,
            field,
            presence: Presence::Optional,
        }
    }

    pub const fn defaulted(arg: &'static str, field: &'static str, default: &'static str) -> Self {
        Self {
            arg,
            field,
            presence: Presence::Defaulted(default),
        }
    }

    pub const fn choice(
        arg: &'static str,
        field: &'static str,
        default: &'static str,
        allowed: &'static [&'static str],
    ) -> Self {
        Self {
            arg,
            field,
            presence: Presence::Choice { default, allowed },
        }
    }
}

/// Static description of a single tool operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Tool name exposed to agents
    pub tool: &'static str,
    pub code: OperationCode,
    pub fields: &'static [FieldSpec],
    /// At least one of these must be non-empty; every non-empty one is sent.
    pub any_of: &'static [FieldSpec],
    /// Extra query fields sent verbatim.
    pub fixed: &'static [(&'static str, &'static str)],
}

impl OperationSpec {
    const fn bare(tool: &'static str, code: OperationCode) -> Self {
        Self {
            tool,
            code,
            fields: &[],
            any_of: &[],
            fixed: &[],
        }
    }

    /// Validate `args` and build the upstream request.
    ///
    /// Fails with a validation error, before anything touches the network,
    /// when a required argument is missing or a choice is out of range.
    pub fn build_request(&self, args: &Arguments) -> Result<OperationRequest> {
        let mut request = OperationRequest::new(self.code);

        if !self.any_of.is_empty() {
            let supplied: Vec<_> = self
                .any_of
                .iter()
                .filter_map(|spec| args.get(spec.arg).map(|value| (spec.field, value)))
                .collect();
            if supplied.is_empty() {
                return Err(CoreError::MissingIdentifier {
                    fields: self.any_of.iter().map(|s| s.arg.to_string()).collect(),
                });
            }
            for (field, value) in supplied {
                request = request.with_field(field, value);
            }
        }

        for spec in self.fields {
            match spec.presence {
                Presence::Required { hint } => {
                    let value = args.get(spec.arg).ok_or_else(|| CoreError::MissingField {
                        field: spec.arg.to_string(),
                        hint: hint.map(str::to_string),
                    })?;
                    request = request.with_field(spec.field, value);
                }
                Presence::Optional => {
                    if let Some(value) = args.get(spec.arg) {
                        request = request.with_field(spec.field, value);
                    }
                }
                Presence::Defaulted(default) => {
                    let value = args.get(spec.arg).unwrap_or(default);
                    request = request.with_field(spec.field, value);
                }
                Presence::Choice { default, allowed } => {
                    let value = args.get_raw(spec.arg).unwrap_or(default);
                    if !allowed.contains(&value) {
                        return Err(CoreError::InvalidChoice {
                            field: spec.arg.to_string(),
                            value: value.to_string(),
                            allowed: allowed.iter().map(|a| a.to_string()).collect(),
                        });
                    }
                    request = request.with_field(spec.field, value);
                }
            }
        }

        for &(field, value) in self.fixed {
            request = request.with_field(field, value);
        }

        Ok(request)
    }
}

pub static GET_WIKIMED_INFO: OperationSpec =
    OperationSpec::bare("get_wikimed_info", OperationCode::SYSTEM_INFO);

pub static LIST_DOCTORS: OperationSpec =
    OperationSpec::bare("list_doctors", OperationCode::LIST_DOCTORS);

pub static FIND_DOCTOR_BY_NAME: OperationSpec = OperationSpec {
    fields: &[FieldSpec::required("doctor_name", "DoctorName")],
    ..OperationSpec::bare("find_doctor_by_name", OperationCode::FIND_DOCTOR)
};

pub static FIND_DOCTOR_BY_CODE: OperationSpec = OperationSpec {
    fields: &[FieldSpec::required("doctor_code", "DoctorCode")],
    ..OperationSpec::bare("find_doctor_by_code", OperationCode::FIND_DOCTOR)
};

pub static CREATE_APPOINTMENT: OperationSpec = OperationSpec {
    fields: &[
        FieldSpec::required("doctor_code", "DoctorCode"),
        FieldSpec::required("patient_phone", "PatientPhone"),
        FieldSpec::required("appointment_date", "AppointmentDate"),
        FieldSpec::required("appointment_time", "AppointmentTime"),
        FieldSpec::defaulted("branch_id", "IDBranch", "1"),
        FieldSpec::optional("patient_name", "PatientName"),
        FieldSpec::optional("social_id", "SocialID"),
    ],
    ..OperationSpec::bare("create_appointment", OperationCode::CREATE_APPOINTMENT)
};

pub static FIND_NEAREST_SLOT: OperationSpec = OperationSpec {
    fields: &[
        FieldSpec::required("doctor_code", "DoctorCode"),
        FieldSpec::optional("preferred_date", "PreferredDate"),
    ],
    ..OperationSpec::bare("find_nearest_slot", OperationCode::NEAREST_SLOT)
};

pub static CONFIRM_APPOINTMENT: OperationSpec = OperationSpec {
    fields: &[
        FieldSpec::required("appointment_number", "AppointmentNumber"),
        FieldSpec::choice("action", "Action", "confirm", &["confirm", "cancel", "update"]),
    ],
    ..OperationSpec::bare("confirm_appointment", OperationCode::UPDATE_APPOINTMENT)
};

pub static GET_APPOINTMENT: OperationSpec = OperationSpec {
    fields: &[FieldSpec::required("appointment_number", "AppointmentNumber")],
    ..OperationSpec::bare("get_appointment", OperationCode::GET_APPOINTMENT)
};

pub static LIST_APPOINTMENTS: OperationSpec = OperationSpec {
    fields: &[
        FieldSpec::required_with_hint("date", "Date", DATE_HINT),
        FieldSpec::optional("doctor_code", "DoctorCode"),
        FieldSpec::optional("branch_id", "IDBranch"),
    ],
    ..OperationSpec::bare("list_appointments", OperationCode::LIST_APPOINTMENTS)
};

pub static SEARCH_PATIENT: OperationSpec = OperationSpec {
    any_of: &[
        FieldSpec::optional("file_no", "FileNo"),
        FieldSpec::optional("phone", "Phone"),
        FieldSpec::optional("social_id", "SocialID"),
    ],
    ..OperationSpec::bare("search_patient", OperationCode::SEARCH_PATIENT)
};

pub static GET_PATIENT_INVOICE: OperationSpec = OperationSpec {
    any_of: &[
        FieldSpec::optional("patient_file_no", "FileNo"),
        FieldSpec::optional("patient_phone", "Phone"),
        FieldSpec::optional("social_id", "SocialID"),
    ],
    ..OperationSpec::bare("get_patient_invoice", OperationCode::FINANCE)
};

pub static GET_DAILY_INCOME: OperationSpec = OperationSpec {
    fields: &[FieldSpec::required_with_hint("date", "Date", DATE_HINT)],
    fixed: &[("ReportType", "DailyIncome")],
    ..OperationSpec::bare("get_daily_income", OperationCode::FINANCE)
};

pub static RESTART_SERVICE: OperationSpec =
    OperationSpec::bare("restart_service", OperationCode::RESTART_SERVICE);

/// Every upstream operation, in dispatch-code order.
pub static ALL: &[&OperationSpec] = &[
    &GET_WIKIMED_INFO,
    &LIST_DOCTORS,
    &FIND_DOCTOR_BY_NAME,
    &FIND_DOCTOR_BY_CODE,
    &CREATE_APPOINTMENT,
    &FIND_NEAREST_SLOT,
    &CONFIRM_APPOINTMENT,
    &GET_APPOINTMENT,
    &LIST_APPOINTMENTS,
    &SEARCH_PATIENT,
    &GET_PATIENT_INVOICE,
    &GET_DAILY_INCOME,
    &RESTART_SERVICE,
];

/// Look an operation up by tool name.
pub fn find(tool: &str) -> Option<&'static OperationSpec> {
    ALL.iter().copied().find(|spec| spec.tool == tool)
}

/// Named string arguments supplied by a tool caller.
///
/// Empty strings are kept, but [`Arguments::get`] treats them as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(BTreeMap<String, String>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Non-empty value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_raw(name).filter(|value| !value.is_empty())
    }

    /// Value for `name` as supplied, including empty strings.
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Flatten a serializable argument struct into named strings.
    ///
    /// `null` fields are skipped. The MCP argument structs only carry strings;
    /// numbers and booleans are rendered as text for library callers whose
    /// structs use typed fields (a numeric branch id, say). Nested values are
    /// rejected.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| CoreError::Unexpected {
            message: e.to_string(),
        })?;
        let serde_json::Value::Object(map) = value else {
            return Err(CoreError::Unexpected {
                message: "tool arguments must serialize to an object".to_string(),
            });
        };

        let mut args = Self::new();
        for (name, value) in map {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => args.insert(name, s),
                serde_json::Value::Number(n) => args.insert(name, n.to_string()),
                serde_json::Value::Bool(b) => args.insert(name, b.to_string()),
                other => {
                    return Err(CoreError::Unexpected {
                        message: format!("argument '{name}' must be a string, got {other}"),
                    });
                }
            }
        }
        Ok(args)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}

/// A single upstream call: operation code plus query fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    code: OperationCode,
    fields: BTreeMap<String, String>,
}

impl OperationRequest {
    pub fn new(code: OperationCode) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(OPERATION_CODE_FIELD.to_string(), code.to_string());
        Self { code, fields }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn code(&self) -> OperationCode {
        self.code
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn create_appointment_fields_are_exact() {
        let args = Arguments::new()
            .with("doctor_code", "D1")
            .with("patient_phone", "555")
            .with("appointment_date", "01/01/2030")
            .with("appointment_time", "10:00");

        let request = CREATE_APPOINTMENT.build_request(&args).unwrap();
        assert_eq!(
            request.fields(),
            &fields(&[
                ("MType", "700"),
                ("DoctorCode", "D1"),
                ("PatientPhone", "555"),
                ("AppointmentDate", "01/01/2030"),
                ("AppointmentTime", "10:00"),
                ("IDBranch", "1"),
            ])
        );
        assert_eq!(request.get("PatientName"), None);
        assert_eq!(request.get("SocialID"), None);
    }

    #[test]
    fn create_appointment_optionals_and_branch() {
        let args = Arguments::new()
            .with("doctor_code", "D1")
            .with("patient_phone", "555")
            .with("appointment_date", "01/01/2030")
            .with("appointment_time", "10:00")
            .with("patient_name", "Layla")
            .with("social_id", "")
            .with("branch_id", "3");

        let request = CREATE_APPOINTMENT.build_request(&args).unwrap();
        assert_eq!(request.get("PatientName"), Some("Layla"));
        assert_eq!(request.get("SocialID"), None);
        assert_eq!(request.get("IDBranch"), Some("3"));
    }

    #[test]
    fn required_fields_are_checked_in_order() {
        let args = Arguments::new()
            .with("doctor_code", "D1")
            .with("appointment_time", "10:00");

        let err = CREATE_APPOINTMENT.build_request(&args).unwrap_err();
        assert_eq!(err.to_string(), "patient_phone is required");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let args = Arguments::new().with("appointment_number", "");
        let err = GET_APPOINTMENT.build_request(&args).unwrap_err();
        assert_eq!(err.to_string(), "appointment_number is required");
    }

    #[test]
    fn date_fields_carry_format_hint() {
        for spec in [&LIST_APPOINTMENTS, &GET_DAILY_INCOME] {
            let err = spec.build_request(&Arguments::new()).unwrap_err();
            assert_eq!(err.to_string(), "date is required in format DD/MM/YYYY");
        }
    }

    #[test]
    fn action_defaults_to_confirm_and_rejects_others() {
        let base = Arguments::new().with("appointment_number", "A1");

        let request = CONFIRM_APPOINTMENT.build_request(&base).unwrap();
        assert_eq!(
            request.fields(),
            &fields(&[
                ("MType", "900"),
                ("AppointmentNumber", "A1"),
                ("Action", "confirm")
            ])
        );

        let cancel = base.clone().with("action", "cancel");
        assert_eq!(
            CONFIRM_APPOINTMENT
                .build_request(&cancel)
                .unwrap()
                .get("Action"),
            Some("cancel")
        );

        for bad in ["delete", "", "CONFIRM"] {
            let args = base.clone().with("action", bad);
            let err = CONFIRM_APPOINTMENT.build_request(&args).unwrap_err();
            assert_eq!(
                err.to_string(),
                "action must be one of: confirm, cancel, update"
            );
        }
    }

    #[test]
    fn identifier_groups() {
        let err = SEARCH_PATIENT.build_request(&Arguments::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "At least one identifier required: file_no, phone, or social_id"
        );

        let err = GET_PATIENT_INVOICE
            .build_request(&Arguments::new().with("patient_phone", ""))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "At least one identifier required: patient_file_no, patient_phone, or social_id"
        );

        let request = SEARCH_PATIENT
            .build_request(&Arguments::new().with("phone", "0555").with("social_id", "X9"))
            .unwrap();
        assert_eq!(
            request.fields(),
            &fields(&[("MType", "1100"), ("Phone", "0555"), ("SocialID", "X9")])
        );

        let invoice = GET_PATIENT_INVOICE
            .build_request(&Arguments::new().with("patient_file_no", "F-17"))
            .unwrap();
        assert_eq!(
            invoice.fields(),
            &fields(&[("MType", "1200"), ("FileNo", "F-17")])
        );
    }

    #[test]
    fn daily_income_shares_finance_code() {
        let request = GET_DAILY_INCOME
            .build_request(&Arguments::new().with("date", "05/03/2025"))
            .unwrap();
        assert_eq!(request.code(), GET_PATIENT_INVOICE.code);
        assert_eq!(
            request.fields(),
            &fields(&[
                ("MType", "1200"),
                ("Date", "05/03/2025"),
                ("ReportType", "DailyIncome")
            ])
        );
    }

    #[test]
    fn bare_operations_only_send_the_code() {
        for (spec, code) in [
            (&GET_WIKIMED_INFO, "100"),
            (&LIST_DOCTORS, "500"),
            (&RESTART_SERVICE, "1300"),
        ] {
            let request = spec.build_request(&Arguments::new()).unwrap();
            assert_eq!(request.fields(), &fields(&[("MType", code)]));
        }
    }

    #[test]
    fn list_appointments_optional_filters() {
        let request = LIST_APPOINTMENTS
            .build_request(
                &Arguments::new()
                    .with("date", "01/02/2025")
                    .with("branch_id", "2"),
            )
            .unwrap();
        assert_eq!(
            request.fields(),
            &fields(&[("MType", "1000"), ("Date", "01/02/2025"), ("IDBranch", "2")])
        );
    }

    #[test]
    fn every_required_field_is_enforced() {
        for spec in ALL {
            let required: Vec<_> = spec
                .fields
                .iter()
                .filter(|f| matches!(f.presence, Presence::Required { .. }))
                .collect();

            for missing in &required {
                let args: Arguments = required
                    .iter()
                    .filter(|f| f.arg != missing.arg)
                    .map(|f| (f.arg, "x"))
                    .chain(spec.any_of.iter().take(1).map(|f| (f.arg, "x")))
                    .collect();
                let err = spec.build_request(&args).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Validation, "{}", spec.tool);
                assert!(err.to_string().starts_with(missing.arg), "{}", spec.tool);
            }
        }
    }

    #[test]
    fn lookup_by_tool_name() {
        assert_eq!(find("list_doctors").unwrap().code, OperationCode(500));
        assert!(find("configure_client").is_none());
        assert_eq!(ALL.len(), 13);
    }

    #[test]
    fn arguments_from_struct() {
        #[derive(Serialize)]
        struct Req {
            doctor_code: String,
            preferred_date: Option<String>,
            client_id: Option<String>,
        }

        let args = Arguments::from_serialize(&Req {
            doctor_code: "D7".to_string(),
            preferred_date: None,
            client_id: Some("c1".to_string()),
        })
        .unwrap();

        assert_eq!(args.get("doctor_code"), Some("D7"));
        assert_eq!(args.get("preferred_date"), None);
        assert_eq!(args.get("client_id"), Some("c1"));
    }

    #[test]
    fn typed_scalars_are_rendered_as_text() {
        #[derive(Serialize)]
        struct Typed {
            date: &'static str,
            branch_id: u32,
            urgent: bool,
        }

        let args = Arguments::from_serialize(&Typed {
            date: "01/02/2025",
            branch_id: 4,
            urgent: true,
        })
        .unwrap();
        assert_eq!(args.get("branch_id"), Some("4"));
        assert_eq!(args.get("urgent"), Some("true"));

        let request = LIST_APPOINTMENTS.build_request(&args).unwrap();
        assert_eq!(request.get("IDBranch"), Some("4"));

        #[derive(Serialize)]
        struct Nested {
            doctor_codes: Vec<&'static str>,
        }
        let err = Arguments::from_serialize(&Nested {
            doctor_codes: vec!["D1"],
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }
}
