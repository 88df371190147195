//! Validation boundary for typed records.
//!
//! Candidate records are checked against JSON Schema (draft 7) first, then
//! decoded into their typed form, then money fields are checked for fixed
//! precision (at most 18 digits, at most 2 of them fractional).
//!
//! # Embedded Schemas
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `household.json`
//! - `kpi_observation.json`
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use nexus::validation::validate_household;
//!
//! let candidate = json!({
//!     "id": "123456",
//!     "name": "Smith Family",
//!     "counterparty_code": "OFF001",
//!     "balance_current": "100.50",
//!     "balance_prior_month": "90.00",
//!     "balance_ytd_start": "80.00",
//!     "as_of_date": "2024-01-15"
//! });
//! assert!(validate_household(&candidate).is_ok());
//! ```

use jsonschema::Validator;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::models::{HouseholdRecord, KpiObservation};

/// Largest integer part that still fits 18 digits with 2 decimals.
const MONEY_INTEGER_LIMIT: i64 = 10_000_000_000_000_000;

/// Decimal places allowed in a money value.
pub const MONEY_SCALE: u32 = 2;

static HOUSEHOLD_SCHEMA: Lazy<Validator> =
    Lazy::new(|| compile(include_str!("../../schemas/household.json")));

static KPI_OBSERVATION_SCHEMA: Lazy<Validator> =
    Lazy::new(|| compile(include_str!("../../schemas/kpi_observation.json")));

fn compile(source: &str) -> Validator {
    let schema: Value = serde_json::from_str(source).expect("Invalid embedded schema");
    jsonschema::draft7::new(&schema).expect("Invalid embedded schema")
}

fn schema_errors(validator: &Validator, data: &Value) -> Result<(), Vec<String>> {
    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn decode<T: DeserializeOwned>(validator: &Validator, data: &Value) -> ValidationResult<T> {
    schema_errors(validator, data).map_err(|errors| ValidationError::SchemaError { errors })?;
    serde_json::from_value(data.clone()).map_err(|e| ValidationError::SchemaError {
        errors: vec![e.to_string()],
    })
}

/// Check a money value fits the fixed precision.
pub fn check_money(field: &str, value: &Decimal) -> ValidationResult<()> {
    let normalized = value.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("{} has more than {} decimal places", value, MONEY_SCALE),
        });
    }
    if normalized.trunc().abs() >= Decimal::from(MONEY_INTEGER_LIMIT) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("{} exceeds 18 digits", value),
        });
    }
    Ok(())
}

fn check_optional_money(field: &str, value: Option<&Decimal>) -> ValidationResult<()> {
    match value {
        Some(v) => check_money(field, v),
        None => Ok(()),
    }
}

/// Validate a candidate household and decode it.
pub fn validate_household(data: &Value) -> ValidationResult<HouseholdRecord> {
    let household: HouseholdRecord = decode(&HOUSEHOLD_SCHEMA, data)?;
    check_optional_money("balance_current", household.balance_current.as_ref())?;
    check_optional_money("balance_prior_month", household.balance_prior_month.as_ref())?;
    check_optional_money("balance_ytd_start", household.balance_ytd_start.as_ref())?;
    Ok(household)
}

/// Validate a KPI observation before it is written.
pub fn validate_kpi_observation(kpi: &KpiObservation) -> ValidationResult<()> {
    let data = serde_json::to_value(kpi).map_err(|e| ValidationError::SchemaError {
        errors: vec![e.to_string()],
    })?;
    schema_errors(&KPI_OBSERVATION_SCHEMA, &data).map_err(|errors| ValidationError::SchemaError { errors })?;
    check_money("value", &kpi.value)
}
