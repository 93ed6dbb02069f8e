pub mod form;
pub mod rules;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rules::RULE_SETS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Personal,
    Company,
}

/// Everything the user entered at the moment the sign-up form was sent.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupSubmission {
    pub email: String,
    #[serde(default)]
    pub accept_terms: bool,
    pub date_of_birth: NaiveDate,
    pub account_type: AccountType,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_employee_count")]
    pub number_of_employees: Option<i64>,
    pub password: String,
    pub password_confirm: String,
}

impl fmt::Debug for SignupSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupSubmission")
            .field("email", &self.email)
            .field("accept_terms", &self.accept_terms)
            .field("date_of_birth", &self.date_of_birth)
            .field("account_type", &self.account_type)
            .field("company_name", &self.company_name)
            .field("number_of_employees", &self.number_of_employees)
            .field("password", &"<redacted>")
            .field("password_confirm", &"<redacted>")
            .finish()
    }
}

/// Form inputs hand over numbers as text; an empty box means "not given".
/// Unlike a lenient numeric coercion, non-numeric text is a decoding error
/// (HTTP 400) rather than a field error; see "Decoding vs. validation" in DESIGN.md.
fn deserialize_employee_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCount {
        Number(i64),
        Text(String),
    }

    match Option::<RawCount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawCount::Number(value)) => Ok(Some(value)),
        Some(RawCount::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|_| de::Error::custom("number of employees must be a whole number"))
        }
    }
}

/// Form fields a failure can be attributed to, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Email,
    AcceptTerms,
    DateOfBirth,
    CompanyName,
    NumberOfEmployees,
    Password,
    PasswordConfirm,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::AcceptTerms => "acceptTerms",
            Field::DateOfBirth => "dateOfBirth",
            Field::CompanyName => "companyName",
            Field::NumberOfEmployees => "numberOfEmployees",
            Field::Password => "password",
            Field::PasswordConfirm => "passwordConfirm",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordWeakness {
    #[error("Password must be at least 8 characters")]
    TooShort,
    #[error(
        "Password must contain at least one uppercase letter, one lowercase letter, one number and one special character"
    )]
    MissingCharacterClass,
}

/// A user-correctable reason a submission was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignupError {
    #[error("Invalid email")]
    InvalidFormat,
    #[error("You must accept the terms and conditions")]
    MustAccept,
    #[error("You must be at least 1 year old")]
    AgeTooLow,
    #[error("Company name is required")]
    CompanyNameRequired,
    #[error("Number of employees is required")]
    EmployeeCountRequired,
    #[error("{0}")]
    WeakPassword(PasswordWeakness),
    #[error("Password does not match")]
    PasswordMismatch,
}

impl SignupError {
    pub fn code(&self) -> &'static str {
        match self {
            SignupError::InvalidFormat => "invalid_format",
            SignupError::MustAccept => "must_accept",
            SignupError::AgeTooLow => "age_too_low",
            SignupError::CompanyNameRequired => "company_name_required",
            SignupError::EmployeeCountRequired => "employee_count_required",
            SignupError::WeakPassword(_) => "weak_password",
            SignupError::PasswordMismatch => "password_mismatch",
        }
    }
}

/// At most one error per field; the first one recorded sticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, SignupError>);

impl FieldErrors {
    pub fn record(&mut self, field: Field, error: SignupError) {
        self.0.entry(field).or_insert(error);
    }

    #[cfg(test)]
    pub fn get(&self, field: Field) -> Option<SignupError> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }
}

impl Serialize for FieldErrors {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, error) in &self.0 {
            map.serialize_entry(field.as_str(), &error.to_string())?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Accepted,
    Rejected(FieldErrors),
}

#[cfg(test)]
impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationResult::Accepted)
    }
}

/// Runs every rule-set over the submission and collects all field failures.
pub fn validate(submission: &SignupSubmission, now: DateTime<Utc>) -> ValidationResult {
    let mut errors = FieldErrors::default();
    for rule_set in RULE_SETS {
        rule_set.check(submission, now, &mut errors);
    }

    if errors.is_empty() {
        ValidationResult::Accepted
    } else {
        ValidationResult::Rejected(errors)
    }
}
