use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::AccountType;
use super::rules::{MIN_PASSWORD_CHARS, shift_years};

/// Oldest birth year the date picker offers, counted back from today.
const DATE_OF_BIRTH_SPAN_YEARS: i32 = 120;

/// What a renderer needs to draw an empty sign-up form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupFormDescriptor {
    pub defaults: SignupDefaults,
    pub account_types: [AccountType; 2],
    pub earliest_date_of_birth: NaiveDate,
    pub min_password_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupDefaults {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub account_type: AccountType,
    pub company_name: String,
}

impl Default for SignupDefaults {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            password_confirm: String::new(),
            account_type: AccountType::Personal,
            company_name: String::new(),
        }
    }
}

pub fn describe(now: DateTime<Utc>) -> SignupFormDescriptor {
    SignupFormDescriptor {
        defaults: SignupDefaults::default(),
        account_types: [AccountType::Personal, AccountType::Company],
        earliest_date_of_birth: shift_years(now.date_naive(), -DATE_OF_BIRTH_SPAN_YEARS),
        min_password_length: MIN_PASSWORD_CHARS,
    }
}
