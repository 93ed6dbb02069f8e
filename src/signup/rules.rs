use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::{AccountType, Field, FieldErrors, PasswordWeakness, SignupError, SignupSubmission};

pub(crate) type RuleResult = Result<(), SignupError>;

pub(crate) const MIN_PASSWORD_CHARS: usize = 8;
const MAX_EMAIL_LEN: usize = 254;

/// An independently specified group of constraints over a whole submission.
pub(crate) trait RuleSet: Sync {
    fn name(&self) -> &'static str;

    fn check(&self, submission: &SignupSubmission, now: DateTime<Utc>, errors: &mut FieldErrors);
}

pub(crate) struct BaseRules;
pub(crate) struct AccountTypeRules;
pub(crate) struct PasswordRules;

pub(crate) const RULE_SETS: [&dyn RuleSet; 3] = [&BaseRules, &AccountTypeRules, &PasswordRules];

fn apply(rule_set: &dyn RuleSet, field: Field, outcome: RuleResult, errors: &mut FieldErrors) {
    if let Err(error) = outcome {
        tracing::debug!(
            rule_set = rule_set.name(),
            field = %field,
            code = error.code(),
            "Sign-up rule failed"
        );
        errors.record(field, error);
    }
}

impl RuleSet for BaseRules {
    fn name(&self) -> &'static str {
        "base"
    }

    fn check(&self, submission: &SignupSubmission, now: DateTime<Utc>, errors: &mut FieldErrors) {
        apply(self, Field::Email, ensure_valid_email(&submission.email), errors);
        apply(
            self,
            Field::AcceptTerms,
            ensure_terms_accepted(submission.accept_terms),
            errors,
        );
        apply(
            self,
            Field::DateOfBirth,
            ensure_old_enough(submission.date_of_birth, now),
            errors,
        );
    }
}

impl RuleSet for AccountTypeRules {
    fn name(&self) -> &'static str {
        "account_type"
    }

    fn check(&self, submission: &SignupSubmission, _now: DateTime<Utc>, errors: &mut FieldErrors) {
        apply(
            self,
            Field::CompanyName,
            ensure_company_name(submission.account_type, submission.company_name.as_deref()),
            errors,
        );
        apply(
            self,
            Field::NumberOfEmployees,
            ensure_employee_count(submission.account_type, submission.number_of_employees),
            errors,
        );
    }
}

impl RuleSet for PasswordRules {
    fn name(&self) -> &'static str {
        "password"
    }

    fn check(&self, submission: &SignupSubmission, _now: DateTime<Utc>, errors: &mut FieldErrors) {
        apply(
            self,
            Field::Password,
            ensure_strong_password(&submission.password),
            errors,
        );
        apply(
            self,
            Field::PasswordConfirm,
            ensure_strong_password(&submission.password_confirm),
            errors,
        );
        apply(
            self,
            Field::PasswordConfirm,
            ensure_passwords_match(&submission.password, &submission.password_confirm),
            errors,
        );
    }
}

pub(crate) fn ensure_valid_email(value: &str) -> RuleResult {
    if value.is_empty() || value.len() > MAX_EMAIL_LEN {
        return Err(SignupError::InvalidFormat);
    }

    let mut parts = value.split('@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return Err(SignupError::InvalidFormat);
    };
    if parts.next().is_some() {
        return Err(SignupError::InvalidFormat);
    }

    if is_valid_local_part(local) && is_valid_domain(domain) {
        Ok(())
    } else {
        Err(SignupError::InvalidFormat)
    }
}

fn is_valid_local_part(local: &str) -> bool {
    let allowed = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '+' | '-' | '.'));

    !local.is_empty()
        && allowed
        && !local.starts_with('.')
        && !local.ends_with(['.', '\''])
        && !local.contains("..")
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    labels_ok && tld_ok
}

pub(crate) fn ensure_terms_accepted(accepted: bool) -> RuleResult {
    if accepted {
        Ok(())
    } else {
        Err(SignupError::MustAccept)
    }
}

/// Rejects birth dates on or after one calendar year from today.
pub(crate) fn ensure_old_enough(date_of_birth: NaiveDate, now: DateTime<Utc>) -> RuleResult {
    let cutoff = shift_years(now.date_naive(), 1);
    if date_of_birth >= cutoff {
        Err(SignupError::AgeTooLow)
    } else {
        Ok(())
    }
}

/// Calendar year arithmetic where 29 February rolls over to 1 March.
pub(crate) fn shift_years(date: NaiveDate, years: i32) -> NaiveDate {
    let Some(year) = date.year().checked_add(years) else {
        return if years < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        };
    };

    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(if years < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        })
}

pub(crate) fn ensure_company_name(
    account_type: AccountType,
    company_name: Option<&str>,
) -> RuleResult {
    if account_type == AccountType::Company && company_name.is_none_or(str::is_empty) {
        Err(SignupError::CompanyNameRequired)
    } else {
        Ok(())
    }
}

/// A present count below one fails even for personal accounts.
pub(crate) fn ensure_employee_count(account_type: AccountType, count: Option<i64>) -> RuleResult {
    let missing_for_company =
        account_type == AccountType::Company && matches!(count, None | Some(0));
    let below_minimum = count.is_some_and(|count| count < 1);

    if missing_for_company || below_minimum {
        Err(SignupError::EmployeeCountRequired)
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_strong_password(password: &str) -> RuleResult {
    let length = password.chars().count();
    if length < MIN_PASSWORD_CHARS {
        tracing::debug!(
            length = length,
            "Password validation failed: too short (minimum 8 characters)"
        );
        return Err(SignupError::WeakPassword(PasswordWeakness::TooShort));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if has_upper && has_lower && has_digit && has_symbol {
        Ok(())
    } else {
        tracing::debug!(
            has_uppercase = has_upper,
            has_lowercase = has_lower,
            has_digit = has_digit,
            has_symbol = has_symbol,
            "Password validation failed: missing required character types"
        );
        Err(SignupError::WeakPassword(
            PasswordWeakness::MissingCharacterClass,
        ))
    }
}

pub(crate) fn ensure_passwords_match(password: &str, confirmation: &str) -> RuleResult {
    if password == confirmation {
        Ok(())
    } else {
        Err(SignupError::PasswordMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signup::tests::{now, valid_submission};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_accepts_common_emails() {
        for email in [
            "a@b.com",
            "first.last@example.co.uk",
            "o'neil+tag@mail-server.org",
            "user_1@sub.domain.io",
        ] {
            assert!(ensure_valid_email(email).is_ok(), "{email} should pass");
        }
    }

    #[test]
    fn test_rejects_malformed_emails() {
        for email in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@@example.com",
            "a@b@c.com",
            ".user@example.com",
            "user.@example.com",
            "us..er@example.com",
            "user@localhost",
            "user@example.c",
            "user@example.123",
            "user@-example.com",
            "user@exa mple.com",
            "us er@example.com",
            "user@example..com",
        ] {
            assert_eq!(
                ensure_valid_email(email),
                Err(SignupError::InvalidFormat),
                "{email} should fail"
            );
        }
    }

    #[test]
    fn test_rejects_overlong_email() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert_eq!(ensure_valid_email(&email), Err(SignupError::InvalidFormat));
    }

    #[test]
    fn test_terms_must_be_accepted() {
        assert!(ensure_terms_accepted(true).is_ok());
        assert_eq!(ensure_terms_accepted(false), Err(SignupError::MustAccept));
    }

    #[test]
    fn test_shift_years_rolls_leap_day_forward() {
        assert_eq!(shift_years(date(2024, 2, 29), 1), date(2025, 3, 1));
        assert_eq!(shift_years(date(2024, 2, 29), -120), date(1904, 2, 29));
        assert_eq!(shift_years(date(2024, 2, 29), -121), date(1903, 3, 1));
        assert_eq!(shift_years(date(2024, 6, 15), 1), date(2025, 6, 15));
    }

    #[test]
    fn test_old_enough_cutoff_on_leap_day() {
        let leap_now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 2, 29, 8, 0, 0).unwrap();
        assert!(ensure_old_enough(date(2025, 2, 28), leap_now).is_ok());
        assert_eq!(
            ensure_old_enough(date(2025, 3, 1), leap_now),
            Err(SignupError::AgeTooLow)
        );
    }

    #[test]
    fn test_old_enough_accepts_past_and_near_future_dates() {
        assert!(ensure_old_enough(date(1990, 1, 1), now()).is_ok());
        assert!(ensure_old_enough(date(2024, 12, 31), now()).is_ok());
        assert_eq!(
            ensure_old_enough(date(2026, 1, 1), now()),
            Err(SignupError::AgeTooLow)
        );
    }

    #[test]
    fn test_company_name_required_only_for_company() {
        assert!(ensure_company_name(AccountType::Personal, None).is_ok());
        assert!(ensure_company_name(AccountType::Company, Some("Acme")).is_ok());
        assert_eq!(
            ensure_company_name(AccountType::Company, None),
            Err(SignupError::CompanyNameRequired)
        );
        assert_eq!(
            ensure_company_name(AccountType::Company, Some("")),
            Err(SignupError::CompanyNameRequired)
        );
    }

    #[test]
    fn test_employee_count_rules() {
        assert!(ensure_employee_count(AccountType::Personal, None).is_ok());
        assert!(ensure_employee_count(AccountType::Personal, Some(3)).is_ok());
        assert!(ensure_employee_count(AccountType::Company, Some(1)).is_ok());
        assert_eq!(
            ensure_employee_count(AccountType::Company, None),
            Err(SignupError::EmployeeCountRequired)
        );
        assert_eq!(
            ensure_employee_count(AccountType::Company, Some(0)),
            Err(SignupError::EmployeeCountRequired)
        );
        assert_eq!(
            ensure_employee_count(AccountType::Company, Some(-4)),
            Err(SignupError::EmployeeCountRequired)
        );
    }

    #[test]
    fn test_employee_count_below_one_fails_for_personal_accounts() {
        assert_eq!(
            ensure_employee_count(AccountType::Personal, Some(0)),
            Err(SignupError::EmployeeCountRequired)
        );
    }

    #[test]
    fn test_password_strength() {
        assert!(ensure_strong_password("Abcdef1!").is_ok());
        assert!(ensure_strong_password("Ünïcode9A").is_ok());
        assert_eq!(
            ensure_strong_password("Ab1!"),
            Err(SignupError::WeakPassword(PasswordWeakness::TooShort))
        );
        for weak in ["abcdefg1!", "ABCDEFG1!", "Abcdefgh!", "Abcdefgh1"] {
            assert_eq!(
                ensure_strong_password(weak),
                Err(SignupError::WeakPassword(
                    PasswordWeakness::MissingCharacterClass
                )),
                "{weak} should be weak"
            );
        }
    }

    #[test]
    fn test_password_length_counts_characters() {
        assert_eq!(
            ensure_strong_password("Aé1!éé"),
            Err(SignupError::WeakPassword(PasswordWeakness::TooShort))
        );
    }

    #[test]
    fn test_passwords_must_match_exactly() {
        assert!(ensure_passwords_match("Abcdef1!", "Abcdef1!").is_ok());
        assert_eq!(
            ensure_passwords_match("Abcdef1!", "abcdef1!"),
            Err(SignupError::PasswordMismatch)
        );
    }

    #[test]
    fn test_rule_sets_are_independent() {
        let submission = SignupSubmission {
            email: "broken".to_string(),
            ..valid_submission()
        };

        let mut base = FieldErrors::default();
        BaseRules.check(&submission, now(), &mut base);
        assert_eq!(base.get(Field::Email), Some(SignupError::InvalidFormat));

        let mut account = FieldErrors::default();
        AccountTypeRules.check(&submission, now(), &mut account);
        assert!(account.is_empty());

        let mut password = FieldErrors::default();
        PasswordRules.check(&submission, now(), &mut password);
        assert!(password.is_empty());
    }
}
