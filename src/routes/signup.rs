use axum::{
    Extension, Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::clock::SharedClock;
use crate::config::RateLimitConfig;
use crate::logging::{SanitizedEmail, SecurityEvent, SubmissionId};
use crate::security::json::ValidatedJson;
use crate::security::rate_limit::{RateLimiterState, enforce_rate_limit};
use crate::signup::form::{SignupFormDescriptor, describe};
use crate::signup::{FieldErrors, SignupSubmission, ValidationResult, validate};

pub const DASHBOARD_PATH: &str = "/dashboard";

pub fn router(rate_limit: RateLimitConfig) -> Router {
    Router::new().route(
        "/sign-up",
        get(signup_form).merge(post(submit_signup).layer(middleware::from_fn_with_state(
            RateLimiterState::new(rate_limit),
            enforce_rate_limit,
        ))),
    )
}

pub async fn signup_form(Extension(clock): Extension<SharedClock>) -> Json<SignupFormDescriptor> {
    Json(describe(clock.now()))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SignupResponse {
    #[serde(rename_all = "camelCase")]
    Accepted {
        accepted: bool,
        redirect_to: &'static str,
    },
    Rejected {
        accepted: bool,
        errors: FieldErrors,
    },
}

impl IntoResponse for SignupResponse {
    fn into_response(self) -> Response {
        let status = match &self {
            SignupResponse::Accepted { .. } => StatusCode::OK,
            SignupResponse::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(self)).into_response()
    }
}

#[tracing::instrument(
    name = "submit_signup",
    skip(clock, submission),
    fields(submission_id, email, account_type)
)]
pub async fn submit_signup(
    Extension(clock): Extension<SharedClock>,
    ValidatedJson(submission): ValidatedJson<SignupSubmission>,
) -> SignupResponse {
    let submission_id = SubmissionId::generate();
    let email = SanitizedEmail::new(&submission.email);

    let span = tracing::Span::current();
    span.record("submission_id", tracing::field::display(submission_id));
    span.record("email", tracing::field::display(&email));
    span.record(
        "account_type",
        tracing::field::debug(submission.account_type),
    );

    match validate(&submission, clock.now()) {
        ValidationResult::Accepted => {
            crate::log_security_event!(
                SecurityEvent::SignupAccepted,
                submission_id = %submission_id,
                email = %email,
                "Sign-up submission accepted"
            );

            SignupResponse::Accepted {
                accepted: true,
                redirect_to: DASHBOARD_PATH,
            }
        }
        ValidationResult::Rejected(errors) => {
            let fields = errors
                .fields()
                .map(|field| field.as_str())
                .collect::<Vec<_>>()
                .join(",");

            crate::log_security_event!(
                SecurityEvent::SignupRejected,
                submission_id = %submission_id,
                email = %email,
                failed_count = errors.len(),
                failed_fields = %fields,
                "Sign-up submission rejected"
            );

            SignupResponse::Rejected {
                accepted: false,
                errors,
            }
        }
    }
}
