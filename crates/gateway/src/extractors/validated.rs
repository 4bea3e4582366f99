use axum::{
    async_trait,
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRequest, Request,
    },
    Form, Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use common::AppError;

/// JSON body, validated.
pub struct ValidatedJson<T>(pub T);

/// `application/x-www-form-urlencoded` body, validated.
pub struct ValidatedForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| malformed(e.body_text()))?;

        checked(value).map(ValidatedJson)
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Form<T>: FromRequest<S, Rejection = FormRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|e| malformed(e.body_text()))?;

        checked(value).map(ValidatedForm)
    }
}

fn malformed(detail: String) -> AppError {
    tracing::debug!(%detail, "Rejected malformed request body");
    AppError::validation(detail)
}

fn checked<T: Validate>(value: T) -> Result<T, AppError> {
    value
        .validate()
        .map_err(|errors| AppError::validation(first_message(&errors)))?;
    Ok(value)
}

/// Message of the first failed rule, so clients get one actionable line.
fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .find_map(|field| field.first())
        .and_then(|error| error.message.as_ref())
        .map(|msg| msg.to_string())
        .unwrap_or_else(|| "Validation failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Token is required"))]
        token: String,
    }

    #[test]
    fn test_failed_rule_message_is_reported() {
        let err = checked(Sample {
            token: String::new(),
        })
        .err()
        .unwrap();
        assert_eq!(err.user_message(), "Token is required");
    }

    #[test]
    fn test_valid_payload_passes_through() {
        let sample = checked(Sample {
            token: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(sample.token, "abc");
    }
}
