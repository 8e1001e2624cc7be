use anyhow::anyhow;
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use progres_core::AppError;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

fn format_errors(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().filter_map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .or_else(|| Some(format!("{} is invalid", field)))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn body_error(error_msg: &str) -> Option<AppError> {
    if error_msg.contains("missing field") {
        let field = error_msg
            .split("missing field `")
            .nth(1)
            .and_then(|s| s.split('`').next())
            .unwrap_or("unknown");
        return Some(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("{} is required", field),
        ));
    }

    if error_msg.contains("invalid type") {
        return Some(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("Invalid field type in request"),
        ));
    }

    None
}

fn validate<T: Validate>(value: &T) -> Result<(), AppError> {
    value.validate().map_err(|errors| {
        AppError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            anyhow!("{}", format_errors(&errors)),
        )
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                if let Some(error) = body_error(&rejection.body_text()) {
                    return error;
                }

                if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
                    return AppError::new(
                        StatusCode::BAD_REQUEST,
                        anyhow!("Missing 'Content-Type: application/json' header"),
                    );
                }

                AppError::new(StatusCode::BAD_REQUEST, anyhow!("Invalid request body"))
            })?;

        validate(&value)?;

        Ok(ValidatedJson(value))
    }
}

/// Like [`ValidatedJson`], but an empty body yields `T::default()`.
///
/// The content type is not checked so that clients may post nothing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for OptionalValidatedJson<T>
where
    T: DeserializeOwned + Validate + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::new(StatusCode::BAD_REQUEST, anyhow!("Invalid request body")))?;

        let value = if bytes.iter().all(u8::is_ascii_whitespace) {
            T::default()
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                body_error(&e.to_string()).unwrap_or_else(|| {
                    AppError::new(StatusCode::BAD_REQUEST, anyhow!("Invalid request body"))
                })
            })?
        };

        validate(&value)?;

        Ok(OptionalValidatedJson(value))
    }
}
