use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::app_state::AppState;
use crate::utils::error::AppError;

/// JSON body that has passed its `validator` rules. Malformed bodies and
/// failed rules both surface as [`AppError::ValidationError`].
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| AppError::ValidationError(first_message(&errors)))?;

        Ok(Self(value))
    }
}

/// Message of the first failing rule, fields taken in name order.
pub fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    fields
        .into_iter()
        .find_map(|(field, field_errors)| {
            field_errors.first().map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .unwrap_or_else(|| "Validation failed".to_string())
}

/// Parses a path segment as a positive row id.
pub fn parse_id(raw: &str, message: &str) -> Result<i32, AppError> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::ValidationError(message.to_string())),
    }
}

/// An identity from the allow-list. The authenticating proxy in front of the
/// service sets the identity header; this only checks it against the list.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let admin = &state.config.admin;

        let email = parts
            .headers
            .get(admin.identity_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::AuthError("Sign in required".to_string()))?;

        if !admin.is_admin(email) {
            return Err(AppError::Forbidden(
                "This account may not access the admin area".to_string(),
            ));
        }

        Ok(Self {
            email: email.to_lowercase(),
        })
    }
}
