//! JSON body extractor with validation
//!
//! Malformed bodies and `validator` failures both become a 400 with a
//! `{"message": ...}` body instead of axum's plain-text rejections.

use crate::error::ApiError;
use account_auth_shared::validation::format_validation_errors;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// `Json<T>` that also runs `T::validate()`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| ApiError::Validation(format_validation_errors(&errors)))?;

        Ok(Self(value))
    }
}
