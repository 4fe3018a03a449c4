use axum::extract::Query;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::clients::qr::encode_png;
use crate::utils::error::AppError;

#[derive(Deserialize)]
pub struct QrQuery {
    data: Option<String>,
}

pub async fn qr_code(Query(query): Query<QrQuery>) -> Result<Response, AppError> {
    let data = query
        .data
        .filter(|data| !data.is_empty())
        .ok_or_else(|| AppError::ValidationError("Missing data parameter".to_string()))?;

    let png = encode_png(&data).map_err(|e| AppError::ValidationError(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CONTENT_DISPOSITION, "inline; filename=\"qr.png\""),
        ],
        png,
    )
        .into_response())
}
