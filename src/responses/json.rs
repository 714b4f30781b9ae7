use crate::errors::ServerError;
use crate::responses::ResultResp;
use astra::{Body, ResponseBuilder};
use serde::Serialize;

pub fn json_response<T: Serialize>(value: &T) -> ResultResp {
    json_response_with_status(200, value)
}

pub fn json_response_with_status<T: Serialize>(status: u16, value: &T) -> ResultResp {
    let body = serde_json::to_string(value)
        .map_err(|e| ServerError::DbError(format!("serialize response failed: {e}")))?;

    let resp = ResponseBuilder::new()
        .status(status)
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body))
        .map_err(|_| ServerError::InternalError)?;

    Ok(resp)
}
