//! Turns rejections into the JSON error body clients expect:
//! `{"error": {"status": <code>, "message": <text>}}`

use log::{debug, error};
use serde::Serialize;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::error::TrickleError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

pub fn error_reply(status: StatusCode, message: impl Into<String>) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorResponse {
        error: ErrorBody {
            status: status.as_u16(),
            message: message.into(),
        },
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

pub async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(e) = rejection.find::<TrickleError>() {
        let status = e.status_code();
        if status.is_server_error() {
            // Internal details stay in the log
            error!("Request failed: {}", e);
            let reason = status.canonical_reason().unwrap_or("Internal Server Error");
            return Ok(error_reply(status, reason));
        }
        return Ok(error_reply(status, e.to_string()));
    }

    if rejection.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "Not Found"));
    }
    if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(error_reply(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
    }
    if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(error_reply(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"));
    }
    if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    debug!("Unhandled rejection: {:?}", rejection);
    Ok(error_reply(StatusCode::BAD_REQUEST, "Bad request"))
}
