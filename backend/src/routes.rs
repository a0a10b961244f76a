use std::str::FromStr;

use actix_web::http::StatusCode;
use actix_web::{error, web, HttpRequest, HttpResponse, ResponseError};
use pipeline_types::StageName;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::stages::{InvocationContext, StageError, StageRegistry};
use crate::storage::StorageError;

const REQUEST_ID_HEADERS: [&str; 2] = ["x-request-id", "lambda-runtime-aws-request-id"];

/// Fault body, shaped like the serverless platform's own function errors so
/// the orchestrator can match on `errorType`.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    #[serde(rename = "errorType")]
    error_type: String,
    #[serde(rename = "errorMessage")]
    error_message: String,
}

impl ErrorResponse {
    fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }
}

impl ResponseError for StageError {
    fn status_code(&self) -> StatusCode {
        match self {
            StageError::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            StageError::Storage(StorageError::S3(_)) | StageError::Inference(_) => {
                StatusCode::BAD_GATEWAY
            }
            StageError::Payload(_)
            | StageError::InvalidImageData(_)
            | StageError::EmptyConfidenceVector => StatusCode::BAD_REQUEST,
            StageError::Storage(StorageError::Scratch(_)) | StageError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(ErrorResponse::new(self.error_type(), self.to_string()))
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/invoke/{stage}").route(web::post().to(invoke_stage)))
        .service(web::resource("/health").route(web::get().to(health)));
}

/// Event body limit, with rejections reported in the same shape as stage
/// faults.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            log::warn!("Rejected event body: {}", err);
            let response = HttpResponse::build(err.status_code())
                .json(ErrorResponse::new("InvalidEvent", err.to_string()));
            error::InternalError::from_response(err, response).into()
        })
}

fn request_id(req: &HttpRequest) -> String {
    REQUEST_ID_HEADERS
        .iter()
        .find_map(|name| req.headers().get(*name))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

async fn invoke_stage(
    registry: web::Data<StageRegistry>,
    req: HttpRequest,
    path: web::Path<String>,
    event: web::Json<Value>,
) -> Result<HttpResponse, StageError> {
    let stage_name = path.into_inner();
    let Some(stage) = StageName::from_str(&stage_name)
        .ok()
        .and_then(|name| registry.get(name))
    else {
        log::warn!("Invocation for unknown stage '{}'", stage_name);
        return Ok(HttpResponse::NotFound().json(ErrorResponse::new(
            "UnknownStage",
            format!("no stage named '{}'", stage_name),
        )));
    };

    let ctx = InvocationContext::new(request_id(&req), stage.name());
    match stage.invoke(event.into_inner(), &ctx).await {
        Ok(result) => {
            log::info!("[{}] {} completed", ctx.request_id, ctx.stage);
            Ok(HttpResponse::Ok().json(result))
        }
        Err(e) => {
            log::error!("[{}] {} failed: {}", ctx.request_id, ctx.stage, e);
            Err(e)
        }
    }
}

async fn health(registry: web::Data<StageRegistry>) -> HttpResponse {
    let stages: Vec<String> = registry.names().iter().map(|n| n.to_string()).collect();
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "stages": stages
    }))
}
