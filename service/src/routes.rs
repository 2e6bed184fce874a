use axum::{
    Router,
    routing::{get, post},
    http::StatusCode,
    extract::{Multipart, State},
    Json,
};
use crate::models::{
    FilePathRequest, HealthResponse, Hl7Response, RawMessageRequest, ServiceInfo,
    SftpStatusResponse, TestParseResponse,
};
use crate::sftp::{RemoteSource, TransportError};
use hl7_parser::{parse_message, Hl7Parser, ParseError, Parser};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{info, debug, warn, error, instrument};

const SERVICE_NAME: &str = "HL7 Parser API";

pub const SAMPLE_MESSAGE: &str = "MSH|^~\\&|TEST|TEST|||20250101120000||ORU^R01|123|P|2.4
PID|1||12345||TEST^PATIENT||19900101|M|||ADR^^CITY^STATE^ZIP^COUNTRY||TEL||
OBX|1|NM|TEST^Test Result^TEST||10.5|mg/dl^^L|5.0-15.0||||F||||||||";

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RemoteSource>,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/parse", post(parse_inline))
        .route("/parse-hl7", post(parse_remote))
        .route("/upload", post(upload_message))
        .route("/test-parse", post(test_parse))
        .route("/test-sftp", post(test_sftp))
        .with_state(state)
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

fn parse_failure(e: ParseError) -> ApiError {
    error!("Parse error: {}", e);
    (StatusCode::BAD_REQUEST, format!("Error processing HL7 file: {}", e))
}

fn transport_failure(e: TransportError) -> ApiError {
    error!("Transport error: {}", e);
    (e.status_code(), format!("Failed to download file from SFTP: {}", e))
}

#[instrument(skip(request), fields(bytes = request.hl7_data.len()))]
async fn parse_inline(Json(request): Json<RawMessageRequest>) -> Result<Json<Hl7Response>, ApiError> {
    info!("Received inline HL7 message");

    let parsed = parse_message(&request.hl7_data).map_err(parse_failure)?;
    Ok(Json(Hl7Response::new(parsed, None)))
}

#[instrument(skip(state, request), fields(file_path = %request.file_path))]
async fn parse_remote(
    State(state): State<AppState>,
    Json(request): Json<FilePathRequest>,
) -> Result<Json<Hl7Response>, ApiError> {
    info!("Fetching HL7 file from {}", state.source.hostname());

    let source = Arc::clone(&state.source);
    let path = request.file_path.clone();
    let text = tokio::task::spawn_blocking(move || source.fetch(&path))
        .await
        .map_err(|e| transport_failure(TransportError::Task(e.to_string())))?
        .map_err(transport_failure)?;

    debug!("Fetched {} bytes, parsing", text.len());
    let parsed = parse_message(&text).map_err(parse_failure)?;

    Ok(Json(Hl7Response::new(parsed, Some(request.file_path))))
}

/// Pulls the `file` part out of an upload form as (filename, bytes)
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        error!("Malformed upload form: {}", e);
        (StatusCode::BAD_REQUEST, format!("Malformed upload form: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        if field.name() != Some("file") {
            debug!("Skipping form field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or("message.hl7").to_string();
        let data = field.bytes().await.map_err(bad_form)?;
        info!("Received HL7 upload '{}' ({} bytes)", filename, data.len());
        return Ok((filename, data.to_vec()));
    }

    Err((StatusCode::BAD_REQUEST, "Upload form has no 'file' field".to_string()))
}

#[instrument(skip(multipart))]
async fn upload_message(mut multipart: Multipart) -> Result<Json<Hl7Response>, ApiError> {
    let (filename, file_data) = read_upload(&mut multipart).await?;
    if file_data.is_empty() {
        error!("Upload '{}' is empty", filename);
        return Err((StatusCode::BAD_REQUEST, format!("Uploaded file '{}' is empty", filename)));
    }

    let parser = Hl7Parser;
    if !parser.supports_extension(&filename) {
        debug!("Unrecognised extension on '{}', parsing anyway", filename);
    }
    if !parser.can_parse(&file_data) {
        warn!("Upload '{}' does not start with an MSH segment", filename);
    }

    let parsed = parser.parse(Box::new(Cursor::new(file_data))).map_err(parse_failure)?;
    Ok(Json(Hl7Response::new(parsed, Some(filename))))
}

async fn test_parse() -> Json<TestParseResponse> {
    let response = match parse_message(SAMPLE_MESSAGE) {
        Ok(parsed) => TestParseResponse::Success {
            message_type: parsed.message_type,
            segments: parsed.total_segments,
            test: "HL7 parsing works".to_string(),
        },
        Err(e) => TestParseResponse::Error {
            message: e.to_string(),
        },
    };
    Json(response)
}

async fn test_sftp(State(state): State<AppState>) -> Json<SftpStatusResponse> {
    let (username, password_set) = state.source.credential_status();
    Json(SftpStatusResponse::new(username, password_set, state.source.hostname()))
}
