use seed::{prelude::*, *};
use shared::form::Submission;
use shared::health::{ApiStatus, HEALTH_TIMEOUT_MS, PROBES};
use shared::{AppConfig, DataEnvelope, ErrorBody, HealthResponse, ListResponse, Record};
use std::rc::Rc;
use thiserror::Error;
use wasm_bindgen::JsValue;

pub const REQUEST_TIMEOUT_MS: u32 = 10_000;
pub const CONFIG_PATH: &str = "/app-config";

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Fetch(String),
    #[error("server answered {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("could not build request: {0}")]
    Browser(String),
}

impl ApiError {
    /// The message the backend put in its error body, if any.
    pub fn backend_message(&self) -> Option<String> {
        match self {
            ApiError::Rejected { message, .. } => message.clone(),
            _ => None,
        }
    }
}

impl From<fetch::FetchError> for ApiError {
    fn from(err: fetch::FetchError) -> Self {
        ApiError::Fetch(format!("{:?}", err))
    }
}

fn browser_error(err: JsValue) -> ApiError {
    ApiError::Browser(format!("{:?}", err))
}

async fn send(request: fetch::Request<'_>) -> Result<fetch::Response, ApiError> {
    let response = request.timeout(REQUEST_TIMEOUT_MS).fetch().await?;
    let status = response.status();
    if status.is_ok() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error);
    Err(ApiError::Rejected {
        status: status.code,
        message,
    })
}

async fn fetch_snapshot(config: &AppConfig) -> Result<ListResponse, ApiError> {
    let response = send(fetch::Request::new(config.endpoint("/api/objects"))).await?;
    Ok(response.json::<ListResponse>().await?)
}

/// Never fails: any error degrades to an empty collection.
pub async fn list_all(config: Rc<AppConfig>) -> Vec<Record> {
    log!("Fetching objects from", config.endpoint("/api/objects"));
    let read = fetch_snapshot(&config).await;
    match &read {
        Ok(body) => log!("Objects loaded:", body.data.len()),
        Err(err) => error!("Error fetching objects:", err.to_string()),
    }
    ListResponse::or_empty(read)
}

pub async fn create(
    config: Rc<AppConfig>,
    submission: Submission<web_sys::File>,
) -> Result<Record, ApiError> {
    let form = web_sys::FormData::new().map_err(browser_error)?;
    form.append_with_str("title", &submission.title)
        .map_err(browser_error)?;
    form.append_with_str("description", &submission.description)
        .map_err(browser_error)?;
    form.append_with_blob_and_filename("image", &submission.image, &submission.image.name())
        .map_err(browser_error)?;

    let response = send(
        fetch::Request::new(config.endpoint("/api/objects"))
            .method(fetch::Method::Post)
            .body(form.into()),
    )
    .await?;
    let created = response.json::<DataEnvelope<Record>>().await?;
    log!("Object created:", created.data.id);
    Ok(created.data)
}

pub async fn delete(config: Rc<AppConfig>, id: String) -> Result<(), ApiError> {
    let id = String::from(js_sys::encode_uri_component(&id));
    send(
        fetch::Request::new(config.endpoint(&format!("/api/objects/{}", id)))
            .method(fetch::Method::Delete),
    )
    .await?;
    Ok(())
}

/// Tries each probe in turn; the first one that answers decides.
pub async fn check_health(config: Rc<AppConfig>) -> ApiStatus {
    for probe in PROBES.iter() {
        let request = fetch::Request::new(config.endpoint(probe.path)).timeout(HEALTH_TIMEOUT_MS);
        match request.fetch().await {
            Ok(response) => {
                let success = response.status().is_ok();
                let body = if probe.requires_ok_status {
                    response.json::<HealthResponse>().await.ok()
                } else {
                    None
                };
                if probe.accepts(success, body.as_ref()) {
                    return ApiStatus::from_probe(Some(probe));
                }
            }
            Err(err) => log!("Health probe failed:", probe.name, err),
        }
    }
    ApiStatus::from_probe(None)
}

/// Configuration baked in at build time, used when the host serves none.
pub fn build_config() -> AppConfig {
    AppConfig::from_overrides(
        option_env!("CATALOG_API_URL"),
        option_env!("CATALOG_IMAGE_ORIGINS"),
    )
    .unwrap_or_else(|err| {
        error!("Invalid build configuration:", err.to_string());
        AppConfig::default()
    })
}

pub async fn load_config() -> AppConfig {
    let served = async {
        let response = send(fetch::Request::new(CONFIG_PATH)).await?;
        Ok::<_, ApiError>(response.json::<AppConfig>().await?)
    };

    match served.await {
        Ok(config) => match config.validate() {
            Ok(()) => config,
            Err(err) => {
                error!("Served configuration rejected:", err.to_string());
                build_config()
            }
        },
        Err(err) => {
            log!("No served configuration, using build defaults:", err.to_string());
            build_config()
        }
    }
}
