use actix_files::{Files, NamedFile};
use actix_web::{get, middleware, web, App, HttpResponse, HttpServer, Responder};
use shared::config::ConfigError;
use shared::AppConfig;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "127.0.0.1:8000";
const DEFAULT_ASSETS: &str = "./client";

#[derive(Debug, Error)]
enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid CATALOG_BIND {0:?}")]
    Bind(String),
    #[error("assets directory {0:?} has no index.html")]
    Assets(PathBuf),
}

/// Host settings read once at startup.
#[derive(Debug, Clone)]
struct HostConfig {
    bind: SocketAddr,
    assets: PathBuf,
    app: AppConfig,
}

impl HostConfig {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HostError> {
        let app = AppConfig::from_overrides(
            lookup("CATALOG_API_URL").as_deref(),
            lookup("CATALOG_IMAGE_ORIGINS").as_deref(),
        )?;

        let bind = lookup("CATALOG_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind.parse().map_err(|_| HostError::Bind(bind))?;

        let assets = PathBuf::from(lookup("CATALOG_ASSETS").unwrap_or_else(|| DEFAULT_ASSETS.to_string()));

        Ok(HostConfig { bind, assets, app })
    }

    fn from_env() -> Result<Self, HostError> {
        HostConfig::from_lookup(|key| env::var(key).ok())
    }

    fn index(&self) -> PathBuf {
        self.assets.join("index.html")
    }
}

// ---- Client configuration ("/app-config") ----

#[get("/app-config")]
async fn app_config(host: web::Data<HostConfig>) -> impl Responder {
    HttpResponse::Ok().json(&host.app)
}

async fn index(host: web::Data<HostConfig>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open(host.index())?)
}

fn configure(host: HostConfig) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let public = host.assets.join("public");
        let pkg = host.assets.join("pkg");
        cfg.app_data(web::Data::new(host))
            .service(app_config)
            .service(Files::new("/public", public))
            .service(Files::new("/pkg", pkg))
            .default_service(web::route().to(index));
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let host = match HostConfig::from_env() {
        Ok(host) => host,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };
    if !host.index().is_file() {
        let e = HostError::Assets(host.assets.clone());
        error!(error = %e, "cannot serve the client");
        return Err(std::io::Error::new(std::io::ErrorKind::NotFound, e));
    }

    info!(bind = %host.bind, assets = %host.assets.display(), api_url = %host.app.api_url, "serving object catalog client");

    let bind = host.bind;
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(configure(host.clone()))
    })
    .bind(bind)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use std::collections::HashMap;
    use std::fs;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn assets_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("catalog-host-{}-{}", name, std::process::id()));
        fs::create_dir_all(dir.join("pkg")).unwrap();
        fs::create_dir_all(dir.join("public")).unwrap();
        fs::write(dir.join("index.html"), "<div id=\"app\"></div>").unwrap();
        fs::write(dir.join("pkg").join("client.js"), "export default 1;").unwrap();
        dir
    }

    fn host(assets: PathBuf) -> HostConfig {
        HostConfig {
            bind: DEFAULT_BIND.parse().unwrap(),
            assets,
            app: AppConfig::default(),
        }
    }

    #[core::prelude::v1::test]
    fn defaults_without_environment() {
        let host = HostConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(host.bind, DEFAULT_BIND.parse::<SocketAddr>().unwrap());
        assert_eq!(host.assets, PathBuf::from(DEFAULT_ASSETS));
        assert_eq!(host.app, AppConfig::default());
    }

    #[core::prelude::v1::test]
    fn environment_overrides() {
        let host = HostConfig::from_lookup(lookup(&[
            ("CATALOG_API_URL", "https://object-manager-backend.vercel.app/"),
            ("CATALOG_BIND", "0.0.0.0:9000"),
            ("CATALOG_ASSETS", "/srv/catalog"),
        ]))
        .unwrap();

        assert_eq!(host.app.api_url, "https://object-manager-backend.vercel.app/");
        assert_eq!(host.bind.port(), 9000);
        assert_eq!(host.index(), PathBuf::from("/srv/catalog/index.html"));
    }

    #[core::prelude::v1::test]
    fn invalid_environment_is_rejected() {
        assert!(matches!(
            HostConfig::from_lookup(lookup(&[("CATALOG_BIND", "nowhere")])),
            Err(HostError::Bind(_))
        ));
        assert!(matches!(
            HostConfig::from_lookup(lookup(&[("CATALOG_API_URL", "ftp://x")])),
            Err(HostError::Config(_))
        ));
    }

    #[actix_rt::test]
    async fn serves_client_configuration() {
        let app = test::init_service(App::new().configure(configure(host(assets_dir("config"))))).await;

        let req = test::TestRequest::get().uri("/app-config").to_request();
        let config: AppConfig = test::call_and_read_body_json(&app, req).await;

        assert_eq!(config, AppConfig::default());
    }

    #[actix_rt::test]
    async fn unknown_paths_fall_back_to_index() {
        let app = test::init_service(App::new().configure(configure(host(assets_dir("index"))))).await;

        let req = test::TestRequest::get().uri("/objects/42").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        assert_eq!(body, "<div id=\"app\"></div>");
    }

    #[actix_rt::test]
    async fn serves_wasm_bundle() {
        let app = test::init_service(App::new().configure(configure(host(assets_dir("pkg"))))).await;

        let req = test::TestRequest::get().uri("/pkg/client.js").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
