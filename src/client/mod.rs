//! Cliente HTTP tipado para la API de rutas
//!
//! Cada llamada lleva el token de la sesión. Una llamada fallida produce
//! exactamente una notificación y nunca se reintenta; un resultado vacío de
//! la optimización es neutro y no notifica nada.

pub mod errors;
pub mod session;

pub use errors::{BackendError, ClientError};
pub use session::{SessionSnapshot, SessionStore};

use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::dto::driver_dto::{DriverLocationUpdate, LocationAck};
use crate::dto::route_dto::{OptimizeRouteRequest, OptimizeRouteResponse};
use crate::models::{DriverLocation, RouteProgress};

/// Destino de las notificaciones de error (toast, log, ...)
pub trait ErrorNotifier: Send + Sync {
    fn notify(&self, error: &ClientError);
}

/// Notificador que solo escribe en el log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ErrorNotifier for LogNotifier {
    fn notify(&self, error: &ClientError) {
        match error.backend_message() {
            Some(detail) => log::warn!("⚠️ {} ({})", error.user_message(), detail),
            None => log::warn!("⚠️ {}", error.user_message()),
        }
    }
}

/// Resultado de una optimización
#[derive(Debug, Clone)]
pub enum OptimizationOutcome {
    Planned(OptimizeRouteResponse),
    NothingToPlan { message: String },
}

impl From<OptimizeRouteResponse> for OptimizationOutcome {
    fn from(response: OptimizeRouteResponse) -> Self {
        if response.routes.is_empty() {
            OptimizationOutcome::NothingToPlan {
                message: response.message,
            }
        } else {
            OptimizationOutcome::Planned(response)
        }
    }
}

pub struct RouteApiClient {
    http: Client,
    base_url: String,
    session: SessionStore,
    notifier: Arc<dyn ErrorNotifier>,
}

impl RouteApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore, notifier: Arc<dyn ErrorNotifier>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_http_client(http, base_url, session, notifier)
    }

    pub fn with_http_client(
        http: Client,
        base_url: impl Into<String>,
        session: SessionStore,
        notifier: Arc<dyn ErrorNotifier>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            notifier,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Iniciar sesión y guardar el token
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = self.http.post(self.url("/api/auth/login")).json(&body);
        let response: LoginResponse = self.execute(request).await?;
        self.session.set_token(response.token.clone());
        Ok(response)
    }

    /// Forma simple: `POST /api/routes/optimize?location_id=`
    pub async fn optimize_routes_for_location(&self, location_id: &str) -> Result<OptimizationOutcome, ClientError> {
        let url = format!(
            "{}?location_id={}",
            self.url("/api/routes/optimize"),
            urlencoding::encode(location_id)
        );
        let response: OptimizeRouteResponse = self.execute(self.http.post(url)).await?;
        Ok(response.into())
    }

    /// Forma completa con cuerpo JSON
    pub async fn optimize_routes(&self, request: &OptimizeRouteRequest) -> Result<OptimizationOutcome, ClientError> {
        let builder = self.http.post(self.url("/api/routes/optimize")).json(request);
        let response: OptimizeRouteResponse = self.execute(builder).await?;
        Ok(response.into())
    }

    pub async fn get_route_progress(&self, route_id: &str) -> Result<RouteProgress, ClientError> {
        let path = format!("/api/routes/{}/progress", urlencoding::encode(route_id));
        self.execute(self.request(Method::GET, &path)).await
    }

    pub async fn update_driver_location(
        &self,
        driver_id: &str,
        update: &DriverLocationUpdate,
    ) -> Result<LocationAck, ClientError> {
        let path = format!("/api/drivers/{}/location", urlencoding::encode(driver_id));
        self.execute(self.request(Method::POST, &path).json(update)).await
    }

    pub async fn get_driver_location(&self, driver_id: &str) -> Result<DriverLocation, ClientError> {
        let path = format!("/api/drivers/{}/location", urlencoding::encode(driver_id));
        self.execute(self.request(Method::GET, &path)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Enviar, decodificar y notificar una sola vez si falla
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let result = self.send(request).await;
        if let Err(error) = &result {
            self.notifier.notify(error);
        }
        result
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let seen = self.session.snapshot();
        let request = match &seen.token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = ClientError::from_response(status, &body);
            if matches!(error, ClientError::Unauthorized(_)) {
                self.session.invalidate(&seen);
            }
            return Err(error);
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            status: status.as_u16(),
            reason: e.to_string(),
        })
    }
}
