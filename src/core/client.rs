//! REST client for the inventory backend.
//!
//! Only the three endpoints the bell reads from, plus server-side
//! acknowledgement of system alerts.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Url;
use serde_json::Value;

use super::config::{Settings, UserIdentity};
use super::error::{Error, Result};
use super::model::{
    normalize_records, ApiAlert, Batch, InventoryItem, RawApiAlert, RawBatch, RawInventoryItem,
};

const INVENTORY_PATH: &str = "api/inventory";
const BATCHES_PATH: &str = "api/batches";
const ALERTS_PATH: &str = "api/alerts";

/// Thin wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    user: Option<UserIdentity>,
}

impl ApiClient {
    /// Build a client for `api_base` (e.g. `http://127.0.0.1:5000`).
    pub fn new(api_base: &str, user: Option<UserIdentity>) -> Result<Self> {
        // Trailing slash so relative joins append instead of replacing
        let normalized = format!("{}/", api_base.trim_end_matches('/'));
        let base = Url::parse(&normalized)
            .map_err(|err| Error::InvalidBaseUrl(format!("{api_base}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl(api_base.to_owned()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            user,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.api_base, settings.user.clone())
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn fetch_inventory(&self) -> Result<Vec<InventoryItem>> {
        let records = self.get_array(INVENTORY_PATH).await?;
        Ok(normalize_records::<RawInventoryItem, InventoryItem>(records))
    }

    pub async fn fetch_batches(&self) -> Result<Vec<Batch>> {
        let records = self.get_array(BATCHES_PATH).await?;
        Ok(normalize_records::<RawBatch, Batch>(records))
    }

    pub async fn fetch_alerts(&self) -> Result<Vec<ApiAlert>> {
        let records = self.get_array(ALERTS_PATH).await?;
        Ok(normalize_records::<RawApiAlert, ApiAlert>(records))
    }

    /// Record an acknowledgement of a system alert on the backend.
    pub async fn acknowledge_alert(&self, alert_id: &str) -> Result<()> {
        let mut url = self.endpoint(ALERTS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(self.base.to_string()))?
            .push(alert_id)
            .push("acknowledge");

        log::debug!("POST {url}");
        self.http
            .post(url)
            .headers(self.identity_headers())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| Error::InvalidBaseUrl(format!("{}: {err}", self.base)))
    }

    async fn get_array(&self, path: &'static str) -> Result<Vec<Value>> {
        let url = self.endpoint(path)?;
        log::debug!("GET {url}");

        let payload: Value = self
            .http
            .get(url)
            .headers(self.identity_headers())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match payload {
            Value::Array(records) => Ok(records),
            _ => Err(Error::UnexpectedPayload { endpoint: path }),
        }
    }

    fn identity_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let Some(user) = &self.user else {
            return headers;
        };
        // Values that are not valid header text are left out
        if let Ok(id) = HeaderValue::from_str(&user.id) {
            headers.insert("X-User-Id", id);
        }
        if let Ok(name) = HeaderValue::from_str(&user.name) {
            headers.insert("X-User-Name", name);
        }
        headers
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Loopback backend for client tests, served by an axum fallback router.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::Router;
    use tokio::net::TcpListener;

    /// Canned response for a `"METHOD /path"` route.
    #[derive(Clone)]
    pub struct Route {
        pub status: u16,
        pub body: String,
    }

    impl Route {
        pub fn json(body: &str) -> Self {
            Self {
                status: 200,
                body: body.to_owned(),
            }
        }

        pub fn status(status: u16) -> Self {
            Self {
                status,
                body: String::new(),
            }
        }
    }

    /// A request as the backend saw it.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: Method,
        pub path: String,
        pub headers: HeaderMap,
    }

    #[derive(Clone, Default)]
    struct BackendState {
        routes: Arc<Mutex<HashMap<String, Route>>>,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    /// Running backend. Routes can be swapped while it serves.
    pub struct FakeBackend {
        pub base: String,
        state: BackendState,
    }

    impl FakeBackend {
        pub async fn start(routes: Vec<(&str, Route)>) -> Self {
            let state = BackendState::default();
            state
                .routes
                .lock()
                .unwrap()
                .extend(routes.into_iter().map(|(key, route)| (key.to_owned(), route)));

            let app = Router::new().fallback(respond).with_state(state.clone());
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let base = format!("http://{}", listener.local_addr().expect("local addr"));
            tokio::spawn(async move {
                axum::serve(listener, app).await.expect("serve");
            });

            Self { base, state }
        }

        pub fn set_route(&self, key: &str, route: Route) {
            self.state
                .routes
                .lock()
                .unwrap()
                .insert(key.to_owned(), route);
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.state.requests.lock().unwrap().clone()
        }

        /// `"METHOD /path"` of every request, in arrival order.
        pub fn request_lines(&self) -> Vec<String> {
            self.requests()
                .iter()
                .map(|request| format!("{} {}", request.method, request.path))
                .collect()
        }
    }

    async fn respond(
        State(state): State<BackendState>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        let path = uri.path().to_owned();
        let key = format!("{method} {path}");
        state.requests.lock().unwrap().push(RecordedRequest {
            method,
            path,
            headers,
        });

        let route = state
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Route::status(404));
        let status =
            StatusCode::from_u16(route.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, "application/json")], route.body)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeBackend, Route};
    use super::*;

    #[test]
    fn test_invalid_base_rejected() {
        assert!(matches!(
            ApiClient::new("not a url", None),
            Err(Error::InvalidBaseUrl(_))
        ));
        assert!(ApiClient::new("http://127.0.0.1:5000/", None).is_ok());
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::new("http://example.com/inventory-app", None).unwrap();
        assert_eq!(
            client.endpoint(ALERTS_PATH).unwrap().as_str(),
            "http://example.com/inventory-app/api/alerts"
        );
    }

    #[tokio::test]
    async fn test_fetch_inventory_normalizes() {
        let backend = FakeBackend::start(vec![(
            "GET /api/inventory",
            Route::json(
                r#"[
                    {"name":"Gauze","branch":"Main","quantity":2,"reorder_level":5},
                    {"name":"Tape"},
                    7
                ]"#,
            ),
        )])
        .await;
        let client = ApiClient::new(&backend.base, None).unwrap();

        let items = client.fetch_inventory().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name.as_deref(), Some("Gauze"));
        assert_eq!(items[0].reorder_level, 5.0);
        assert_eq!(items[1].quantity, 0.0);
    }

    #[tokio::test]
    async fn test_non_array_payload_is_error() {
        let backend =
            FakeBackend::start(vec![("GET /api/batches", Route::json(r#"{"error":"db down"}"#))])
                .await;
        let client = ApiClient::new(&backend.base, None).unwrap();

        assert!(matches!(
            client.fetch_batches().await,
            Err(Error::UnexpectedPayload { endpoint: BATCHES_PATH })
        ));
    }

    #[tokio::test]
    async fn test_error_status_is_error() {
        let backend = FakeBackend::start(vec![("GET /api/alerts", Route::status(500))]).await;
        let client = ApiClient::new(&backend.base, None).unwrap();

        assert!(matches!(client.fetch_alerts().await, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_acknowledge_posts_encoded_id_with_identity() {
        let backend = FakeBackend::start(vec![(
            "POST /api/alerts/branch-low-Main%20Branch/acknowledge",
            Route::json(r#"{"status":"ok"}"#),
        )])
        .await;
        let user = UserIdentity {
            id: "u-17".into(),
            name: "Branch Manager".into(),
        };
        let client = ApiClient::new(&backend.base, Some(user)).unwrap();

        client.acknowledge_alert("branch-low-Main Branch").await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method.as_str(), "POST");
        let header = |name: &str| requests[0].headers.get(name).and_then(|v| v.to_str().ok());
        assert_eq!(header("x-user-id"), Some("u-17"));
        assert_eq!(header("x-user-name"), Some("Branch Manager"));
    }

    #[tokio::test]
    async fn test_no_identity_headers_without_user() {
        let backend = FakeBackend::start(vec![("GET /api/alerts", Route::json("[]"))]).await;
        let client = ApiClient::new(&backend.base, None).unwrap();

        assert!(client.fetch_alerts().await.unwrap().is_empty());
        let requests = backend.requests();
        assert_eq!(backend.request_lines(), vec!["GET /api/alerts"]);
        assert!(requests[0].headers.get("x-user-id").is_none());
    }
}
