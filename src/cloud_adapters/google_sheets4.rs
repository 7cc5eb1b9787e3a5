use crate::cloud_adapters::auth::SPREADSHEETS_SCOPE;
use crate::cloud_adapters::range::qualified;
use crate::cloud_adapters::{SpreadsheetError, TabularStore};
use crate::core::format::Row;
use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::Method;
use hyper::Request;
use hyper::StatusCode;
use hyper::body::Bytes;
use hyper::header;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};
use yup_oauth2::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};

const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/";

/// Asynchronous token retrieval interface used by the adapter.
pub trait TokenProvider: Send + Sync + 'static {
    fn token<'a>(
        &'a self,
        scopes: &'a [&str],
    ) -> Pin<Box<dyn Future<Output = Result<String, SpreadsheetError>> + Send + 'a>>;
}

impl TokenProvider for yup_oauth2::authenticator::DefaultAuthenticator {
    fn token<'a>(
        &'a self,
        scopes: &'a [&str],
    ) -> Pin<Box<dyn Future<Output = Result<String, SpreadsheetError>> + Send + 'a>> {
        Box::pin(async move {
            self.token(scopes)
                .await
                .map_err(|e| SpreadsheetError::Unauthorized(e.to_string()))?
                .token()
                .map(|t| t.to_string())
                .ok_or_else(|| SpreadsheetError::Unauthorized("missing token".into()))
        })
    }
}

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Adapter backed by the Google Sheets REST API.
///
/// Calls are blocking; each one drives the adapter's own tokio runtime.
pub struct GoogleSheets4Adapter {
    client: HttpsClient,
    auth: Box<dyn TokenProvider>,
    rt: tokio::runtime::Runtime,
    sheets_base_url: String,
}

/// Map a non-success HTTP status to an error, keeping the API's message.
fn status_error(status: StatusCode, body: &Value, spreadsheet_id: &str) -> SpreadsheetError {
    let message = body["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());
    match status.as_u16() {
        401 | 403 => SpreadsheetError::Unauthorized(message),
        404 => SpreadsheetError::SpreadsheetNotFound(spreadsheet_id.to_string()),
        429 | 500..=599 => SpreadsheetError::Transient(message),
        _ => SpreadsheetError::Permanent(message),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn rows_from_values(body: &Value) -> Vec<Row> {
    body["values"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(cell_text).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

impl GoogleSheets4Adapter {
    /// Create a new adapter using the default API endpoint.
    pub fn new<A: TokenProvider>(auth: A) -> Result<Self, SpreadsheetError> {
        Self::with_base_url(auth, DEFAULT_SHEETS_BASE_URL)
    }

    /// Create an adapter with a custom Sheets base URL.
    pub fn with_base_url<A: TokenProvider>(
        auth: A,
        sheets_base_url: impl Into<String>,
    ) -> Result<Self, SpreadsheetError> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| SpreadsheetError::Permanent(format!("tokio runtime: {e}")))?;
        let https = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| SpreadsheetError::Permanent(format!("native roots: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(https);
        Ok(Self {
            client,
            auth: Box::new(auth),
            rt,
            sheets_base_url: sheets_base_url.into(),
        })
    }

    fn values_url(&self, spreadsheet_id: &str, sheet: &str, range: &str) -> String {
        format!(
            "{}spreadsheets/{}/values/{}",
            self.sheets_base_url,
            spreadsheet_id,
            urlencoding::encode(&qualified(sheet, range))
        )
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        spreadsheet_id: &str,
        body: Option<Value>,
    ) -> Result<Value, SpreadsheetError> {
        let token = self.auth.token(&[SPREADSHEETS_SCOPE]).await?;
        let mut builder = Request::builder()
            .method(method)
            .uri(url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        let payload = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Full::new(Bytes::from(json.to_string()))
            }
            None => Full::new(Bytes::new()),
        };
        let req = builder
            .body(payload)
            .map_err(|e| SpreadsheetError::Permanent(e.to_string()))?;
        let res = self
            .client
            .request(req)
            .await
            .map_err(|e| SpreadsheetError::Transient(e.to_string()))?;
        let status = res.status();
        let bytes = res
            .into_body()
            .collect()
            .await
            .map_err(|e| SpreadsheetError::Transient(e.to_string()))?
            .to_bytes();
        if bytes.is_empty() {
            return if status.is_success() {
                Ok(Value::Null)
            } else {
                Err(status_error(status, &Value::Null, spreadsheet_id))
            };
        }
        match serde_json::from_slice::<Value>(&bytes[..]) {
            Ok(json) if status.is_success() => Ok(json),
            Ok(json) => Err(status_error(status, &json, spreadsheet_id)),
            Err(e) if status.is_success() => Err(SpreadsheetError::Transient(format!(
                "malformed response body: {e}"
            ))),
            Err(_) => Err(status_error(status, &Value::Null, spreadsheet_id)),
        }
    }
}

impl TabularStore for GoogleSheets4Adapter {
    fn list_sheets(&self, spreadsheet_id: &str) -> Result<Vec<String>, SpreadsheetError> {
        self.rt.block_on(async {
            let url = format!(
                "{}spreadsheets/{}?fields=sheets.properties.title",
                self.sheets_base_url, spreadsheet_id
            );
            let body = self.send(Method::GET, &url, spreadsheet_id, None).await?;
            let titles: Vec<String> = body["sheets"]
                .as_array()
                .map(|sheets| {
                    sheets
                        .iter()
                        .filter_map(|s| s["properties"]["title"].as_str())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            debug!(spreadsheet_id, ?titles, "Listed sheets");
            Ok(titles)
        })
    }

    fn create_sheets(
        &mut self,
        spreadsheet_id: &str,
        titles: &[String],
    ) -> Result<(), SpreadsheetError> {
        if titles.is_empty() {
            return Ok(());
        }
        self.rt.block_on(async {
            info!(spreadsheet_id, ?titles, "Creating sheets");
            let url = format!(
                "{}spreadsheets/{}:batchUpdate",
                self.sheets_base_url, spreadsheet_id
            );
            let requests: Vec<Value> = titles
                .iter()
                .map(|t| json!({"addSheet": {"properties": {"title": t}}}))
                .collect();
            let body_json = json!({ "requests": requests });
            debug!(spreadsheet_id, body = %body_json, "Batch update request");
            self.send(Method::POST, &url, spreadsheet_id, Some(body_json))
                .await?;
            Ok(())
        })
    }

    fn get_range(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
    ) -> Result<Vec<Row>, SpreadsheetError> {
        self.rt.block_on(async {
            let url = self.values_url(spreadsheet_id, sheet, range);
            let body = self.send(Method::GET, &url, spreadsheet_id, None).await?;
            let rows = rows_from_values(&body);
            debug!(spreadsheet_id, sheet, range, rows = rows.len(), "Read range");
            Ok(rows)
        })
    }

    fn append_rows(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError> {
        self.rt.block_on(async {
            let url = format!(
                "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
                self.values_url(spreadsheet_id, sheet, range)
            );
            let count = rows.len();
            let body_json = json!({
                "majorDimension": "ROWS",
                "values": rows,
            });
            debug!(spreadsheet_id, sheet, body = %body_json, "Append rows request");
            self.send(Method::POST, &url, spreadsheet_id, Some(body_json))
                .await?;
            info!(spreadsheet_id, sheet, rows = count, "Appended rows");
            Ok(())
        })
    }

    fn update_range(
        &mut self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), SpreadsheetError> {
        self.rt.block_on(async {
            let url = format!(
                "{}?valueInputOption=RAW",
                self.values_url(spreadsheet_id, sheet, range)
            );
            let body_json = json!({
                "range": qualified(sheet, range),
                "majorDimension": "ROWS",
                "values": rows,
            });
            debug!(spreadsheet_id, sheet, body = %body_json, "Update range request");
            self.send(Method::PUT, &url, spreadsheet_id, Some(body_json))
                .await?;
            Ok(())
        })
    }
}
