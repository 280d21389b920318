use std::sync::Arc;

use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::auth::AccessTokenSource;
use crate::contract::LedgerError;

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
struct AppendBody<'a> {
    values: [&'a [Value]; 1],
}

/// Thin client for the values endpoints of one worksheet.
pub struct SheetsClient {
    http: reqwest::Client,
    api_url: Url,
    spreadsheet_id: String,
    worksheet: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        api_url: Url,
        spreadsheet_id: impl Into<String>,
        worksheet: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            http,
            api_url,
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            tokens,
        }
    }

    pub fn worksheet(&self) -> &str {
        &self.worksheet
    }

    /// A1 range on this worksheet, e.g. `Users!A:A`.
    pub fn range(&self, cells: &str) -> String {
        format!("{}!{cells}", quote_sheet_name(&self.worksheet))
    }

    fn values_url(&self, last_segment: &str) -> Result<Url, LedgerError> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                LedgerError::config(format!("api_url cannot be a base: {}", self.api_url))
            })?;
            segments
                .pop_if_empty()
                .extend([
                    "v4",
                    "spreadsheets",
                    self.spreadsheet_id.as_str(),
                    "values",
                    last_segment,
                ]);
        }
        Ok(url)
    }

    /// Rows of `cells`, unformatted. Missing trailing cells are simply absent.
    #[instrument(name = "subscription_gate.sheets.read", skip(self), fields(worksheet = %self.worksheet))]
    pub async fn read_range(&self, cells: &str) -> Result<Vec<Vec<Value>>, LedgerError> {
        let mut url = self.values_url(&self.range(cells))?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE");

        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| LedgerError::transport(e.to_string()))?;

        let range: ValueRange = check(resp)
            .await?
            .json()
            .await
            .map_err(|e| LedgerError::malformed(format!("values response: {e}")))?;
        debug!(rows = range.values.len(), "range read");
        Ok(range.values)
    }

    /// Append one row after the last non-empty row of `cells`.
    #[instrument(name = "subscription_gate.sheets.append", skip(self, row), fields(worksheet = %self.worksheet))]
    pub async fn append_row(&self, cells: &str, row: &[Value]) -> Result<(), LedgerError> {
        let mut url = self.values_url(&format!("{}:append", self.range(cells)))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&AppendBody { values: [row] })
            .send()
            .await
            .map_err(|e| LedgerError::transport(e.to_string()))?;

        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response, LedgerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LedgerError::auth(format!("HTTP {}: {body}", status.as_u16()))
        }
        _ => LedgerError::http(status.as_u16(), body),
    })
}

/// Sheet names with anything but letters, digits and `_` must be quoted in
/// A1 notation, with embedded quotes doubled.
fn quote_sheet_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
