use crate::config::JiraConfig;
use crate::error::{JiraError, Result};
use crate::models::{FieldDefinition, RawIssue, SearchPage, UserProfile};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client as HttpClient, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Largest page the search endpoint is asked for.
pub const SEARCH_PAGE_SIZE: usize = 50;

const ISSUE_EXPAND: &str = "renderedFields,names,changelog";
const ALL_FIELDS: &str = "*all";

#[derive(Clone)]
pub struct JiraClient {
    http: HttpClient,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    pub async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.get_with_query(path, None).await
    }

    pub async fn get_with_query<T>(
        &self,
        path: &str,
        query: Option<&[(&str, &str)]>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = Url::parse(&self.url_for(path)).map_err(|err| JiraError::Other(err.to_string()))?;
        self.get_url(url, query).await
    }

    async fn get_url<T>(&self, url: Url, query: Option<&[(&str, &str)]>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let path = url.path().to_string();
        let mut request = self.http.get(url);
        if let Some(params) = query {
            request = request.query(params);
        }
        tracing::debug!(path = %path, "jira request");
        let response = request.send().await?;
        Self::parse_json(response).await
    }

    fn url_for(&self, path: &str) -> String {
        let mut base = self.config.api_root();
        let trimmed = path.trim_start_matches('/');
        base.push_str(trimmed);
        base
    }

    /// `url_for(collection)` with `segment` appended as one percent-encoded path segment.
    fn resource_url(&self, collection: &str, segment: &str) -> Result<Url> {
        let mut url =
            Url::parse(&self.url_for(collection)).map_err(|err| JiraError::Other(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| JiraError::Other(format!("cannot extend {}", collection)))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn absolute_url(&self, href: &str) -> Result<Url> {
        if href.starts_with("http://") || href.starts_with("https://") {
            return Url::parse(href).map_err(|err| JiraError::Other(err.to_string()));
        }

        let base = format!("{}/", self.config.site_root());
        Url::parse(&base)
            .and_then(|url| url.join(href))
            .map_err(|err| JiraError::Other(err.to_string()))
    }

    async fn parse_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = Self::ensure_success(response).await?;
        response.json::<T>().await.map_err(JiraError::from)
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            Err(JiraError::Authentication {
                status: Some(status),
                message: format!("access denied ({}) - {}", status, body),
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(build_http_error(status, &body))
        }
    }

    /// Identity of the credentials in use.
    pub async fn get_myself(&self) -> Result<UserProfile> {
        self.get("myself").await
    }

    /// Fetches one issue with every field expanded; the key is percent-encoded into the path.
    pub async fn get_issue(&self, issue_key: &str) -> Result<RawIssue> {
        let url = self.resource_url("issue", issue_key.trim())?;
        self.get_url(url, Some(&[("expand", ISSUE_EXPAND), ("fields", ALL_FIELDS)]))
            .await
    }

    /// Every field the site defines, system and custom, in service order.
    pub async fn get_fields(&self) -> Result<Vec<FieldDefinition>> {
        self.get("field").await
    }

    /// Runs a JQL query and collects at most `cap` issues across pages.
    pub async fn search_issues(&self, jql: &str, cap: usize) -> Result<Vec<RawIssue>> {
        let mut issues: Vec<RawIssue> = Vec::new();
        let mut next_page_token: Option<String> = None;

        while issues.len() < cap {
            let page_size = SEARCH_PAGE_SIZE.min(cap - issues.len()).to_string();
            let mut params: Vec<(&str, &str)> = vec![
                ("jql", jql),
                ("maxResults", page_size.as_str()),
                ("fields", ALL_FIELDS),
            ];
            if let Some(token) = next_page_token.as_deref() {
                params.push(("nextPageToken", token));
            }

            let page: SearchPage = self.get_with_query("search/jql", Some(&params)).await?;
            let has_more = page.has_more();
            let token = page.next_page_token.clone();
            let remaining = cap - issues.len();
            issues.extend(page.issues.into_iter().take(remaining));

            if !has_more {
                break;
            }
            next_page_token = token;
        }

        tracing::debug!(count = issues.len(), "jql search finished");
        Ok(issues)
    }

    /// Downloads attachment content; relative links resolve against the site root.
    pub async fn fetch_binary(&self, href: &str) -> Result<BinaryContent> {
        let url = self.absolute_url(href)?;
        let response = self.http.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = response.bytes().await?.to_vec();
        Ok(BinaryContent { bytes, mime_type })
    }
}

fn build_http_client(config: &JiraConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();

    let credentials = BASE64.encode(format!("{}:{}", config.email, config.api_token));
    let mut auth_value = header_value(format!("Basic {}", credentials))?;
    auth_value.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth_value);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(config.user_agent.clone())?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| JiraError::Other(err.to_string()))
}

fn header_value(value: String) -> Result<HeaderValue> {
    HeaderValue::from_str(&value).map_err(|err| JiraError::Other(err.to_string()))
}

fn build_http_error(status: StatusCode, body: &str) -> JiraError {
    let code = extract_error_code(body);
    JiraError::http(status, code, body.to_string())
}

/// Jira reports failures as `{"errorMessages": [...], "errors": {...}}`; the first message is kept as code.
fn extract_error_code(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    value
        .get("errorMessages")
        .and_then(|messages| messages.as_array())
        .and_then(|messages| messages.first())
        .and_then(|message| message.as_str())
        .map(|message| message.to_string())
        .or_else(|| {
            value
                .get("code")
                .and_then(|code| code.as_str())
                .map(|code| code.to_string())
        })
}

#[derive(Debug, Clone)]
pub struct BinaryContent {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}
