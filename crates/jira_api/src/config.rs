use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "3";
pub const DEFAULT_USER_AGENT: &str = "jira-export";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct JiraConfig {
    pub base_url: String,
    pub api_version: String,
    pub email: String,
    pub api_token: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl JiraConfig {
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            email: email.into(),
            api_token: api_token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Base URL without a trailing slash.
    pub fn site_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn api_root(&self) -> String {
        format!(
            "{}/rest/api/{}/",
            self.site_root(),
            self.api_version.trim_matches('/')
        )
    }

    /// Short site label, e.g. `acme` for `https://acme.atlassian.net`.
    pub fn site_name(&self) -> String {
        let root = self.site_root();
        let host = root
            .strip_prefix("https://")
            .or_else(|| root.strip_prefix("http://"))
            .unwrap_or(root);
        host.trim_end_matches(".atlassian.net").to_string()
    }
}
