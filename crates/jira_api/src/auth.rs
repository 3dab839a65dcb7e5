use crate::client::JiraClient;
use crate::config::JiraConfig;
use crate::error::{JiraError, Result};
use crate::models::UserProfile;

/// Builds a client from the given credentials and confirms them against `myself`.
pub async fn verify_credentials(config: JiraConfig) -> Result<UserProfile> {
    if config.base_url.trim().is_empty() {
        return Err(JiraError::Other("Jira URL is missing".to_string()));
    }
    if config.email.trim().is_empty() || config.api_token.trim().is_empty() {
        return Err(JiraError::authentication("email and API token are required"));
    }

    let client = JiraClient::new(config)?;
    let profile = client.get_myself().await?;
    tracing::info!(
        user = profile.display_name.as_deref().unwrap_or("unknown"),
        "jira credentials verified"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::verify_credentials;
    use crate::config::JiraConfig;
    use crate::error::JiraError;
    use mockito::Server;

    #[tokio::test]
    async fn empty_token_is_rejected_without_a_request() {
        let err = verify_credentials(JiraConfig::new("https://acme.atlassian.net", "me@acme.io", " "))
            .await
            .unwrap_err();
        assert!(matches!(err, JiraError::Authentication { .. }));
    }

    #[tokio::test]
    async fn returns_profile_on_success() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/myself")
            .with_status(200)
            .with_body(r#"{"accountId":"abc","displayName":"Ada Lovelace","avatarUrls":{"48x48":"https://a/48.png"}}"#)
            .create_async()
            .await;

        let profile = verify_credentials(JiraConfig::new(server.url(), "me@acme.io", "token"))
            .await
            .unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.avatar().as_deref(), Some("https://a/48.png"));
    }
}
