use health_sheet_export::cloud_adapters::auth::{AuthError, initial_oauth_login};

#[tokio::test]
async fn initial_login_fails_with_missing_credentials() {
    let result = initial_oauth_login("missing.json", "tokens.json").await;
    assert!(matches!(result, Err(AuthError::MissingCredentials(_))));
}
