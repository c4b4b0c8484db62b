use std::sync::Arc;

use secrecy::SecretString;
use webhook_rendezvous::{AuthDecision, AuthTokenStore, CallbackAuthenticator, Token};

fn token(value: &str) -> Token {
    Token(value.to_string())
}

#[tokio::test]
async fn matching_credential_is_allowed() {
    let store = Arc::new(AuthTokenStore::new());
    store
        .put(token("t1"), Some(SecretString::from("abc")))
        .await;
    let authenticator = CallbackAuthenticator::new(store);

    assert_eq!(
        authenticator.authenticate(&token("t1"), Some("abc")).await,
        AuthDecision::Allowed
    );
}

#[tokio::test]
async fn mismatched_or_absent_credential_is_denied() {
    let store = Arc::new(AuthTokenStore::new());
    store
        .put(token("t1"), Some(SecretString::from("abc")))
        .await;
    let authenticator = CallbackAuthenticator::new(store);

    assert_eq!(
        authenticator.authenticate(&token("t1"), Some("abd")).await,
        AuthDecision::Denied
    );
    assert_eq!(
        authenticator.authenticate(&token("t1"), None).await,
        AuthDecision::Denied
    );
    // Prefix of the secret, different length.
    assert_eq!(
        authenticator.authenticate(&token("t1"), Some("ab")).await,
        AuthDecision::Denied
    );
}

#[tokio::test]
async fn unknown_token_without_credential_is_trivially_allowed() {
    let store = Arc::new(AuthTokenStore::new());
    let authenticator = CallbackAuthenticator::new(store);

    assert_eq!(
        authenticator.authenticate(&token("nobody"), None).await,
        AuthDecision::Allowed
    );
}

#[tokio::test]
async fn credential_for_secretless_token_is_unchecked() {
    let store = Arc::new(AuthTokenStore::new());
    let authenticator = CallbackAuthenticator::new(store);

    assert_eq!(
        authenticator
            .authenticate(&token("nobody"), Some("whatever"))
            .await,
        AuthDecision::Unchecked
    );
}

#[tokio::test]
async fn putting_none_clears_a_stored_secret() {
    let store = Arc::new(AuthTokenStore::new());
    store
        .put(token("t1"), Some(SecretString::from("abc")))
        .await;
    assert!(store.has_secret(&token("t1")).await);

    store.put(token("t1"), None).await;
    assert!(!store.has_secret(&token("t1")).await);

    let authenticator = CallbackAuthenticator::new(store);
    assert_eq!(
        authenticator.authenticate(&token("t1"), Some("abc")).await,
        AuthDecision::Unchecked
    );
}

#[tokio::test]
async fn remove_forgets_the_secret() {
    let store = Arc::new(AuthTokenStore::new());
    store
        .put(token("t1"), Some(SecretString::from("abc")))
        .await;
    store.remove(&token("t1")).await;

    assert!(!store.has_secret(&token("t1")).await);
}
