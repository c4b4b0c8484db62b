use std::sync::Arc;

use webhook_rendezvous::{
    AuthDecision, AuthTokenStore, CallbackAuthenticator, RegisterError, RegistrationRequest,
    Registrar, CALLBACK_MOUNT,
};

fn new_registrar(base_url: Option<&str>) -> (Registrar, Arc<AuthTokenStore>) {
    let store = Arc::new(AuthTokenStore::new());
    let registrar = Registrar::new(store.clone(), base_url.map(str::to_string));
    (registrar, store)
}

#[tokio::test]
async fn absent_token_gets_a_generated_one() {
    let (registrar, _) = new_registrar(Some("https://ci.example.test/"));

    let registration = registrar
        .register(RegistrationRequest::new())
        .await
        .expect("register");

    // UUID v4 in its canonical hyphenated form.
    assert_eq!(registration.token.as_str().len(), 36);
    assert_eq!(
        registration.token.as_str().matches('-').count(),
        4,
        "token was {}",
        registration.token
    );
    assert_eq!(
        registration.url,
        format!(
            "https://ci.example.test/{CALLBACK_MOUNT}/{}",
            registration.token
        )
    );
}

#[tokio::test]
async fn generated_tokens_are_unique() {
    let (registrar, _) = new_registrar(Some("https://ci.example.test/"));

    let first = registrar
        .register(RegistrationRequest::new())
        .await
        .expect("register");
    let second = registrar
        .register(RegistrationRequest::new())
        .await
        .expect("register");

    assert_ne!(first.token, second.token);
}

#[tokio::test]
async fn caller_token_is_kept_verbatim() {
    let (registrar, _) = new_registrar(Some("https://ci.example.test/"));

    let registration = registrar
        .register(RegistrationRequest::new().with_token("test-token"))
        .await
        .expect("register");

    assert_eq!(registration.token.as_str(), "test-token");
    assert_eq!(
        registration.url,
        format!("https://ci.example.test/{CALLBACK_MOUNT}/test-token")
    );
}

#[tokio::test]
async fn empty_caller_token_falls_back_to_a_generated_one() {
    let (registrar, _) = new_registrar(Some("https://ci.example.test/"));

    let registration = registrar
        .register(RegistrationRequest::new().with_token(""))
        .await
        .expect("register");

    assert_eq!(registration.token.as_str().len(), 36);
}

#[tokio::test]
async fn unencoded_token_is_rejected_with_a_suggestion() {
    let (registrar, _) = new_registrar(Some("https://ci.example.test/"));

    let err = registrar
        .register(RegistrationRequest::new().with_token("my token"))
        .await
        .expect_err("space must be rejected");

    assert_eq!(
        err,
        RegisterError::InvalidToken {
            token: "my token".to_string(),
            suggestion: "my%20token".to_string(),
        }
    );
}

#[tokio::test]
async fn pre_encoded_token_is_rejected_rather_than_double_encoded() {
    let (registrar, _) = new_registrar(Some("https://ci.example.test/"));

    let err = registrar
        .register(RegistrationRequest::new().with_token("a%20b"))
        .await
        .expect_err("percent must be rejected");

    assert_eq!(
        err,
        RegisterError::InvalidToken {
            token: "a%20b".to_string(),
            suggestion: "a%2520b".to_string(),
        }
    );
}

#[tokio::test]
async fn missing_base_url_fails_registration() {
    let (registrar, store) = new_registrar(None);

    let err = registrar
        .register(RegistrationRequest::new().with_token("t1").with_secret("s"))
        .await
        .expect_err("no base url");

    assert_eq!(err, RegisterError::MissingBaseUrl);
    // Nothing was stored for the failed registration.
    assert!(!store.has_secret(&webhook_rendezvous::Token("t1".to_string())).await);
}

#[tokio::test]
async fn blank_base_url_fails_registration() {
    let (registrar, _) = new_registrar(Some("   "));

    let err = registrar
        .register(RegistrationRequest::new())
        .await
        .expect_err("blank base url");

    assert_eq!(err, RegisterError::MissingBaseUrl);
}

#[tokio::test]
async fn unparseable_base_url_fails_registration() {
    let (registrar, _) = new_registrar(Some("not a url"));

    let err = registrar
        .register(RegistrationRequest::new())
        .await
        .expect_err("relative base url");

    assert!(matches!(err, RegisterError::InvalidBaseUrl { .. }));
}

#[tokio::test]
async fn base_url_without_trailing_slash_keeps_its_last_segment() {
    let (registrar, _) = new_registrar(Some("https://ci.example.test/ci"));

    let registration = registrar
        .register(RegistrationRequest::new().with_token("t1"))
        .await
        .expect("register");

    assert_eq!(
        registration.url,
        format!("https://ci.example.test/ci/{CALLBACK_MOUNT}/t1")
    );
}

#[tokio::test]
async fn secret_is_stored_before_registration_returns() {
    let (registrar, store) = new_registrar(Some("https://ci.example.test/"));

    let registration = registrar
        .register(RegistrationRequest::new().with_secret("abc"))
        .await
        .expect("register");

    let authenticator = CallbackAuthenticator::new(store);
    assert_eq!(
        authenticator
            .authenticate(&registration.token, Some("abc"))
            .await,
        AuthDecision::Allowed
    );
    assert_eq!(
        authenticator
            .authenticate(&registration.token, Some("wrong"))
            .await,
        AuthDecision::Denied
    );
}

#[tokio::test]
async fn registering_without_secret_leaves_the_token_open() {
    let (registrar, store) = new_registrar(Some("https://ci.example.test/"));

    let registration = registrar
        .register(RegistrationRequest::new().with_token("open"))
        .await
        .expect("register");

    assert!(!store.has_secret(&registration.token).await);
}
