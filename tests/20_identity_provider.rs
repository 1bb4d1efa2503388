mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use binna_auth::auth::{AccountType, AuthOutcome, RetryPolicy, SessionProbe, TransientReason};
use binna_auth::guard::{GuardOptions, GuardState, PageGuard};
use binna_auth::provider::{IdentityProvider, ProviderError, SupabaseIdentity};
use common::*;

fn identity(token: Option<&str>) -> Result<Arc<SupabaseIdentity>> {
    let identity = SupabaseIdentity::from_config(&mock_provider().provider_config())?;
    Ok(Arc::new(match token {
        Some(token) => identity.with_access_token(token),
        None => identity,
    }))
}

fn quick_policy() -> RetryPolicy {
    RetryPolicy::fixed(3, Duration::from_millis(20))
}

#[tokio::test]
async fn valid_session_maps_to_principal() -> Result<()> {
    let probe = SessionProbe::new(identity(Some(STORE_TOKEN))?, Duration::from_secs(2));

    let outcome = probe.probe().await;
    let principal = outcome.principal().expect("authenticated");
    assert_eq!(principal.id, STORE_ID);
    assert_eq!(principal.email.as_deref(), Some("shop@binna.app"));
    assert_eq!(principal.display_name.as_deref(), Some("Test Person"));
    assert_eq!(principal.account_type, AccountType::Store);
    assert!(principal.is_verified);
    Ok(())
}

#[tokio::test]
async fn expired_and_forged_tokens_are_unauthenticated() -> Result<()> {
    for token in [EXPIRED_TOKEN, "forged-token"] {
        let probe = SessionProbe::new(identity(Some(token))?, Duration::from_secs(2));
        assert_eq!(probe.probe().await, AuthOutcome::Unauthenticated, "token {}", token);
    }
    Ok(())
}

#[tokio::test]
async fn missing_session_is_unauthenticated_without_a_request() -> Result<()> {
    let probe = SessionProbe::new(identity(None)?, Duration::from_secs(2));
    assert_eq!(probe.probe().await, AuthOutcome::Unauthenticated);
    assert_eq!(mock_provider().calls_for(""), 0);
    Ok(())
}

#[tokio::test]
async fn wrong_anon_key_is_a_deployment_fault_not_a_logout() -> Result<()> {
    let mut config = mock_provider().provider_config();
    config.anon_key = "someone-elses-key".to_string();
    let identity = Arc::new(SupabaseIdentity::from_config(&config)?.with_access_token(USER_TOKEN));

    let err = identity.current_principal().await.unwrap_err();
    assert!(!err.is_terminal(), "got {:?}", err);

    let outcome = quick_policy().run(&SessionProbe::new(identity, Duration::from_secs(2))).await;
    assert_eq!(outcome, AuthOutcome::TransientError(TransientReason::Server { status: 401 }));
    Ok(())
}

#[tokio::test]
async fn provider_outage_is_transient_after_every_attempt() -> Result<()> {
    let probe = SessionProbe::new(identity(Some(DOWN_TOKEN))?, Duration::from_secs(2));
    let before = mock_provider().calls_for(DOWN_TOKEN);

    let outcome = quick_policy().run(&probe).await;
    assert_eq!(outcome, AuthOutcome::TransientError(TransientReason::Server { status: 503 }));
    assert_eq!(mock_provider().calls_for(DOWN_TOKEN) - before, 3);
    Ok(())
}

#[tokio::test]
async fn flaky_provider_recovers_within_budget() -> Result<()> {
    let token = format!("{}probe", FLAKY_PREFIX);
    let probe = SessionProbe::new(identity(Some(&token))?, Duration::from_secs(2));

    let outcome = quick_policy().run(&probe).await;
    assert_eq!(outcome.principal().map(|p| p.id.as_str()), Some(USER_ID));
    assert_eq!(mock_provider().calls_for(&token), 3);
    Ok(())
}

#[tokio::test]
async fn slow_provider_times_out_as_transient() -> Result<()> {
    let probe = SessionProbe::new(identity(Some(SLOW_TOKEN))?, Duration::from_millis(200));

    let outcome = probe.probe().await;
    assert_eq!(
        outcome,
        AuthOutcome::TransientError(TransientReason::Timeout(Duration::from_millis(200)))
    );
    Ok(())
}

#[tokio::test]
async fn unreachable_provider_is_a_network_failure() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("free port");
    let mut config = mock_provider().provider_config();
    config.url = format!("http://127.0.0.1:{}", port);
    let identity = Arc::new(SupabaseIdentity::from_config(&config)?.with_access_token(USER_TOKEN));

    let outcome = SessionProbe::new(identity, Duration::from_secs(2)).probe().await;
    assert!(
        matches!(outcome, AuthOutcome::TransientError(TransientReason::Network(_))),
        "got {:?}",
        outcome
    );
    Ok(())
}

#[tokio::test]
async fn password_sign_in_attaches_the_session() -> Result<()> {
    let identity = identity(None)?;

    let err = identity.sign_in_with_password("ana@binna.app", "wrong").await.unwrap_err();
    assert_eq!(err, ProviderError::Rejected("Invalid login credentials".into()));
    assert!(!identity.has_session().await);

    let session = identity.sign_in_with_password("ana@binna.app", PASSWORD).await?;
    assert_eq!(session.access_token, USER_TOKEN);
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(session.principal.email.as_deref(), Some("ana@binna.app"));

    let principal = identity.current_principal().await?;
    assert_eq!(principal.id, USER_ID);
    Ok(())
}

#[tokio::test]
async fn health_check_reaches_the_provider() -> Result<()> {
    identity(None)?.health_check().await?;
    Ok(())
}

#[tokio::test]
async fn page_over_real_provider_redirects_expired_session() -> Result<()> {
    let redirects = Arc::new(Mutex::new(Vec::<String>::new()));
    let recorded = Arc::clone(&redirects);
    let navigator = Arc::new(move |path: &str| recorded.lock().unwrap().push(path.to_string()));

    let options = GuardOptions::default()
        .with_policy(quick_policy())
        .with_attempt_timeout(Duration::from_secs(2));
    let guard = PageGuard::mount(identity(Some(EXPIRED_TOKEN))?, navigator, options);
    guard.hydrate();

    assert_eq!(guard.settled().await, GuardState::Denied);
    assert_eq!(*redirects.lock().unwrap(), vec!["/login".to_string()]);
    Ok(())
}

#[tokio::test]
async fn store_page_admits_store_account() -> Result<()> {
    let navigator = Arc::new(|path: &str| {
        panic!("authorized page must not redirect to {}", path);
    });
    let options = GuardOptions::default()
        .require(AccountType::Store)
        .with_policy(quick_policy());

    let guard = PageGuard::mount(identity(Some(STORE_TOKEN))?, navigator, options);
    guard.hydrate();

    let state = guard.settled().await;
    assert!(state.renders_protected_content(), "got {:?}", state);
    assert_eq!(guard.principal().map(|p| p.id), Some(STORE_ID.to_string()));
    Ok(())
}
