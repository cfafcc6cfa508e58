use platform_oauth2::{CallbackParams, FetchRequest, OAuth2Error, TokenStore};
use std::time::{Duration, Instant};

use crate::common::mock_provider::GOOD_CODE;
use crate::common::{setup_with_client, token};

const CLIENT_TIMEOUT: Duration = Duration::from_millis(200);

fn short_timeout_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .expect("client builds")
}

/// A token endpoint slower than the client timeout fails the exchange as a
/// value, with the state already spent.
#[tokio::test]
async fn test_timed_out_exchange_is_a_failure_result() {
    let ctx = setup_with_client(short_timeout_client()).await;
    ctx.provider.set_code_delay(Duration::from_secs(2));
    let request = ctx.manager.authorization_url("youtube", None).await.unwrap();
    assert_eq!(ctx.states.len().await, 1);

    let started = Instant::now();
    let outcome = ctx
        .manager
        .handle_callback(
            "youtube",
            CallbackParams {
                code: Some(GOOD_CODE.to_string()),
                state: Some(request.state.clone()),
                ..Default::default()
            },
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!outcome.exchange.success);
    assert!(matches!(
        outcome.exchange.error,
        Some(OAuth2Error::ExchangeFailed(_))
    ));
    assert!(outcome.services.iter().all(|s| !s.authenticated));
    assert!(ctx.states.is_empty().await);
    assert!(ctx.tokens.get_active_token("youtube").await.unwrap().is_none());

    // Replaying the callback finds no state
    let replay = ctx
        .manager
        .handle_callback(
            "youtube",
            CallbackParams {
                code: Some(GOOD_CODE.to_string()),
                state: Some(request.state),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        replay.exchange.error,
        Some(OAuth2Error::InvalidOrExpiredState)
    ));
    assert_eq!(ctx.provider.token_hits(), 0);
}

/// A proxied API call slower than the client timeout surfaces as a request error.
#[tokio::test]
async fn test_timed_out_fetch_is_a_request_error() {
    let ctx = setup_with_client(short_timeout_client()).await;
    ctx.tokens
        .save_token("youtube", token("youtube", "valid", 3600, Some("refresh-0")))
        .await
        .unwrap();

    let started = Instant::now();
    let err = ctx
        .manager
        .authenticated_fetch("youtube", FetchRequest::get(ctx.provider.url("/api/slow")))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(err.oauth2(), Some(OAuth2Error::Request(_))));
    assert_eq!(ctx.provider.api_hits(), 1);
    assert_eq!(ctx.provider.refresh_hits(), 0);
}
