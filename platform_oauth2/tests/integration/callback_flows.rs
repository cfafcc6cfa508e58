use async_trait::async_trait;
use chrono::{Duration, Utc};
use platform_oauth2::{
    CallbackParams, ChallengeEncoding, CsrfStateStore, InMemoryStateStore, OAuth2Error,
    OAuthManager, PlatformRegistry, Token, TokenRecipient, TokenStore, code_challenge,
};
use std::sync::{Arc, Mutex};

use crate::common::mock_provider::{GOOD_CODE, ISSUED_REFRESH_TOKEN};
use crate::common::{ORIGIN, provider_env, query_of, setup, setup_with_recipients};

fn callback(code: Option<&str>, state: &str) -> CallbackParams {
    CallbackParams {
        code: code.map(str::to_string),
        state: Some(state.to_string()),
        ..Default::default()
    }
}

/// `error=access_denied` never reaches the token endpoint.
#[tokio::test]
async fn test_denied_callback_skips_exchange() {
    let ctx = setup().await;
    let request = ctx.manager.authorization_url("youtube", None).await.unwrap();

    let outcome = ctx
        .manager
        .exchange(
            "youtube",
            &format!(
                "{ORIGIN}/oauth/youtube/callback?error=access_denied&error_description=User+denied&state={}",
                request.state
            ),
            &request.state,
        )
        .await;

    assert!(!outcome.success);
    match outcome.error {
        Some(OAuth2Error::AuthorizationDenied { error, description }) => {
            assert_eq!(error, "access_denied");
            assert_eq!(description.as_deref(), Some("User denied"));
        }
        other => panic!("Expected AuthorizationDenied, got {other:?}"),
    }
    assert_eq!(ctx.provider.token_hits(), 0);
    assert!(ctx.states.is_empty().await);
}

/// A valid callback stores an unexpired token and consumes the state.
#[tokio::test]
async fn test_valid_callback_stores_token() {
    let ctx = setup().await;
    let request = ctx.manager.authorization_url("youtube", None).await.unwrap();

    let outcome = ctx
        .manager
        .exchange(
            "youtube",
            &format!("{ORIGIN}/oauth/youtube/callback?code={GOOD_CODE}"),
            &request.state,
        )
        .await;

    assert!(outcome.success, "exchange failed: {:?}", outcome.error);
    assert_eq!(outcome.access_token.as_deref(), Some("access-1"));
    assert_eq!(outcome.refresh_token.as_deref(), Some(ISSUED_REFRESH_TOKEN));

    let stored = ctx.tokens.get_active_token("youtube").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert!(stored.expires_at > Utc::now());
    assert!(
        ctx.states
            .take("youtube", &request.state)
            .await
            .unwrap()
            .is_none()
    );
    assert!(ctx.manager.is_authenticated("youtube").await.unwrap());

    let form = ctx.provider.last_token_form();
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["client_id"], "youtube-client");
    assert_eq!(form["client_secret"], "youtube-secret");
    assert_eq!(form["redirect_uri"], format!("{ORIGIN}/oauth/youtube/callback"));
}

/// Replaying a callback fails on the state without a second exchange.
#[tokio::test]
async fn test_replayed_callback_is_rejected() {
    let ctx = setup().await;
    let request = ctx.manager.authorization_url("youtube", None).await.unwrap();

    let first = ctx
        .manager
        .handle_callback("youtube", callback(Some(GOOD_CODE), &request.state))
        .await;
    assert!(first.exchange.success);

    let second = ctx
        .manager
        .handle_callback("youtube", callback(Some(GOOD_CODE), &request.state))
        .await;
    assert!(!second.exchange.success);
    assert!(matches!(
        second.exchange.error,
        Some(OAuth2Error::InvalidOrExpiredState)
    ));
    assert_eq!(ctx.provider.token_hits(), 1);
}

/// Two concurrent callbacks with one state: exactly one exchange happens.
#[tokio::test]
async fn test_concurrent_duplicate_callbacks_exchange_once() {
    let ctx = setup().await;
    let request = ctx.manager.authorization_url("youtube", None).await.unwrap();
    let manager = Arc::new(ctx.manager);

    let (a, b) = tokio::join!(
        manager.handle_callback("youtube", callback(Some(GOOD_CODE), &request.state)),
        manager.handle_callback("youtube", callback(Some(GOOD_CODE), &request.state)),
    );

    assert!(a.exchange.success ^ b.exchange.success);
    assert_eq!(ctx.provider.token_hits(), 1);
}

/// A rejected code is reported with the provider's detail and still burns the state.
#[tokio::test]
async fn test_rejected_code_consumes_state() {
    let ctx = setup().await;
    let request = ctx.manager.authorization_url("youtube", None).await.unwrap();

    let outcome = ctx
        .manager
        .handle_callback("youtube", callback(Some("bad-code"), &request.state))
        .await;
    match &outcome.exchange.error {
        Some(OAuth2Error::ExchangeFailed(detail)) => {
            assert!(detail.contains("invalid_grant: Bad authorization code"));
        }
        other => panic!("Expected ExchangeFailed, got {other:?}"),
    }
    assert!(outcome.services.iter().all(|s| !s.authenticated));

    let retry = ctx
        .manager
        .handle_callback("youtube", callback(Some(GOOD_CODE), &request.state))
        .await;
    assert!(matches!(
        retry.exchange.error,
        Some(OAuth2Error::InvalidOrExpiredState)
    ));
    assert!(ctx.tokens.get_active_token("youtube").await.unwrap().is_none());
}

/// Missing code or state is reported without contacting the provider.
#[tokio::test]
async fn test_missing_parameters() {
    let ctx = setup().await;
    let request = ctx.manager.authorization_url("youtube", None).await.unwrap();

    let outcome = ctx
        .manager
        .handle_callback("youtube", callback(None, &request.state))
        .await;
    assert!(matches!(
        outcome.exchange.error,
        Some(OAuth2Error::MissingParameter(ref p)) if p == "code"
    ));

    let outcome = ctx
        .manager
        .handle_callback(
            "youtube",
            CallbackParams {
                code: Some(GOOD_CODE.to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        outcome.exchange.error,
        Some(OAuth2Error::MissingParameter(ref p)) if p == "state"
    ));
    assert_eq!(ctx.provider.token_hits(), 0);
}

/// Manual exchange with renamed client id, PKCE verifier and a nested payload.
#[tokio::test]
async fn test_enveloped_manual_exchange() {
    let ctx = setup().await;
    let request = ctx.manager.authorization_url("tiktok", None).await.unwrap();
    let challenge = query_of(&request.url)["code_challenge"].clone();

    let outcome = ctx
        .manager
        .handle_callback("tiktok", callback(Some(GOOD_CODE), &request.state))
        .await;
    assert!(outcome.exchange.success, "{:?}", outcome.exchange.error);

    let form = ctx.provider.last_token_form();
    assert_eq!(form["client_key"], "tiktok-client");
    assert!(!form.contains_key("client_id"));
    assert_eq!(
        code_challenge(&form["code_verifier"], ChallengeEncoding::Hex),
        challenge
    );

    let stored = ctx.tokens.get_active_token("tiktok").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token.as_deref(), Some(ISSUED_REFRESH_TOKEN));
    assert_eq!(stored.scopes, vec!["user.info.basic", "video.upload"]);
    let lifetime = stored.expires_at - Utc::now();
    assert!(lifetime > Duration::hours(23) && lifetime <= Duration::hours(24));
}

/// A response without `expires_in` gets the 24h fallback, not "never expires".
#[tokio::test]
async fn test_missing_lifetime_falls_back_to_default() {
    let ctx = setup().await;
    let request = ctx
        .manager
        .authorization_url("instagram", Some(vec!["instagram_business_basic".into()]))
        .await
        .unwrap();

    let outcome = ctx
        .manager
        .handle_callback("instagram", callback(Some(GOOD_CODE), &request.state))
        .await;
    assert!(outcome.exchange.success);

    let stored = ctx.tokens.get_active_token("instagram").await.unwrap().unwrap();
    let lifetime = stored.expires_at - Utc::now();
    assert!(lifetime > Duration::hours(23) && lifetime <= Duration::hours(24));
    assert!(stored.refresh_token.is_none());
    assert_eq!(stored.scopes, vec!["instagram_business_basic"]);

    assert_eq!(outcome.services.len(), 1);
    assert!(!outcome.services[0].authenticated);
}

/// Basic-auth providers get credentials in the header, not the body.
#[tokio::test]
async fn test_basic_auth_exchange() {
    let ctx = setup().await;
    let request = ctx.manager.authorization_url("twitter", None).await.unwrap();

    let outcome = ctx
        .manager
        .handle_callback("twitter", callback(Some(GOOD_CODE), &request.state))
        .await;
    assert!(outcome.exchange.success);

    let form = ctx.provider.last_token_form();
    assert!(!form.contains_key("client_secret"));
    assert!(!form["code_verifier"].is_empty());
    let auth = ctx.provider.state.token_auth_headers.lock().unwrap()[0].clone();
    assert!(auth.unwrap().starts_with("Basic "));
}

struct RecordingRecipient {
    capability: &'static str,
    received: Mutex<Vec<String>>,
}

#[async_trait]
impl TokenRecipient for RecordingRecipient {
    fn capability(&self) -> &str {
        self.capability
    }

    async fn receive(&self, _provider_id: &str, token: &Token) -> Result<(), String> {
        self.received
            .lock()
            .unwrap()
            .push(token.access_token.clone());
        Ok(())
    }
}

/// One round trip can satisfy several capabilities; each is reported on its own.
#[tokio::test]
async fn test_capabilities_reported_independently() {
    let upload = Arc::new(RecordingRecipient {
        capability: "youtube",
        received: Mutex::new(vec![]),
    });
    let analytics = Arc::new(RecordingRecipient {
        capability: "youtube_analytics",
        received: Mutex::new(vec![]),
    });
    let ctx = setup_with_recipients(vec![upload.clone(), analytics.clone()]).await;

    let request = ctx
        .manager
        .authorization_url(
            "youtube",
            Some(vec![
                "https://www.googleapis.com/auth/youtube.upload".to_string(),
            ]),
        )
        .await
        .unwrap();
    let outcome = ctx
        .manager
        .handle_callback("youtube", callback(Some(GOOD_CODE), &request.state))
        .await;

    assert!(outcome.exchange.success);
    assert_eq!(outcome.services.len(), 2);
    assert!(outcome.services[0].authenticated);
    assert!(!outcome.services[1].authenticated);
    assert_eq!(*upload.received.lock().unwrap(), vec!["access-1".to_string()]);
    assert!(analytics.received.lock().unwrap().is_empty());
}

/// A state older than the TTL is rejected at take time even without a sweep.
#[tokio::test]
async fn test_expired_state_is_rejected_without_sweep() {
    let ctx = setup().await;
    let env = provider_env(&ctx.provider);
    let registry = PlatformRegistry::from_lookup("/oauth", |key| env.get(key).cloned()).unwrap();
    let states = Arc::new(InMemoryStateStore::with_ttl(std::time::Duration::from_millis(50)));
    let manager = OAuthManager::builder(Arc::new(registry))
        .state_store(states.clone())
        .build()
        .unwrap();

    let request = manager.authorization_url("youtube", None).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(120)).await;

    let outcome = manager
        .handle_callback("youtube", callback(Some(GOOD_CODE), &request.state))
        .await;
    assert!(matches!(
        outcome.exchange.error,
        Some(OAuth2Error::InvalidOrExpiredState)
    ));
    assert_eq!(ctx.provider.token_hits(), 0);
    assert!(states.is_empty().await);
}
