//! Integration tests for common ToggleTown workflows.
//!
//! These tests go through the top-level crate the way applications do.

use std::sync::Arc;
use std::time::Duration;
use toggletown::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Local Evaluation Tests
// =============================================================================

#[test]
fn test_beta_program_targeting() {
    let flag = FlagConfig::boolean("beta-dashboard", false)
        .with_rule(Rule::new("email", Operator::Contains, "@toggletown.com").with_roll_value(true))
        .with_rule(Rule::new("plan", Operator::In, vec!["enterprise"]).with_roll_value(true));

    let staff = EvaluationContext::new()
        .with_user_id("u-1")
        .with_attribute("email", "dev@toggletown.com");
    let enterprise = EvaluationContext::new()
        .with_user_id("u-2")
        .with_attribute("plan", "enterprise");
    let hobby = EvaluationContext::new()
        .with_user_id("u-3")
        .with_attribute("plan", "hobby");

    assert_eq!(flag.evaluate(&staff), Value::Bool(true));
    assert_eq!(flag.evaluate(&enterprise), Value::Bool(true));
    assert_eq!(flag.evaluate(&hobby), Value::Bool(false));
}

#[test]
fn test_gradual_rollout_is_sticky() {
    // "u2:pct-flag" lands in bucket 14, "u3:pct-flag" in bucket 62
    let flag = FlagConfig::boolean("pct-flag", true).with_rollout(50);
    let u2 = EvaluationContext::new().with_user_id("u2");
    let u3 = EvaluationContext::new().with_user_id("u3");

    for _ in 0..10 {
        assert_eq!(flag.evaluate(&u2), Value::Bool(true));
        assert_eq!(flag.evaluate(&u3), Value::Bool(false));
    }

    // Raising the percentage only ever adds users
    let wider = FlagConfig::boolean("pct-flag", true).with_rollout(70);
    assert_eq!(wider.evaluate(&u2), Value::Bool(true));
    assert_eq!(wider.evaluate(&u3), Value::Bool(true));
}

#[test]
fn test_anonymous_users_skip_rollout() {
    let flag = FlagConfig::string("pct-flag", "on").with_rollout(1);
    assert_eq!(flag.evaluate(&EvaluationContext::new()), Value::from("on"));
}

#[test]
fn test_nested_attributes() {
    let flag = FlagConfig::string("region-banner", "global")
        .with_rule(Rule::new("country", Operator::Equals, "NZ").with_roll_value("kia ora"));

    let ctx = EvaluationContext::new().with_nested_attribute("country", "NZ");
    assert_eq!(flag.evaluate(&ctx), Value::from("kia ora"));
}

// =============================================================================
// Client Workflow Tests
// =============================================================================

struct FixedFetcher(FlagCatalog);

#[async_trait::async_trait]
impl FlagFetcher for FixedFetcher {
    async fn fetch(&self) -> std::result::Result<FlagCatalog, FetchError> {
        Ok(self.0.clone())
    }
}

#[test]
fn test_client_with_custom_fetcher() {
    let catalog: FlagCatalog = [FlagConfig::number("max-uploads", 5.0)]
        .into_iter()
        .map(|f| (f.key.clone(), f))
        .collect();

    let config = ClientConfig::builder()
        .fetcher(Arc::new(FixedFetcher(catalog)))
        .build();
    let client = ToggleTownClient::new("unused", config).unwrap();

    tokio_test::block_on(async {
        tokio_test::assert_ok!(client.initialize().await);
        assert_eq!(client.get_number("max-uploads", 1.0, &EvaluationContext::new()), 5.0);
        client.close().await;
    });
}

#[tokio::test]
async fn test_client_against_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sdk/flags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "flags": {
                "maintenance-mode": {
                    "key": "maintenance-mode",
                    "type": "BOOLEAN",
                    "enabled": true,
                    "defaultValue": true
                }
            }
        })))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .poll_interval(Duration::from_secs(60))
        .build();
    let client = ToggleTownClient::new("tt_test_key", config).unwrap();
    client.initialize().await.unwrap();

    let ctx = EvaluationContext::new().with_user_id("ops");
    assert!(client.get_boolean("maintenance-mode", false, &ctx));
    assert_eq!(client.status().state, CacheState::Fresh);

    client.close().await;
}
