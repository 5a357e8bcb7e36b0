/// Integration tests with a mocked completion API
/// Exercises qualification end to end without hitting a real model endpoint
use freight_agents::acquisition::{fallback_qualification, AcquisitionEngine};
use freight_agents::circuit_breaker::{BreakerSettings, BreakerState};
use freight_agents::completion_client::{CompletionClient, CompletionConfig};
use freight_agents::models::{NewProspect, ProspectFeatures, QualificationSource};
use serde::Deserialize;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create a client pointed at the mock server
fn create_test_client(base_url: String) -> CompletionClient {
    CompletionClient::new(CompletionConfig {
        api_url: base_url,
        api_key: "test_key".to_string(),
        model: "test-model".to_string(),
        breaker: BreakerSettings::default(),
    })
    .unwrap()
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}}
        ]
    })
}

fn new_prospect() -> NewProspect {
    NewProspect {
        company: "Great Lakes Foods".to_string(),
        contact_name: "Keisha Okafor".to_string(),
        email: "k.okafor@greatlakesfoods.com".to_string(),
        phone: "(312) 829-4410".to_string(),
        industry: "food_and_beverage".to_string(),
        features: ProspectFeatures {
            monthly_loads: 120,
            average_rate: 2400.0,
            lanes_served: 14,
            years_in_business: 11,
            payment_score: 0.9,
        },
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Reply {
    score: f64,
    tier: String,
}

#[tokio::test]
async fn test_completion_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test_key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body(r#"{"score": 88, "tier": "hot"}"#)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let raw = client.complete("system", "user").await.unwrap();
    assert_eq!(raw, r#"{"score": 88, "tier": "hot"}"#);
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let fallback = Reply {
        score: 75.0,
        tier: "warm".to_string(),
    };
    let (reply, from_api) = client.complete_json_or("system", "user", fallback).await;

    assert!(!from_api);
    assert_eq!(reply.tier, "warm");
}

#[tokio::test]
async fn test_garbage_reply_falls_back() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("Sorry, I can't score this prospect.")),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let fallback = Reply {
        score: 75.0,
        tier: "warm".to_string(),
    };
    let (_, from_api) = client.complete_json_or("system", "user", fallback).await;
    assert!(!from_api);
}

#[tokio::test]
async fn test_fenced_reply_is_parsed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "```json\n{\"score\": 52, \"tier\": \"cold\",}\n```",
        )))
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    let fallback = Reply {
        score: 0.0,
        tier: "none".to_string(),
    };
    let (reply, from_api) = client.complete_json_or("system", "user", fallback).await;

    assert!(from_api);
    assert_eq!(
        reply,
        Reply {
            score: 52.0,
            tier: "cold".to_string()
        }
    );
}

#[tokio::test]
async fn test_engine_qualifies_through_api_and_caches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            r#"{"qualificationScore": 91, "tier": "HOT", "reasoning": "High volume, reliable payer", "recommended_action": "send_rate_sheet"}"#,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = AcquisitionEngine::new(Some(create_test_client(mock_server.uri())), Some(3));

    let prospect = engine.register_prospect(new_prospect()).await.unwrap();
    let qualification = prospect.qualification.clone().unwrap();
    assert_eq!(qualification.source, QualificationSource::Completion);
    assert_eq!(qualification.score, 91.0);
    assert_eq!(qualification.tier, "hot");
    assert_eq!(qualification.recommended_action, "send_rate_sheet");
    assert_eq!(prospect.contact.phone, "+13128294410");

    // Same company and volume hits the validated cache, not the API
    let again = engine.qualify(&prospect).await;
    assert_eq!(again.source, QualificationSource::Cached);
    assert_eq!(again.score, 91.0);
}

#[tokio::test]
async fn test_engine_fallback_matches_success_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let engine = AcquisitionEngine::new(Some(create_test_client(mock_server.uri())), Some(4));
    let prospect = engine.register_prospect(new_prospect()).await.unwrap();
    let qualification = prospect.qualification.unwrap();

    let expected = fallback_qualification();
    assert_eq!(qualification.source, QualificationSource::Fallback);
    assert_eq!(qualification.score, expected.score);
    assert_eq!(qualification.tier, expected.tier);
    assert!(!qualification.reasoning.is_empty());

    let serialized = serde_json::to_value(&qualification).unwrap();
    for key in ["score", "tier", "reasoning", "recommendedAction", "source"] {
        assert!(serialized.get(key).is_some(), "missing {}", key);
    }
}

#[tokio::test]
async fn test_circuit_opens_after_consecutive_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = create_test_client(mock_server.uri());
    for _ in 0..5 {
        assert_eq!(client.status().breaker, BreakerState::Closed);
        let err = client.complete("system", "user").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
    assert_eq!(client.status().breaker, BreakerState::Open);

    // Sixth call is rejected without reaching the server
    let err = client.complete("system", "user").await.unwrap_err();
    assert!(err.to_string().contains("circuit open"));
}

#[tokio::test]
async fn test_breaker_threshold_comes_from_settings() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = CompletionClient::new(CompletionConfig {
        api_url: mock_server.uri(),
        api_key: "test_key".to_string(),
        model: "test-model".to_string(),
        breaker: BreakerSettings {
            failure_threshold: 2,
            ..BreakerSettings::default()
        },
    })
    .unwrap();

    for _ in 0..4 {
        let _ = client.complete("system", "user").await;
    }
    assert_eq!(client.status().breaker, BreakerState::Open);
}
