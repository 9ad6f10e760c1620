//! # 内部网关集成测试
//!
//! 中继签发的令牌与网关判定之间的契约，以及生成的 nginx 规则。

use pretty_assertions::assert_eq;

use dashboard_relay::auth::{TokenMinter, VerifiedIdentity};
use dashboard_relay::config::{AppConfig, TokenConfig};
use dashboard_relay::gatekeeper::{
    DenyReason, GateOutcome, GatekeeperKeys, IdentityHeaders, deny_body, evaluate,
    render_nginx_rules,
};

const SECRET: &str = "shared-boundary-secret";

fn relay_token(config: &TokenConfig) -> String {
    TokenMinter::new(config)
        .mint(&VerifiedIdentity::new("user-1", "one@example.com", "authenticated"))
        .unwrap()
}

fn boundary_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.token.signing_secret = Some(SECRET.to_string());
    config
}

#[test]
fn token_for_another_audience_never_reaches_metrics_service() {
    let config = boundary_config();
    let keys = GatekeeperKeys::from_config(&config.token).unwrap();

    let mut foreign = config.token.clone();
    foreign.audience = "billing-service".to_string();
    let header = format!("Bearer {}", relay_token(&foreign));

    let outcome = evaluate("/brokers/status", Some(&header), &config.gatekeeper, &keys);
    assert_eq!(outcome, GateOutcome::Deny(DenyReason::InvalidAudience));
    assert_eq!(
        deny_body(DenyReason::InvalidAudience),
        r#"{"error":"unauthorized","reason":"invalid_audience"}"#
    );
}

#[test]
fn relay_token_is_allowed_with_attribution() {
    let config = boundary_config();
    let keys = GatekeeperKeys::from_config(&config.token).unwrap();
    let header = format!("Bearer {}", relay_token(&config.token));

    let outcome = evaluate("/trades/live", Some(&header), &config.gatekeeper, &keys);
    assert_eq!(
        outcome,
        GateOutcome::Allow(IdentityHeaders {
            user_id: "user-1".to_string(),
            email: "one@example.com".to_string(),
        })
    );
}

#[test]
fn token_signed_with_other_secret_or_issuer_is_denied() {
    let config = boundary_config();
    let keys = GatekeeperKeys::from_config(&config.token).unwrap();

    let mut other_secret = config.token.clone();
    other_secret.signing_secret = Some("guessed".to_string());
    let header = format!("Bearer {}", relay_token(&other_secret));
    assert_eq!(
        evaluate("/trades/live", Some(&header), &config.gatekeeper, &keys),
        GateOutcome::Deny(DenyReason::InvalidSignature)
    );

    let mut other_issuer = config.token.clone();
    other_issuer.issuer = "impostor".to_string();
    let header = format!("Bearer {}", relay_token(&other_issuer));
    assert_eq!(
        evaluate("/trades/live", Some(&header), &config.gatekeeper, &keys),
        GateOutcome::Deny(DenyReason::InvalidIssuer)
    );
}

#[test]
fn only_liveness_bypasses_the_gate() {
    let config = boundary_config();
    let keys = GatekeeperKeys::from_config(&config.token).unwrap();

    assert_eq!(
        evaluate("/health", None, &config.gatekeeper, &keys),
        GateOutcome::Bypass
    );
    for path in ["/", "/system/activity", "/metrics/gate-pressure", "/healthz"] {
        assert_eq!(
            evaluate(path, None, &config.gatekeeper, &keys),
            GateOutcome::Deny(DenyReason::MissingCredential),
            "{path} must require a token"
        );
    }
}

#[test]
fn nginx_rules_route_protected_paths_through_gatekeeper() {
    let mut config = boundary_config();
    config.gatekeeper.public_port = 443;
    config.gatekeeper.upstream_addr = "127.0.0.1:9000".to_string();

    let rules = render_nginx_rules(&config);
    assert!(rules.contains("listen 443;"));
    assert!(rules.contains("location = /health {"));
    assert!(rules.contains("location / {\n        proxy_pass http://metrics_gatekeeper;"));
    assert!(!rules.contains("listen 9000"));
}
