use serde_json::{json, Value};
use std::time::Duration;
use superplane_integrations::core::catalog::Catalog;
use superplane_integrations::core::component::ExecutionContext;
use superplane_integrations::core::types::ErrorCategory;
use superplane_integrations::integrations::cloudflare::{
    CloudflareIntegration, CloudflareSettings, REDIRECT_PHASE,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog(server: &MockServer) -> Catalog {
    let settings = CloudflareSettings {
        api_token: "cf-token".to_string(),
        base_url: server.uri(),
    };
    let mut builder = Catalog::builder();
    builder.register(CloudflareIntegration::new(&settings, Duration::from_secs(5)));
    builder.build()
}

fn envelope(result: Value) -> Value {
    json!({"success": true, "errors": [], "messages": [], "result": result})
}

#[tokio::test]
async fn create_dns_record_emits_record_on_default_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .and(header("authorization", "Bearer cf-token"))
        .and(body_partial_json(json!({
            "type": "A",
            "name": "api.example.com",
            "content": "192.0.2.10",
            "ttl": 300,
            "proxied": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "rec-1",
            "zone_id": "zone-1",
            "type": "A",
            "name": "api.example.com",
            "content": "192.0.2.10",
            "ttl": 300,
            "proxied": true,
            "created_on": "2024-05-01T10:00:00Z"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("cloudflare.createDnsRecord")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "zoneId": "zone-1",
            "type": "a",
            "name": "api.example.com",
            "content": "192.0.2.10",
            "ttl": 300,
            "proxied": true
        })))
        .await
        .unwrap();

    assert_eq!(emission.channel, "default");
    assert_eq!(emission.payload_type(), Some("cloudflare.dnsRecord"));
    let data = emission.data();
    assert_eq!(data["id"], "rec-1");
    assert_eq!(data["zoneId"], "zone-1");
    assert_eq!(data["proxied"], true);
    assert_eq!(data["createdOn"], "2024-05-01T10:00:00Z");
}

#[tokio::test]
async fn create_dns_record_routes_rejection_to_failed_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "errors": [{"code": 81057, "message": "Record already exists."}],
            "messages": [],
            "result": null
        })))
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("cloudflare.createDnsRecord")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "zoneId": "zone-1",
            "type": "TXT",
            "name": "_verify.example.com",
            "content": "token"
        })))
        .await
        .unwrap();

    assert!(emission.is_failed());
    assert_eq!(emission.data()["status"], 400);
    assert_eq!(emission.data()["errors"][0]["code"], 81057);
}

#[tokio::test]
async fn unauthorized_is_returned_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/rec-1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "errors": [{"code": 10000, "message": "Authentication error"}],
            "result": null
        })))
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("cloudflare.deleteDnsRecord")
        .unwrap();
    let err = component
        .execute(ExecutionContext::new(
            json!({"zoneId": "zone-1", "recordId": "rec-1"}),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::AuthenticationError);
    assert_eq!(err.code, "CLOUDFLARE-10000");
}

#[tokio::test]
async fn delete_missing_record_emits_failed() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "errors": [{"code": 81044, "message": "Record does not exist."}],
            "result": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/zones/zone-1/dns_records/rec-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({"id": "rec-2"}))))
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("cloudflare.deleteDnsRecord")
        .unwrap();
    let missing = component
        .execute(ExecutionContext::new(
            json!({"zoneId": "zone-1", "recordId": "gone"}),
        ))
        .await
        .unwrap();
    assert!(missing.is_failed());

    let deleted = component
        .execute(ExecutionContext::new(
            json!({"zoneId": "zone-1", "recordId": "rec-2"}),
        ))
        .await
        .unwrap();
    assert_eq!(deleted.channel, "default");
    assert_eq!(deleted.data(), &json!({"id": "rec-2"}));
}

#[tokio::test]
async fn redirect_rule_is_appended_to_existing_entrypoint() {
    let server = MockServer::start().await;
    let entrypoint = format!("/zones/zone-1/rulesets/phases/{}/entrypoint", REDIRECT_PHASE);
    Mock::given(method("GET"))
        .and(path(entrypoint.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "rs-1",
            "phase": REDIRECT_PHASE,
            "rules": []
        }))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/rulesets/rs-1/rules"))
        .and(body_partial_json(json!({
            "action": "redirect",
            "expression": "(http.host eq \"old.example.com\" and starts_with(http.request.uri.path, \"/docs\"))",
            "action_parameters": {"from_value": {"status_code": 301}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "rs-1",
            "phase": REDIRECT_PHASE,
            "rules": [
                {"id": "older", "expression": "(http.host eq \"x\")", "enabled": true},
                {
                    "id": "rule-9",
                    "expression": "(http.host eq \"old.example.com\" and starts_with(http.request.uri.path, \"/docs\"))",
                    "description": "Move docs",
                    "enabled": true
                }
            ]
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("cloudflare.createRedirectRule")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "zoneId": "zone-1",
            "sourceHost": "old.example.com",
            "sourcePath": "/docs",
            "targetUrl": "https://new.example.com/docs",
            "statusCode": 301,
            "description": "Move docs"
        })))
        .await
        .unwrap();

    assert_eq!(emission.channel, "default");
    let data = emission.data();
    assert_eq!(data["rulesetId"], "rs-1");
    assert_eq!(data["id"], "rule-9");
    assert_eq!(data["statusCode"], 301);
    assert_eq!(data["targetUrl"], "https://new.example.com/docs");
}

#[tokio::test]
async fn redirect_rule_creates_entrypoint_when_missing() {
    let server = MockServer::start().await;
    let entrypoint = format!("/zones/zone-1/rulesets/phases/{}/entrypoint", REDIRECT_PHASE);
    Mock::given(method("GET"))
        .and(path(entrypoint.as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "errors": [{"code": 10003, "message": "could not find entrypoint ruleset"}],
            "result": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(entrypoint.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "rs-new",
            "phase": REDIRECT_PHASE,
            "rules": [{"id": "rule-1", "expression": "(http.host eq \"a.example.com\")", "enabled": true}]
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("cloudflare.createRedirectRule")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "zoneId": "zone-1",
            "sourceHost": "a.example.com",
            "targetUrl": "https://b.example.com"
        })))
        .await
        .unwrap();

    assert_eq!(emission.data()["rulesetId"], "rs-new");
    assert_eq!(emission.data()["id"], "rule-1");
    assert_eq!(emission.data()["statusCode"], 302);
}

#[tokio::test]
async fn sync_requires_active_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/tokens/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "tok-1",
            "status": "disabled"
        }))))
        .mount(&server)
        .await;

    let integration = catalog(&server).integration("cloudflare").unwrap();
    let err = integration.sync().await.unwrap_err();
    assert_eq!(err.code, "CLOUDFLARE-TOKEN-INACTIVE");
}
