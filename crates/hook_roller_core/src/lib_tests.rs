use super::*;
use crate::test_support::{repositories, FakeBitbucket};
use bitbucket_client::{ApiEndpoints, ClientCredentials, Repository};
use serde_json::json;
use std::time::Duration;
use tracing_test::traced_test;
use wiremock::matchers::{
    basic_auth, bearer_token, body_json, method, path, path_regex, query_param,
    query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOOK_URL: &str = "https://ci.example.com/hook";
const FULL_SCOPES: &str = "account:write webhook repository:write project:write";

/// Wiremock-backed stand-in for bitbucket.org and api.bitbucket.org.
struct BitbucketMockServer {
    server: MockServer,
}

impl BitbucketMockServer {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints::new(&self.server.uri(), &self.server.uri()).unwrap()
    }

    async fn token(&self, status: u16, scopes: &str) {
        Mock::given(method("POST"))
            .and(path("/site/oauth2/access_token"))
            .and(basic_auth("key", "secret"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "access_token": "api-token",
                "scopes": scopes,
                "expires_in": 7200,
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    async fn repositories(&self, names: &[&str], expected_calls: u64) {
        let values: Vec<serde_json::Value> = names
            .iter()
            .map(|name| {
                json!({
                    "scm": "git",
                    "full_name": format!("acme/{name}"),
                    "is_private": true,
                    "name": name,
                })
            })
            .collect();

        Mock::given(method("GET"))
            .and(path("/repositories/acme"))
            .and(bearer_token("api-token"))
            .and(query_param("page", "1"))
            .and(query_param("pagelen", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": values,
                "size": names.len(),
                "pagelen": 100,
                "page": 1
            })))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    async fn hooks(&self, name: &str, urls: &[&str]) {
        let values: Vec<serde_json::Value> = urls.iter().map(|u| json!({ "url": u })).collect();

        Mock::given(method("GET"))
            .and(path(format!("/repositories/acme/{name}/hooks")))
            .and(query_param("fields", "values.url,next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": values })))
            .mount(&self.server)
            .await;
    }

    /// Serves the hooks of `name` as two pages: `first` with a `next` link, then `second`.
    async fn paged_hooks(&self, name: &str, first: &[&str], second: &[&str]) {
        let hooks_path = format!("/repositories/acme/{name}/hooks");
        let page = |urls: &[&str]| -> Vec<serde_json::Value> {
            urls.iter().map(|u| json!({ "url": u })).collect()
        };

        Mock::given(method("GET"))
            .and(path(hooks_path.clone()))
            .and(query_param_is_missing("page"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": page(first),
                "next": format!(
                    "{}{hooks_path}?fields=values.url,next&page=2",
                    self.server.uri()
                )
            })))
            .expect(1)
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(hooks_path.clone()))
            .and(query_param("page", "2"))
            .and(bearer_token("api-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": page(second)
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    async fn create_hook(&self, name: &str, status: u16, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/repositories/acme/{name}/hooks")))
            .and(bearer_token("api-token"))
            .and(body_json(json!({
                "description": format!("CI for {name}"),
                "url": HOOK_URL,
                "active": true,
                "events": ["repo:push"]
            })))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Fails the test on any webhook traffic not matched by a more specific mock.
    async fn forbid_other_hook_calls(&self) {
        Mock::given(path_regex(r"^/repositories/.+/hooks$"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }
}

fn config_for(endpoints: ApiEndpoints, events: &str) -> ConfigurationContextBuilder {
    ConfigurationContext::builder(
        ClientCredentials::new("key", "secret"),
        "acme",
        EventSpec::parse_list(events).unwrap(),
        WebhookSettings {
            url: HOOK_URL.to_string(),
            description_template: "CI for {REPO_NAME}".to_string(),
            active: true,
        },
    )
    .endpoints(endpoints)
    .provision_interval(Duration::ZERO)
}

#[tokio::test]
async fn test_provision_account_webhooks_happy_path() {
    let mock = BitbucketMockServer::start().await;
    mock.token(200, FULL_SCOPES).await;
    mock.repositories(&["alpha", "beta"], 1).await;
    mock.hooks("alpha", &[]).await;
    mock.hooks("beta", &[]).await;
    mock.create_hook("alpha", 201, 1).await;
    mock.create_hook("beta", 201, 1).await;

    let config = config_for(mock.endpoints(), "repo:push").build().unwrap();
    let report = provision_account_webhooks(&config).await.unwrap();

    match report {
        RunReport::Provisioned(summary) => {
            assert_eq!(summary.created, 2);
            assert_eq!(
                summary.created_repositories,
                vec!["acme/alpha".to_string(), "acme/beta".to_string()]
            );
            assert!(summary.is_success());
        }
        other => panic!("Expected Provisioned, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provision_account_webhooks_skips_already_provisioned() {
    let mock = BitbucketMockServer::start().await;
    mock.token(200, FULL_SCOPES).await;
    mock.repositories(&["alpha"], 1).await;
    mock.hooks("alpha", &["https://other.example.com", HOOK_URL]).await;
    mock.create_hook("alpha", 201, 0).await;

    let config = config_for(mock.endpoints(), "repo:push").build().unwrap();
    let report = provision_account_webhooks(&config).await.unwrap();

    match report {
        RunReport::Provisioned(summary) => {
            assert_eq!(summary.created, 0);
            assert_eq!(summary.already_present, 1);
        }
        other => panic!("Expected Provisioned, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provision_account_webhooks_finds_existing_hook_on_a_later_page() {
    let mock = BitbucketMockServer::start().await;
    mock.token(200, FULL_SCOPES).await;
    mock.repositories(&["alpha"], 1).await;
    let others: Vec<String> = (1..=10)
        .map(|n| format!("https://other-{n}.example.com"))
        .collect();
    let others: Vec<&str> = others.iter().map(String::as_str).collect();
    mock.paged_hooks("alpha", &others, &[HOOK_URL]).await;
    mock.create_hook("alpha", 201, 0).await;

    let config = config_for(mock.endpoints(), "repo:push").build().unwrap();
    let report = provision_account_webhooks(&config).await.unwrap();

    match report {
        RunReport::Provisioned(summary) => {
            assert_eq!(summary.created, 0);
            assert_eq!(summary.already_present, 1);
        }
        other => panic!("Expected Provisioned, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provision_account_webhooks_rejected_credentials_stop_the_run() {
    let mock = BitbucketMockServer::start().await;
    mock.token(401, "").await;
    mock.repositories(&["alpha"], 0).await;
    mock.forbid_other_hook_calls().await;

    let config = config_for(mock.endpoints(), "repo:push").build().unwrap();
    let result = provision_account_webhooks(&config).await;

    match result {
        Err(HookRollerError::Authentication { status_code }) => assert_eq!(status_code, 401),
        other => panic!("Expected Authentication error, got {other:?}"),
    }
}

#[tokio::test]
#[traced_test]
async fn test_provision_account_webhooks_propagates_failures_without_logging_them_again() {
    let mock = BitbucketMockServer::start().await;
    mock.token(401, "").await;

    let config = config_for(mock.endpoints(), "repo:push").build().unwrap();
    let result = provision_account_webhooks(&config).await;

    assert!(result.is_err());
    logs_assert(|lines: &[&str]| {
        match lines.iter().filter(|line| line.contains("ERROR")).count() {
            0 => Ok(()),
            n => Err(format!("expected no error lines from the orchestrator, found {n}")),
        }
    });
}

#[tokio::test]
async fn test_provision_account_webhooks_missing_base_scopes_stop_the_run() {
    let mock = BitbucketMockServer::start().await;
    mock.token(200, "account:write").await;
    mock.repositories(&["alpha"], 0).await;
    mock.forbid_other_hook_calls().await;

    let config = config_for(mock.endpoints(), "repo:push").build().unwrap();
    let result = provision_account_webhooks(&config).await;

    match result {
        Err(HookRollerError::MissingScopes { missing }) => {
            assert_eq!(
                missing,
                vec![
                    "webhook".to_string(),
                    "repository:write".to_string(),
                    "project:write".to_string()
                ]
            );
        }
        other => panic!("Expected MissingScopes, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provision_account_webhooks_missing_event_scope_stops_the_run() {
    let mock = BitbucketMockServer::start().await;
    mock.token(200, FULL_SCOPES).await;
    mock.repositories(&["alpha"], 0).await;
    mock.forbid_other_hook_calls().await;

    let config = config_for(mock.endpoints(), "repo:push,pullrequest:created")
        .build()
        .unwrap();
    let result = provision_account_webhooks(&config).await;

    match result {
        Err(HookRollerError::MissingScopes { missing }) => {
            assert_eq!(missing, vec!["pullrequest:write".to_string()]);
        }
        other => panic!("Expected MissingScopes, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provision_account_webhooks_continues_past_a_failed_repository() {
    let mock = BitbucketMockServer::start().await;
    mock.token(200, FULL_SCOPES).await;
    mock.repositories(&["alpha", "beta", "gamma"], 1).await;
    for name in ["alpha", "beta", "gamma"] {
        mock.hooks(name, &[]).await;
    }
    mock.create_hook("alpha", 201, 1).await;
    mock.create_hook("beta", 500, 1).await;
    mock.create_hook("gamma", 201, 1).await;

    let config = config_for(mock.endpoints(), "repo:push").build().unwrap();
    let report = provision_account_webhooks(&config).await.unwrap();

    assert!(!report.is_success());
    match report {
        RunReport::Provisioned(summary) => {
            assert_eq!(summary.created, 2);
            assert_eq!(summary.failed_repositories, vec!["acme/beta".to_string()]);
        }
        other => panic!("Expected Provisioned, got {other:?}"),
    }
}

#[tokio::test]
async fn test_provision_account_webhooks_dry_run_creates_nothing() {
    let mock = BitbucketMockServer::start().await;
    mock.token(200, FULL_SCOPES).await;
    mock.repositories(&["alpha", "beta"], 1).await;
    mock.forbid_other_hook_calls().await;

    let config = config_for(mock.endpoints(), "repo:push")
        .dry_run(true)
        .build()
        .unwrap();
    let report = provision_account_webhooks(&config).await.unwrap();

    assert_eq!(
        report,
        RunReport::DryRun {
            repositories: vec!["acme/alpha".to_string(), "acme/beta".to_string()]
        }
    );
    assert_eq!(report.repository_count(), 2);
}

#[tokio::test]
async fn test_provision_with_client_listing_failure_creates_nothing() {
    let fake = FakeBitbucket::with_repositories(repositories(150)).fail_page(2, 502);
    let config = config_for(ApiEndpoints::default(), "repo:push").build().unwrap();

    let result = provision_with_client(&fake, &config, &NoopObserver).await;

    assert!(matches!(
        result,
        Err(HookRollerError::RepositoryFetch {
            page: 2,
            status_code: 502
        })
    ));
    assert!(fake.created().is_empty());
}

#[derive(Default)]
struct RecordingObserver {
    seen: std::sync::Mutex<Vec<String>>,
}

impl ProvisionObserver for RecordingObserver {
    fn repository_provisioned(&self, repository: &Repository, outcome: ProvisionOutcome) {
        self.seen
            .lock()
            .unwrap()
            .push(format!("{outcome:?} {}", repository.full_name));
    }

    fn repository_failed(&self, repository: &Repository, _error: &HookRollerError) {
        self.seen
            .lock()
            .unwrap()
            .push(format!("Failed {}", repository.full_name));
    }
}

#[tokio::test]
async fn test_provision_with_client_reports_each_repository_to_observer() {
    let fake = FakeBitbucket::with_repositories(repositories(3))
        .with_existing_hook("acme/repo-1", HOOK_URL)
        .fail_create("acme/repo-2", 500);
    let config = config_for(ApiEndpoints::default(), "repo:push").build().unwrap();
    let observer = RecordingObserver::default();

    provision_with_client(&fake, &config, &observer).await.unwrap();

    assert_eq!(
        *observer.seen.lock().unwrap(),
        vec![
            "AlreadyPresent acme/repo-1".to_string(),
            "Failed acme/repo-2".to_string(),
            "Created acme/repo-3".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_provision_with_client_dry_run_does_not_notify_observer() {
    let fake = FakeBitbucket::with_repositories(repositories(2));
    let config = config_for(ApiEndpoints::default(), "repo:push")
        .dry_run(true)
        .build()
        .unwrap();
    let observer = RecordingObserver::default();

    provision_with_client(&fake, &config, &observer).await.unwrap();

    assert!(observer.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_provision_with_client_respects_disabled_existence_check() {
    let fake = FakeBitbucket::with_repositories(repositories(2))
        .with_existing_hook("acme/repo-1", HOOK_URL);
    let config = config_for(ApiEndpoints::default(), "repo:push")
        .check_existing(false)
        .build()
        .unwrap();

    let report = provision_with_client(&fake, &config, &NoopObserver).await.unwrap();

    assert_eq!(report.repository_count(), 2);
    assert_eq!(fake.created().len(), 2);
}

#[test]
fn test_validate_token_scopes_accepts_admin_scope_for_repo_events() {
    let token = AccessToken::new(
        "token",
        "account:write webhook repository:write project:write repository:admin",
    );
    let events = EventSpec::parse_list("repo:push,repo:fork").unwrap();

    assert!(validate_token_scopes(&token, &events).is_ok());
}

#[test]
fn test_validate_token_scopes_reports_issue_scope() {
    let token = AccessToken::new("token", FULL_SCOPES);
    let events = EventSpec::parse_list("issue:created,issue:updated").unwrap();

    let err = validate_token_scopes(&token, &events).unwrap_err();

    assert_eq!(err.to_string(), "Missing required scopes: issues:write");
}

#[test]
fn test_run_report_serializes_mode() {
    let report = RunReport::DryRun {
        repositories: vec!["acme/a".to_string()],
    };

    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["mode"], "dry_run");
    assert_eq!(value["repositories"][0], "acme/a");
}
