use super::*;
use pretty_assertions::assert_eq;

fn store(url: &str) -> RestStore {
    RestStore::new(url, "anon-key").unwrap()
}

#[test]
fn test_probe_url_default_query() {
    let store = store("https://abc.supabase.co");
    let url = store.probe_url(&ProbeQuery::default()).unwrap();
    assert_eq!(
        url.as_str(),
        "https://abc.supabase.co/rest/v1/settings?select=id&limit=1"
    );
}

#[test]
fn test_probe_url_keeps_base_path() {
    let store = store("http://localhost:54321/project/?x=1#frag");
    let url = store
        .probe_url(&ProbeQuery::new("courses", "slug"))
        .unwrap();
    assert_eq!(
        url.as_str(),
        "http://localhost:54321/project/rest/v1/courses?select=slug&limit=1"
    );
    assert_eq!(store.name(), "localhost");
}

#[test]
fn test_probe_url_rejects_odd_identifiers() {
    let store = store("https://abc.supabase.co");
    for query in [
        ProbeQuery::new("", "id"),
        ProbeQuery::new("settings", ""),
        ProbeQuery::new("../admin", "id"),
        ProbeQuery::new("settings", "id,secret"),
    ] {
        assert!(matches!(
            store.probe_url(&query),
            Err(PortalError::Configuration(_))
        ));
    }
}

#[test]
fn test_new_validates_configuration() {
    assert!(matches!(
        RestStore::new("", "key"),
        Err(PortalError::Configuration(_))
    ));
    assert!(matches!(
        RestStore::new("not a url", "key"),
        Err(PortalError::Configuration(_))
    ));
    assert!(matches!(
        RestStore::new("ftp://example.com", "key"),
        Err(PortalError::Configuration(_))
    ));
    assert!(matches!(
        RestStore::new("https://example.com", "  "),
        Err(PortalError::Configuration(_))
    ));
}

#[test]
fn test_from_settings() {
    let settings = BackendSettings {
        url: "https://abc.supabase.co/".into(),
        anon_key: "key".into(),
        ..BackendSettings::default()
    };
    let store = RestStore::from_settings(&settings).unwrap();
    assert_eq!(store.base_url().as_str(), "https://abc.supabase.co/");
}

#[test]
fn test_backend_error_structured_body() {
    let body = r#"{"code":"42P17","details":null,"hint":null,"message":"infinite recursion detected in policy for relation \"profiles\""}"#;
    let err = backend_error(StatusCode::INTERNAL_SERVER_ERROR, body);

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.code(), Some("42P17"));
    assert_eq!(
        err.to_string(),
        "Backend error: infinite recursion detected in policy for relation \"profiles\""
    );
}

#[test]
fn test_backend_error_appends_details() {
    let body = r#"{"code":"PGRST301","details":"JWT expired","hint":null,"message":"JWSError"}"#;
    let err = backend_error(StatusCode::UNAUTHORIZED, body);

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.code(), Some("PGRST301"));
    assert_eq!(err.to_string(), "Backend error: JWSError (JWT expired)");
}

#[test]
fn test_backend_error_plain_text_body() {
    let err = backend_error(StatusCode::BAD_GATEWAY, "upstream connect error\n");
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.code(), None);
    assert_eq!(err.to_string(), "Backend error: upstream connect error");
}

#[test]
fn test_backend_error_empty_body_uses_reason() {
    let err = backend_error(StatusCode::FORBIDDEN, "");
    assert_eq!(err.to_string(), "Backend error: Forbidden");
}

#[tokio::test]
async fn test_cancelled_request_returns_cancelled() {
    // Unroutable address; the token is already cancelled so no I/O completes
    let store = store("http://10.255.255.1:9");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = store.select_single(&ProbeQuery::default(), &cancel).await;
    assert!(matches!(result, Err(PortalError::Cancelled)));
}
