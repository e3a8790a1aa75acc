use bytes::Bytes;
use portico::config::HandlerConfig;
use portico::gateway::environ::{BaseEnviron, Environ, RequestMeta};

fn build(base: &BaseEnviron, meta: RequestMeta, config: &HandlerConfig) -> Environ {
    Environ::build(
        base,
        meta,
        config,
        Box::new(tokio::io::empty()),
        Box::new(tokio::io::sink()),
    )
}

fn meta() -> RequestMeta {
    RequestMeta {
        request_method: Bytes::from_static(b"GET"),
        path_info: Bytes::from_static(b"/"),
        server_name: Bytes::from_static(b"127.0.0.1"),
        server_port: Bytes::from_static(b"80"),
        server_protocol: Bytes::from_static(b"HTTP/1.1"),
        ..RequestMeta::default()
    }
}

#[test]
fn test_base_environment_is_copied() {
    let mut base = BaseEnviron::new();
    base.insert("DEPLOY_COLOR", Bytes::from_static(b"green"));

    let env = build(&base, meta(), &HandlerConfig::default());

    assert_eq!(env.var("DEPLOY_COLOR").unwrap().as_ref(), b"green");
    // The snapshot itself is untouched
    assert_eq!(base.get("DEPLOY_COLOR").unwrap().as_ref(), b"green");
}

#[test]
fn test_request_headers_become_http_vars() {
    let mut m = meta();
    m.headers.push((
        Bytes::from_static(b"X-Forwarded-For"),
        Bytes::from_static(b"10.0.0.1"),
    ));
    m.headers.push((
        Bytes::from_static(b"host"),
        Bytes::from_static(b"example.com"),
    ));

    let env = build(&BaseEnviron::new(), m, &HandlerConfig::default());

    assert_eq!(
        env.var("HTTP_X_FORWARDED_FOR").unwrap().as_ref(),
        b"10.0.0.1"
    );
    assert_eq!(env.var("HTTP_HOST").unwrap().as_ref(), b"example.com");
    assert_eq!(env.http_header("Host").unwrap().as_ref(), b"example.com");
}

#[test]
fn test_repeated_headers_comma_joined() {
    let mut m = meta();
    m.headers.push((
        Bytes::from_static(b"Accept"),
        Bytes::from_static(b"text/html"),
    ));
    m.headers.push((
        Bytes::from_static(b"Accept"),
        Bytes::from_static(b"application/json"),
    ));

    let env = build(&BaseEnviron::new(), m, &HandlerConfig::default());

    assert_eq!(
        env.var("HTTP_ACCEPT").unwrap().as_ref(),
        b"text/html,application/json"
    );
}

#[test]
fn test_content_headers_routed_to_typed_fields() {
    let mut m = meta();
    m.headers.push((
        Bytes::from_static(b"Content-Type"),
        Bytes::from_static(b"text/plain"),
    ));
    m.headers.push((
        Bytes::from_static(b"Content-Length"),
        Bytes::from_static(b"42"),
    ));

    let env = build(&BaseEnviron::new(), m, &HandlerConfig::default());

    assert_eq!(env.content_type.as_ref().unwrap().as_ref(), b"text/plain");
    assert_eq!(env.content_length.as_ref().unwrap().as_ref(), b"42");
    assert!(env.var("HTTP_CONTENT_TYPE").is_none());
    assert!(env.var("HTTP_CONTENT_LENGTH").is_none());
}

#[test]
fn test_typed_content_fields_win_over_headers() {
    let mut m = meta();
    m.content_type = Some(Bytes::from_static(b"application/json"));
    m.headers.push((
        Bytes::from_static(b"Content-Type"),
        Bytes::from_static(b"text/plain"),
    ));

    let env = build(&BaseEnviron::new(), m, &HandlerConfig::default());

    assert_eq!(
        env.content_type.as_ref().unwrap().as_ref(),
        b"application/json"
    );
}

#[test]
fn test_scheme_guessed_from_https_flag() {
    for flag in [&b"yes"[..], b"on", b"1"] {
        let mut m = meta();
        m.https = Some(Bytes::copy_from_slice(flag));
        let env = build(&BaseEnviron::new(), m, &HandlerConfig::default());
        assert_eq!(env.url_scheme.as_ref(), b"https");
    }

    let mut m = meta();
    m.https = Some(Bytes::from_static(b"off"));
    let env = build(&BaseEnviron::new(), m, &HandlerConfig::default());
    assert_eq!(env.url_scheme.as_ref(), b"http");

    let env = build(&BaseEnviron::new(), meta(), &HandlerConfig::default());
    assert_eq!(env.url_scheme.as_ref(), b"http");
}

#[test]
fn test_server_software_defaulted_for_origin_servers() {
    let config = HandlerConfig {
        server_software: Some("portico/0.1".to_string()),
        ..HandlerConfig::default()
    };

    let env = build(&BaseEnviron::new(), meta(), &config);
    assert_eq!(env.var("SERVER_SOFTWARE").unwrap().as_ref(), b"portico/0.1");
}

#[test]
fn test_server_software_never_overrides_transport_value() {
    let mut base = BaseEnviron::new();
    base.insert("SERVER_SOFTWARE", Bytes::from_static(b"bigserver/9"));
    let config = HandlerConfig {
        server_software: Some("portico/0.1".to_string()),
        ..HandlerConfig::default()
    };

    let env = build(&base, meta(), &config);
    assert_eq!(env.var("SERVER_SOFTWARE").unwrap().as_ref(), b"bigserver/9");
}

#[test]
fn test_server_software_not_defaulted_for_cgi_gateways() {
    let config = HandlerConfig {
        server_software: Some("portico/0.1".to_string()),
        ..HandlerConfig::cgi()
    };

    let env = build(&BaseEnviron::new(), meta(), &config);
    assert!(env.var("SERVER_SOFTWARE").is_none());
}

#[test]
fn test_raw_path_info_exposed_when_distinct() {
    let mut m = meta();
    m.path_info = Bytes::from_static(b"/a b");
    m.raw_path_info = Some(Bytes::from_static(b"/a%20b"));

    let env = build(&BaseEnviron::new(), m, &HandlerConfig::default());
    assert_eq!(env.raw_path_info.as_ref().unwrap().as_ref(), b"/a%20b");
}

#[test]
fn test_concurrency_flags_follow_config() {
    let env = build(&BaseEnviron::new(), meta(), &HandlerConfig::cgi());

    assert!(!env.multithread);
    assert!(env.multiprocess);
    assert!(env.run_once);
    // Advisory flag only; deferred responses are still rejected
    assert!(!env.async_capable);
    assert_eq!(env.version, (1, 0));
}

#[test]
fn test_testing_defaults() {
    let env = Environ::testing_defaults();

    assert_eq!(env.request_method.as_ref(), b"GET");
    assert_eq!(env.script_name.as_ref(), b"");
    assert_eq!(env.path_info.as_ref(), b"/");
    assert_eq!(env.server_protocol.as_ref(), b"HTTP/1.0");
    assert_eq!(env.http_header("Host").unwrap().as_ref(), b"127.0.0.1");
    assert_eq!(env.url_scheme.as_ref(), b"http");
}
