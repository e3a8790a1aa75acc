use portico::config::HandlerConfig;

#[test]
fn test_default_config() {
    let config = HandlerConfig::default();

    assert!(config.origin_server);
    assert_eq!(config.http_version, "1.0");
    assert!(config.server_software.is_none());
    assert_eq!(config.error_status, "500 Internal Server Error");
    assert_eq!(
        config.error_headers,
        vec![("Content-Type".to_string(), "text/plain".to_string())]
    );
    assert!(config.error_body.contains("server error"));
    assert!(config.traceback_limit.is_none());
    assert!(config.multithread);
    assert!(!config.multiprocess);
    assert!(!config.run_once);
}

#[test]
fn test_cgi_preset() {
    let config = HandlerConfig::cgi();

    assert!(!config.origin_server);
    assert!(!config.multithread);
    assert!(config.multiprocess);
    assert!(config.run_once);
    // Everything else keeps the regular defaults
    assert_eq!(config.error_status, "500 Internal Server Error");
}

#[test]
fn test_parse_yaml() {
    let yaml = r#"
origin_server: false
http_version: "1.1"
server_software: "portico/0.1"
error_status: "503 Service Unavailable"
error_headers:
  - ["Content-Type", "text/html"]
  - ["Retry-After", "30"]
error_body: "<h1>down</h1>"
traceback_limit: 3
run_once: true
"#;
    let config: HandlerConfig = serde_yaml::from_str(yaml).unwrap();

    assert!(!config.origin_server);
    assert_eq!(config.http_version, "1.1");
    assert_eq!(config.server_software.as_deref(), Some("portico/0.1"));
    assert_eq!(config.error_status, "503 Service Unavailable");
    assert_eq!(config.error_headers.len(), 2);
    assert_eq!(config.error_headers[1].0, "Retry-After");
    assert_eq!(config.error_body, "<h1>down</h1>");
    assert_eq!(config.traceback_limit, Some(3));
    assert!(config.run_once);
    // Unspecified fields fall back to defaults
    assert!(config.multithread);
}

#[test]
fn test_partial_yaml_uses_defaults() {
    let config: HandlerConfig = serde_yaml::from_str("server_software: \"x/1\"\n").unwrap();

    assert_eq!(config.server_software.as_deref(), Some("x/1"));
    assert!(config.origin_server);
    assert_eq!(config.http_version, "1.0");
}

#[test]
fn test_from_file() {
    let path = std::env::temp_dir().join("portico-test-config.yaml");
    std::fs::write(&path, "http_version: \"1.1\"\n").unwrap();

    let config = HandlerConfig::from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.http_version, "1.1");

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_from_file_missing() {
    let err = HandlerConfig::from_file("/nonexistent/portico.yaml").unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
