use tether::config::{Config, Limits, DEFAULT_MAX_HEADERS, DEFAULT_MAX_LINE_LEN};

#[test]
fn test_config_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.server_name, "localhost");
    assert_eq!(cfg.limits, Limits::default());
    assert_eq!(cfg.limits.max_line_len, DEFAULT_MAX_LINE_LEN);
    assert_eq!(cfg.limits.max_headers, DEFAULT_MAX_HEADERS);
}

// Every environment mutation lives in this one test so parallel tests
// never observe each other's variables.
#[test]
fn test_config_from_env() {
    unsafe {
        std::env::remove_var("TETHER_CONFIG");
        std::env::remove_var("LISTEN");
        std::env::remove_var("SERVER_NAME");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.server_name, "localhost");

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:3000");
        std::env::set_var("SERVER_NAME", "tether.test");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.server.server_name, "tether.test");

    let path = std::env::temp_dir().join(format!("tether-config-{}.yaml", std::process::id()));
    std::fs::write(
        &path,
        "server:\n  listen_addr: \"127.0.0.1:9000\"\n  server_name: file.test\nlimits:\n  max_headers: 10\n",
    )
    .unwrap();
    unsafe {
        std::env::set_var("TETHER_CONFIG", &path);
        std::env::remove_var("SERVER_NAME");
    }
    let cfg = Config::load().unwrap();
    // LISTEN still overrides the file.
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.server.server_name, "file.test");
    assert_eq!(cfg.limits.max_headers, 10);

    unsafe {
        std::env::set_var("TETHER_CONFIG", path.with_extension("missing"));
    }
    assert!(Config::load().is_err());

    unsafe {
        std::env::remove_var("TETHER_CONFIG");
        std::env::remove_var("LISTEN");
    }
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_config_yaml_partial() {
    let cfg = Config::from_yaml_str("limits:\n  max_line_len: 1024\n").unwrap();
    assert_eq!(cfg.limits.max_line_len, 1024);
    assert_eq!(cfg.limits.max_headers, DEFAULT_MAX_HEADERS);
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");

    let cfg = Config::from_yaml_str("{}").unwrap();
    assert_eq!(cfg.limits, Limits::default());
}

#[test]
fn test_config_yaml_rejects_zero_limits() {
    assert!(Config::from_yaml_str("limits:\n  max_line_len: 0\n").is_err());
    assert!(Config::from_yaml_str("limits:\n  max_value_len: 0\n").is_err());
}

#[test]
fn test_config_yaml_rejects_bad_types() {
    assert!(Config::from_yaml_str("limits:\n  max_headers: lots\n").is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::from_yaml_str("server:\n  server_name: a.test\n").unwrap();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.server_name, cfg2.server.server_name);
    assert_eq!(cfg1.limits, cfg2.limits);
}
