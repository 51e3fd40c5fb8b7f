use tether::http::header::{canonical_name, HeaderMap};

#[test]
fn test_canonical_name() {
    assert_eq!(canonical_name("host"), "Host");
    assert_eq!(canonical_name("CONTENT-TYPE"), "Content-Type");
    assert_eq!(canonical_name("sec-websocket-key1"), "Sec-Websocket-Key1");
    assert_eq!(canonical_name("x--y"), "X--Y");
}

#[test]
fn test_lookup_is_case_insensitive() {
    let mut headers = HeaderMap::new();
    headers.append("content-length", "42");

    assert_eq!(headers.get("Content-Length"), Some("42"));
    assert_eq!(headers.get("CONTENT-LENGTH"), Some("42"));
    assert!(headers.contains("content-length"));
    assert_eq!(headers.get("Missing"), None);
    assert!(headers.get_all("Missing").is_empty());
}

#[test]
fn test_set_replaces_all_values() {
    let mut headers = HeaderMap::from_pairs([("Accept", "a"), ("accept", "b")]);
    assert_eq!(headers.get_all("Accept").len(), 2);

    headers.set("ACCEPT", "c");
    assert_eq!(headers.get_all("Accept"), ["c".to_string()]);
    assert_eq!(headers.len(), 1);
}

#[test]
fn test_remove() {
    let mut headers = HeaderMap::from_pairs([("A", "1"), ("B", "2")]);
    assert_eq!(headers.remove("a"), Some(vec!["1".to_string()]));
    assert_eq!(headers.remove("a"), None);
    assert_eq!(headers.len(), 1);
}

#[test]
fn test_iteration_keeps_insertion_order() {
    let headers = HeaderMap::from_pairs([("Zeta", "1"), ("Alpha", "2"), ("zeta", "3")]);
    let pairs: Vec<_> = headers.iter().collect();
    assert_eq!(pairs, vec![("Zeta", "1"), ("Zeta", "3"), ("Alpha", "2")]);
}
