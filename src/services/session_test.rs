use super::*;

#[test]
fn bearer_token_extracts_value() {
    assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
    assert_eq!(bearer_token("Bearer   abc "), Some("abc"));
}

#[test]
fn bearer_token_rejects_other_schemes() {
    assert_eq!(bearer_token("Basic abc"), None);
    assert_eq!(bearer_token("Bearer "), None);
    assert_eq!(bearer_token(""), None);
}
