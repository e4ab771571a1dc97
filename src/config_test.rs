use super::*;

// =============================================================================
// env_parse: uses unique env var names to avoid races with parallel tests.
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: u32 = env_parse("__TEST_SD_NONEXISTENT_KEY_4411__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__TEST_SD_EP_VALID__", " 99 ") };
    let val: u64 = env_parse("__TEST_SD_EP_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__TEST_SD_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__TEST_SD_EP_INVALID__", "soon") };
    let val: u16 = env_parse("__TEST_SD_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__TEST_SD_EP_INVALID__") };
}

#[test]
fn missing_database_url_error_names_the_var() {
    let err = ConfigError::Missing("DATABASE_URL");
    assert_eq!(err.to_string(), "missing required env var DATABASE_URL");
}
