//! Paths that bypass admission control.

const EXEMPT_PREFIXES: &[&str] = &["/swagger", "/v3/api-docs", "/actuator", "/health"];

const EXEMPT_SUFFIXES: &[&str] = &[".js", ".css"];

/// True for documentation, health and static asset paths.
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
        || EXEMPT_SUFFIXES.iter().any(|s| path.ends_with(s))
}
