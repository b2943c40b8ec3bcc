use crate::storage::KeyValueStore;

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const DASHBOARD_PATH: &str = "/dashboard";

const PUBLIC_PATHS: [&str; 3] = ["/auth/signin", "/auth/signup", "/auth/error"];
const GUARDED_PREFIXES: [&str; 5] = ["/dashboard", "/documents", "/notes", "/auth", "/profile"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
}

fn is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Decide whether `path` may render for a visitor with or without a session.
///
/// Signed-out visitors on guarded paths go to sign-in; signed-in visitors on the
/// public auth pages go to the dashboard. Paths outside the guarded prefixes are
/// always allowed.
pub fn guard_route(path: &str, has_token: bool) -> RouteDecision {
    if !GUARDED_PREFIXES.iter().any(|p| is_under(path, p)) {
        return RouteDecision::Allow;
    }

    let is_public = PUBLIC_PATHS.contains(&path);
    match (is_public, has_token) {
        (true, true) => RouteDecision::Redirect(DASHBOARD_PATH),
        (false, false) => RouteDecision::Redirect(SIGN_IN_PATH),
        _ => RouteDecision::Allow,
    }
}

/// Whether a non-empty session token is stored under `key`.
pub fn has_session_token(kv: &impl KeyValueStore, key: &str) -> bool {
    kv.get_item(key)
        .ok()
        .flatten()
        .is_some_and(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_signed_out_visitors_go_to_sign_in() {
        for path in ["/notes", "/notes/abc", "/dashboard", "/profile", "/documents/1"] {
            assert_eq!(
                guard_route(path, false),
                RouteDecision::Redirect(SIGN_IN_PATH),
                "path: {path}"
            );
            assert_eq!(guard_route(path, true), RouteDecision::Allow, "path: {path}");
        }
    }

    #[test]
    fn test_signed_in_visitors_skip_public_auth_pages() {
        for path in PUBLIC_PATHS {
            assert_eq!(guard_route(path, true), RouteDecision::Redirect(DASHBOARD_PATH));
            assert_eq!(guard_route(path, false), RouteDecision::Allow);
        }
    }

    #[test]
    fn test_unmatched_paths_are_untouched() {
        assert_eq!(guard_route("/", false), RouteDecision::Allow);
        assert_eq!(guard_route("/notesx", false), RouteDecision::Allow);
        assert_eq!(guard_route("/about", true), RouteDecision::Allow);
        // other auth pages are guarded but not public
        assert_eq!(
            guard_route("/auth/callback", false),
            RouteDecision::Redirect(SIGN_IN_PATH)
        );
    }

    #[test]
    fn test_token_lookup() {
        let kv = MemoryStorage::new();
        assert!(!has_session_token(&kv, "t"));
        kv.set_item("t", " ").expect("write");
        assert!(!has_session_token(&kv, "t"));
        kv.set_item("t", "jwt").expect("write");
        assert!(has_session_token(&kv, "t"));
    }
}
