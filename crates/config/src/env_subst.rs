/// Replace `${ENV_VAR}` and `${ENV_VAR:-default}` placeholders.
///
/// Unresolvable variables without a default are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// [`substitute_env`] with a custom lookup, so tests don't touch the process
/// environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = body.find('}') else {
            // Unterminated: emit the remainder verbatim.
            out.push_str(&rest[start..]);
            return out;
        };
        let placeholder = &rest[start..start + 2 + end + 1];
        let expr = &body[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr, None),
        };

        let value = if name.is_empty() {
            None
        } else {
            lookup(name).or_else(|| default.map(String::from))
        };
        out.push_str(value.as_deref().unwrap_or(placeholder));
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "BEACON_TEST_TOKEN" => Some("123:ABC".to_string()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("token = \"${BEACON_TEST_TOKEN}\"", lookup),
            "token = \"123:ABC\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${BEACON_NOPE}", lookup),
            "${BEACON_NOPE}"
        );
    }

    #[test]
    fn default_used_when_unset() {
        assert_eq!(
            substitute_env_with("${BEACON_NOPE:-beacon.db}", lookup),
            "beacon.db"
        );
        assert_eq!(
            substitute_env_with("${BEACON_TEST_TOKEN:-fallback}", lookup),
            "123:ABC"
        );
    }

    #[test]
    fn malformed_placeholders_are_literal() {
        assert_eq!(substitute_env_with("a ${} b", lookup), "a ${} b");
        assert_eq!(substitute_env_with("a ${OPEN", lookup), "a ${OPEN");
    }

    #[test]
    fn multiple_and_adjacent() {
        assert_eq!(
            substitute_env_with("${BEACON_TEST_TOKEN}${BEACON_TEST_TOKEN}", lookup),
            "123:ABC123:ABC"
        );
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
