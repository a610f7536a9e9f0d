//! `${ENV_VAR}` substitution for config file contents.

/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Substitution against a custom lookup, so tests never mutate the process
/// environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            // Unclosed or empty placeholder: emit the rest literally.
            _ => {
                out.push_str(&rest[start..]);
                return out;
            },
        }
    }

    out.push_str(rest);
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        let lookup = |name: &str| match name {
            "CHATSPOUT_TEST_VAR" => Some("hello".to_string()),
            _ => None,
        };
        assert_eq!(
            substitute_env_with("key=${CHATSPOUT_TEST_VAR}", lookup),
            "key=hello"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        let lookup = |_: &str| None;
        assert_eq!(substitute_env_with("key=${MISSING}", lookup), "key=${MISSING}");
    }

    #[test]
    fn leaves_malformed_placeholder() {
        let lookup = |_: &str| Some("x".to_string());
        assert_eq!(substitute_env_with("key=${UNCLOSED", lookup), "key=${UNCLOSED");
        assert_eq!(substitute_env_with("key=${}", lookup), "key=${}");
    }

    #[test]
    fn plain_dollar_passes_through() {
        let lookup = |_: &str| None;
        assert_eq!(substitute_env_with("cost: $5", lookup), "cost: $5");
    }

    #[test]
    fn substitutes_multiple_placeholders() {
        let lookup = |name: &str| Some(name.to_ascii_lowercase());
        assert_eq!(
            substitute_env_with("${A}-${B}", lookup),
            "a-b"
        );
    }
}
