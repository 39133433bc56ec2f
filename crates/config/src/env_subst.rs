//! `${ENV_VAR}` substitution in raw config text.

/// Replace `${ENV_VAR}` placeholders with environment values.
///
/// Unresolvable or malformed placeholders are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

// Separate lookup injection keeps this testable without mutating the
// process environment.
fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup_non_empty(name, &lookup) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            None => {
                // Unclosed placeholder; emit the remainder literally.
                out.push_str(&rest[start..]);
                rest = "";
            },
        }
    }

    out.push_str(rest);
    out
}

fn lookup_non_empty(name: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    if name.is_empty() { None } else { lookup(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake(name: &str) -> Option<String> {
        match name {
            "PARTYLINE_NICK" => Some("bridgebot".to_string()),
            "EMPTYISH" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_with("nick = \"${PARTYLINE_NICK}\"", fake),
            "nick = \"bridgebot\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(substitute_with("${NOPE_XYZ}", fake), "${NOPE_XYZ}");
    }

    #[test]
    fn handles_multiple_placeholders() {
        assert_eq!(
            substitute_with("${PARTYLINE_NICK}/${NOPE}/${PARTYLINE_NICK}", fake),
            "bridgebot/${NOPE}/bridgebot"
        );
    }

    #[test]
    fn unclosed_placeholder_is_literal() {
        assert_eq!(substitute_with("tail ${OPEN", fake), "tail ${OPEN");
    }

    #[test]
    fn empty_name_is_literal() {
        assert_eq!(substitute_with("${}", fake), "${}");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_with("plain text", fake), "plain text");
    }

    #[test]
    fn empty_value_substitutes() {
        assert_eq!(substitute_with("x${EMPTYISH}y", fake), "xy");
    }
}
