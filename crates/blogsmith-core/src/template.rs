// ABOUTME: Placeholder interpolation for agent and task prompt templates.
// ABOUTME: Replaces `{name}` with a kickoff input; unknown placeholders are left untouched.

use std::collections::BTreeMap;

/// Named values substituted into templates at kickoff (e.g. `topic`).
pub type Inputs = BTreeMap<String, String>;

/// Replace every `{key}` whose key is present in `inputs`.
///
/// Braces that do not form a known placeholder are copied through verbatim,
/// so literal JSON or code in a prompt survives interpolation.
pub fn interpolate(template: &str, inputs: &Inputs) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match after_open.find('}') {
            Some(close) => {
                let key = &after_open[..close];
                match inputs.get(key) {
                    Some(value) if is_placeholder_name(key) => {
                        out.push_str(value);
                        rest = &after_open[close + 1..];
                    }
                    _ => {
                        out.push('{');
                        rest = after_open;
                    }
                }
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_placeholder_name(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build an Inputs map holding just the topic.
pub fn topic_inputs(topic: &str) -> Inputs {
    let mut inputs = Inputs::new();
    inputs.insert("topic".to_string(), topic.to_string());
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_known_placeholder() {
        let inputs = topic_inputs("Rust");
        assert_eq!(
            interpolate("Write about {topic} and {topic} again", &inputs),
            "Write about Rust and Rust again"
        );
    }

    #[test]
    fn unknown_placeholder_is_left_alone() {
        let inputs = topic_inputs("Rust");
        assert_eq!(interpolate("Hello {name}", &inputs), "Hello {name}");
    }

    #[test]
    fn literal_braces_survive() {
        let inputs = topic_inputs("Rust");
        let template = r#"Return {"commands": []} for {topic}"#;
        assert_eq!(
            interpolate(template, &inputs),
            r#"Return {"commands": []} for Rust"#
        );
    }

    #[test]
    fn unclosed_brace_is_copied() {
        let inputs = topic_inputs("Rust");
        assert_eq!(interpolate("about {topic", &inputs), "about {topic");
    }

    #[test]
    fn multibyte_text_is_preserved() {
        let inputs = topic_inputs("café ☕");
        assert_eq!(interpolate("☕ {topic} ☕", &inputs), "☕ café ☕ ☕");
    }
}
