//! `{placeholder}` substitution for prompt templates.

/// Fills every `{name}` in `template` with its value in a single left-to-right
/// pass. Inserted values are never rescanned, so user text that looks like a
/// placeholder is carried through verbatim. Unknown `{...}` sequences are kept.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let capacity = template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>();
    let mut out = String::with_capacity(capacity);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let matched = values.iter().find_map(|&(name, value)| {
            after
                .strip_prefix(name)
                .and_then(|r| r.strip_prefix('}'))
                .map(|remainder| (value, remainder))
        });

        match matched {
            Some((value, remainder)) => {
                out.push_str(value);
                rest = remainder;
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_each_placeholder() {
        let out = fill(
            "Resume: {resume}\nJD: {jd}\nAgain: {resume}",
            &[("resume", "Rust dev"), ("jd", "Backend role")],
        );
        assert_eq!(out, "Resume: Rust dev\nJD: Backend role\nAgain: Rust dev");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let out = fill(
            "A={a} B={b}",
            &[("a", "uses {b} literally"), ("b", "second")],
        );
        assert_eq!(out, "A=uses {b} literally B=second");
    }

    #[test]
    fn test_unknown_and_unbalanced_braces_are_kept() {
        let out = fill("{x} {a} { {a", &[("a", "1")]);
        assert_eq!(out, "{x} 1 { {a");
    }

    #[test]
    fn test_empty_value_and_multibyte_text() {
        let out = fill("caf\u{e9} [{v}] \u{258c}", &[("v", "")]);
        assert_eq!(out, "caf\u{e9} [] \u{258c}");
    }
}
