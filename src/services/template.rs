use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Replaces every `{{key}}` occurrence in subject and body with the mapped
/// value. Literal braces, values inserted verbatim, unknown text untouched.
pub fn render(subject: &str, body: &str, vars: &HashMap<String, String>) -> RenderedEmail {
    RenderedEmail {
        subject: substitute(subject, vars),
        body: substitute(body, vars),
    }
}

fn substitute(text: &str, vars: &HashMap<String, String>) -> String {
    let mut out = text.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let rendered = render(
            "Hello {{name}}",
            "{{name}}, your code is {{code}}. Again: {{code}}",
            &vars(&[("name", "Jane"), ("code", "123456")]),
        );
        assert_eq!(rendered.subject, "Hello Jane");
        assert_eq!(rendered.body, "Jane, your code is 123456. Again: 123456");
    }

    #[test]
    fn leaves_unknown_tokens_untouched() {
        let rendered = render(
            "{{greeting}} there",
            "literal {braces} and {{unmapped}} stay",
            &vars(&[("name", "Jane")]),
        );
        assert_eq!(rendered.subject, "{{greeting}} there");
        assert_eq!(rendered.body, "literal {braces} and {{unmapped}} stay");
    }

    #[test]
    fn values_inserted_verbatim() {
        let rendered = render(
            "{{subject}}",
            "<p>{{html}}</p>",
            &vars(&[("subject", "a & b"), ("html", "<b>bold</b>")]),
        );
        assert_eq!(rendered.subject, "a & b");
        assert_eq!(rendered.body, "<p><b>bold</b></p>");
    }
}
