use crate::core::models::{FormProfile, ProfileOrigin, SubmitMethod};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use url::Url;

const IDENTITY_KEYWORDS: [&str; 3] = ["user", "email", "login"];
const DEFAULT_IDENTITY_FIELD: &str = "username";

static FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").expect("static selector"));
static CONTROLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, textarea, select, button").expect("static selector"));

#[derive(Debug)]
struct Control {
    tag: String,
    kind: String,
    key: Option<String>,
    id: Option<String>,
    placeholder: Option<String>,
    value: Option<String>,
    checked: bool,
}

impl Control {
    fn read(element: ElementRef<'_>, id_as_key: bool) -> Self {
        let el = element.value();
        let tag = el.name().to_ascii_lowercase();
        let kind = match el.attr("type") {
            Some(t) => t.trim().to_ascii_lowercase(),
            None if tag == "input" => "text".to_string(),
            None => tag.clone(),
        };
        let attr = |name: &str| el.attr(name).map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
        let id = attr("id");
        let key = attr("name").or_else(|| if id_as_key { id.clone() } else { None });

        Self {
            tag,
            kind,
            key,
            id,
            placeholder: attr("placeholder"),
            value: el.attr("value").map(str::to_string),
            checked: el.attr("checked").is_some(),
        }
    }

    fn is_button(&self) -> bool {
        self.tag == "button" || matches!(self.kind.as_str(), "submit" | "button" | "reset" | "image")
    }

    fn is_secret(&self) -> bool {
        self.kind == "password"
    }

    fn mentions_identity(&self) -> bool {
        let haystacks = [Some(&self.kind), self.key.as_ref(), self.id.as_ref(), self.placeholder.as_ref()];
        haystacks.into_iter().flatten().any(|text| {
            let lower = text.to_ascii_lowercase();
            IDENTITY_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
    }

    /// Whether a browser would submit this control's preset value
    fn carries_value(&self) -> bool {
        if self.is_button() || self.value.is_none() {
            return false;
        }
        !matches!(self.kind.as_str(), "checkbox" | "radio") || self.checked
    }
}

#[derive(Debug, PartialEq)]
struct Fields {
    identity: Option<String>,
    secret: String,
    auxiliary: BTreeMap<String, String>,
}

fn classify_controls(controls: &[Control]) -> Option<Fields> {
    let secret_idx = controls.iter().position(|c| c.is_secret() && c.key.is_some())?;
    let secret = controls[secret_idx].key.clone()?;

    let candidate = |c: &&Control| !c.is_secret() && !c.is_button() && c.key.is_some();
    let identity_idx = controls
        .iter()
        .position(|c| candidate(&c) && c.mentions_identity())
        .or_else(|| controls.iter().position(|c| candidate(&c) && c.tag == "input" && c.kind == "text"));
    let identity = identity_idx.and_then(|i| controls[i].key.clone());

    let mut auxiliary = BTreeMap::new();
    for (idx, control) in controls.iter().enumerate() {
        if idx == secret_idx || Some(idx) == identity_idx || control.is_secret() {
            continue;
        }
        if let (Some(key), true) = (&control.key, control.carries_value()) {
            auxiliary
                .entry(key.clone())
                .or_insert_with(|| control.value.clone().unwrap_or_default());
        }
    }

    Some(Fields { identity, secret, auxiliary })
}

fn profile_from(fields: Fields, submission_url: Url, method: SubmitMethod) -> FormProfile {
    FormProfile {
        submission_url,
        method,
        identity_field: fields.identity.unwrap_or_else(|| DEFAULT_IDENTITY_FIELD.to_string()),
        secret_field: fields.secret,
        auxiliary_fields: fields.auxiliary,
        session_state: Vec::new(),
        origin: ProfileOrigin::Discovered,
    }
}

/// Find the login submission shape in rendered markup.
///
/// Forms are tried in document order and the first one holding a password
/// control wins. Pages that never wrap their controls in a form get a second,
/// page-wide pass where `id` stands in for a missing `name`. Returns `None`
/// when no password control exists anywhere.
pub fn classify_page(html: &str, page_url: &Url) -> Option<FormProfile> {
    let document = Html::parse_document(html);

    for form in document.select(&FORM) {
        let controls: Vec<Control> = form.select(&CONTROLS).map(|c| Control::read(c, false)).collect();
        let Some(fields) = classify_controls(&controls) else {
            continue;
        };
        let el = form.value();
        let submission_url = el
            .attr("action")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .and_then(|action| page_url.join(action).ok())
            .unwrap_or_else(|| page_url.clone());
        let method = el.attr("method").map(SubmitMethod::parse).unwrap_or(SubmitMethod::Post);
        tracing::debug!("Login form found: {} {}", method, submission_url);
        return Some(profile_from(fields, submission_url, method));
    }

    let controls: Vec<Control> = document.select(&CONTROLS).map(|c| Control::read(c, true)).collect();
    let fields = classify_controls(&controls)?;
    tracing::debug!("Login controls found outside any form");
    Some(profile_from(fields, page_url.clone(), SubmitMethod::Post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page() -> Url {
        Url::parse("https://portal.example.test/account/login").unwrap()
    }

    #[test]
    fn test_server_rendered_form() {
        let html = r#"
            <html><body>
              <form action="/session" method="post">
                <input type="text" name="user">
                <input type="password" name="pass">
                <input type="hidden" name="csrf_token" value="abc123">
                <input type="checkbox" name="remember" value="1">
                <button type="submit" name="go" value="1">Sign in</button>
              </form>
            </body></html>"#;

        let profile = classify_page(html, &page()).unwrap();
        assert_eq!(profile.submission_url.as_str(), "https://portal.example.test/session");
        assert_eq!(profile.method, SubmitMethod::Post);
        assert_eq!(profile.identity_field, "user");
        assert_eq!(profile.secret_field, "pass");
        assert_eq!(
            profile.auxiliary_fields,
            BTreeMap::from([("csrf_token".to_string(), "abc123".to_string())])
        );
        assert_eq!(profile.origin, ProfileOrigin::Discovered);
    }

    #[test]
    fn test_first_form_with_password_wins() {
        let html = r#"
            <form action="/search" method="get"><input name="q"></form>
            <form action="login.php" method="GET">
              <input type="email" name="mail">
              <input type="password" name="secret">
            </form>
            <form action="/other"><input type="password" name="second"></form>"#;

        let profile = classify_page(html, &page()).unwrap();
        assert_eq!(profile.submission_url.as_str(), "https://portal.example.test/account/login.php");
        assert_eq!(profile.method, SubmitMethod::Get);
        assert_eq!(profile.identity_field, "mail");
        assert_eq!(profile.secret_field, "secret");
    }

    #[test]
    fn test_missing_action_submits_to_page() {
        let html = r#"<form><input name="login_id"><input type="password" name="pw"></form>"#;
        let profile = classify_page(html, &page()).unwrap();
        assert_eq!(profile.submission_url, page());
        assert_eq!(profile.identity_field, "login_id");
    }

    #[test]
    fn test_identity_by_placeholder_and_text_fallback() {
        let by_placeholder = r#"<form>
            <input name="f1" placeholder="Your e-mail or username">
            <input type="password" name="f2"></form>"#;
        assert_eq!(classify_page(by_placeholder, &page()).unwrap().identity_field, "f1");

        let plain_text = r#"<form>
            <input type="hidden" name="nonce" value="n">
            <input type="text" name="handle">
            <input type="password" name="key"></form>"#;
        let profile = classify_page(plain_text, &page()).unwrap();
        assert_eq!(profile.identity_field, "handle");
        assert_eq!(profile.auxiliary_fields.get("nonce").map(String::as_str), Some("n"));
    }

    #[test]
    fn test_formless_page_uses_ids() {
        let html = r#"<div id="app">
            <input id="username" type="text">
            <input id="password" type="password">
            <button id="submit">Log in</button></div>"#;

        let profile = classify_page(html, &page()).unwrap();
        assert_eq!(profile.identity_field, "username");
        assert_eq!(profile.secret_field, "password");
        assert_eq!(profile.submission_url, page());
        assert!(profile.auxiliary_fields.is_empty());
    }

    #[test]
    fn test_checked_box_is_carried() {
        let html = r#"<form>
            <input name="user"><input type="password" name="pass">
            <input type="checkbox" name="keep" value="yes" checked>
            <input type="radio" name="mode" value="a">
            <input type="radio" name="mode" value="b" checked></form>"#;
        let profile = classify_page(html, &page()).unwrap();
        assert_eq!(
            profile.auxiliary_fields,
            BTreeMap::from([
                ("keep".to_string(), "yes".to_string()),
                ("mode".to_string(), "b".to_string()),
            ])
        );
    }

    #[test]
    fn test_no_password_anywhere() {
        let html = r#"<form><input name="q"><button>Search</button></form>"#;
        assert!(classify_page(html, &page()).is_none());
    }
}
