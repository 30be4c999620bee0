//! Heuristic identification of the stack behind an HTTP response.
//!
//! Everything in here is a pure function of the response; the network side
//! lives in [`crate::scanner::ServiceFingerprinter`].
//!
//! ```rust
//! # use devradar::fingerprint::{classify, service_label};
//! # use reqwest::header::HeaderMap;
//! let body = r#"<input type="hidden" name="csrfmiddlewaretoken" value="x">"#;
//! let fingerprint = classify(body, &HeaderMap::new());
//!
//! assert_eq!(fingerprint.technology, "Python");
//! assert_eq!(fingerprint.framework, "Django");
//! assert_eq!(service_label(&fingerprint, "", 8000), "Django Development Server");
//! ```
mod rules;

pub use rules::{Rule, Signature, RULES};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<title[^>]*>([^<]+)</title>").expect("title pattern is valid"));

/// Technology and framework guessed for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub technology: &'static str,
    pub framework: &'static str,
}

impl Fingerprint {
    /// Returned when no rule matched.
    pub const UNKNOWN: Self = Self {
        technology: "Unknown",
        framework: "",
    };

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Technology as stored in a service record; empty when unknown.
    pub fn known_technology(&self) -> &'static str {
        if self.is_unknown() {
            ""
        } else {
            self.technology
        }
    }
}

impl Signature {
    fn matches(&self, body: &str, headers: &HeaderMap) -> bool {
        match *self {
            Signature::AnyInBody(needles) => needles.iter().any(|n| body.contains(n)),
            Signature::AllInBody(needles) => needles.iter().all(|n| body.contains(n)),
            Signature::Header(name, needle) => headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.to_lowercase().contains(needle)),
        }
    }
}

impl Rule {
    /// `body` must already be lower-cased.
    pub fn matches(&self, body: &str, headers: &HeaderMap) -> bool {
        self.signatures.iter().any(|sig| sig.matches(body, headers))
    }
}

/// Runs the rule table against a response, first match wins.
pub fn classify(body: &str, headers: &HeaderMap) -> Fingerprint {
    let body = body.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.matches(&body, headers))
        .map_or(Fingerprint::UNKNOWN, |rule| Fingerprint {
            technology: rule.technology,
            framework: rule.framework,
        })
}

/// Text of the first `<title>` element, trimmed. Empty if there is none.
pub fn extract_title(body: &str) -> String {
    TITLE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .unwrap_or_default()
}

/// Picks the label shown for a service.
///
/// Framework beats technology beats page title; the port number is the last
/// resort.
pub fn service_label(fingerprint: &Fingerprint, title: &str, port: u16) -> String {
    if !fingerprint.framework.is_empty() {
        return format!("{} Development Server", fingerprint.framework);
    }
    let technology = fingerprint.known_technology();
    if !technology.is_empty() {
        return format!("{technology} Application");
    }
    if !title.is_empty() {
        return format!("Web Application ({title})");
    }
    port_label(port).to_owned()
}

fn port_label(port: u16) -> &'static str {
    match port {
        3000 => "Node.js/React Dev Server",
        8000 => "Python/Django Dev Server",
        5000 => "Flask/ASP.NET Dev Server",
        8080 => "Java/Spring Boot Server",
        4200 => "Angular Dev Server",
        8888 => "Jupyter Notebook",
        _ => "Development Server",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parameterized::parameterized;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[parameterized(body = {
        r#"<script src="/_next/static/chunks/main.js"></script>"#,
        r#"<div id="root"></div><script src="react-dom.js"></script>"#,
        r#"<div id="app" data-v-app></div><script src="vue.js"></script>"#,
        r#"<app-root ng-version="17.0.0"></app-root>"#,
        r#"<input name="csrfmiddlewaretoken">"#,
        "Powered by Flask",
        "Whitelabel Error Page from spring",
        "ASP.NET Core",
        "Cannot GET / (Express)",
        "Jupyter Server",
        "webpack-dev-server output",
        "<?php phpinfo(); ?>",
        "Ruby on Rails: welcome aboard",
        "404 page not found. go http server",
    }, expected = {
        ("Next.js", "React"),
        ("React", "React"),
        ("Vue.js", "Vue"),
        ("Angular", "Angular"),
        ("Python", "Django"),
        ("Python", "Flask"),
        ("Java", "Spring Boot"),
        (".NET", "ASP.NET"),
        ("Node.js", "Express"),
        ("Python", "Jupyter"),
        ("JavaScript", "Webpack Dev Server"),
        ("PHP", "PHP"),
        ("Ruby", "Rails"),
        ("Go", "Go HTTP Server"),
    })]
    fn classifies_each_rule(body: &str, expected: (&str, &str)) {
        let fingerprint = classify(body, &HeaderMap::new());
        assert_eq!((fingerprint.technology, fingerprint.framework), expected);
    }

    #[test]
    fn earlier_rule_wins() {
        // Next.js pages also mention react; the Next.js rule comes first.
        let fingerprint = classify("__NEXT_DATA__ react", &HeaderMap::new());
        assert_eq!(fingerprint.technology, "Next.js");
    }

    #[test]
    fn kestrel_server_header_means_dotnet() {
        let fingerprint = classify("<h1>hello</h1>", &headers(&[("server", "Kestrel")]));
        assert_eq!(fingerprint.framework, "ASP.NET");
    }

    #[test]
    fn express_powered_by_header_means_node() {
        let fingerprint = classify("<h1>hi</h1>", &headers(&[("x-powered-by", "Express")]));
        assert_eq!(fingerprint.technology, "Node.js");
    }

    #[test]
    fn go_rule_needs_both_words() {
        assert!(classify("go", &HeaderMap::new()).is_unknown());
        assert!(classify("server", &HeaderMap::new()).is_unknown());

        let fingerprint = classify("Go away, server is busy", &HeaderMap::new());
        assert_eq!(fingerprint.technology, "Go");
        assert_eq!(fingerprint.framework, "Go HTTP Server");
    }

    #[test]
    fn no_keywords_is_unknown() {
        let fingerprint = classify("<title>My App</title>", &HeaderMap::new());
        assert_eq!(fingerprint, Fingerprint::UNKNOWN);
        assert_eq!(fingerprint.known_technology(), "");
    }

    #[test]
    fn classification_is_deterministic() {
        let bodies = [
            "<title>My App</title>",
            "django csrfmiddlewaretoken",
            "<div data-reactroot></div>",
            "go server",
        ];
        let map = headers(&[("server", "nginx")]);
        for body in bodies {
            let first = classify(body, &map);
            for _ in 0..10 {
                assert_eq!(classify(body, &map), first);
            }
        }
    }

    #[test]
    fn title_is_first_match_and_trimmed() {
        let body = "<html><head><title lang=\"en\">  My App \n</title></head>\
                    <body><title>Other</title></body></html>";
        assert_eq!(extract_title(body), "My App");
    }

    #[test]
    fn title_tag_is_case_sensitive() {
        assert_eq!(extract_title("<TITLE>Shouting</TITLE>"), "");
        assert_eq!(extract_title("<title></title>"), "");
    }

    #[test]
    fn label_prefers_framework_then_technology_then_title() {
        let django = Fingerprint {
            technology: "Python",
            framework: "Django",
        };
        let tech_only = Fingerprint {
            technology: "Elixir",
            framework: "",
        };

        assert_eq!(service_label(&django, "Admin", 8000), "Django Development Server");
        assert_eq!(service_label(&tech_only, "Admin", 4000), "Elixir Application");
        assert_eq!(
            service_label(&Fingerprint::UNKNOWN, "My App", 4000),
            "Web Application (My App)"
        );
    }

    #[parameterized(port = { 3000, 8000, 5000, 8080, 4200, 8888, 7777 }, expected = {
        "Node.js/React Dev Server",
        "Python/Django Dev Server",
        "Flask/ASP.NET Dev Server",
        "Java/Spring Boot Server",
        "Angular Dev Server",
        "Jupyter Notebook",
        "Development Server",
    })]
    fn label_falls_back_to_port(port: u16, expected: &str) {
        assert_eq!(service_label(&Fingerprint::UNKNOWN, "", port), expected);
    }
}
