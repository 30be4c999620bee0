//! The ordered table of technology signatures.
//!
//! Order matters: the first rule with a matching signature wins, so broad
//! keywords ("vue", "go") sit below the more specific frameworks.

/// One piece of evidence a rule can look for.
#[derive(Debug, Clone, Copy)]
pub enum Signature {
    /// The lower-cased body contains at least one of the needles.
    AnyInBody(&'static [&'static str]),
    /// The lower-cased body contains every needle.
    AllInBody(&'static [&'static str]),
    /// The named response header, lower-cased, contains the needle.
    Header(&'static str, &'static str),
}

/// A technology/framework pair and the signatures that identify it.
///
/// The rule matches when any of its signatures matches.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub technology: &'static str,
    pub framework: &'static str,
    pub signatures: &'static [Signature],
}

use Signature::{AllInBody, AnyInBody, Header};

pub const RULES: &[Rule] = &[
    Rule {
        technology: "Next.js",
        framework: "React",
        signatures: &[AnyInBody(&["next.js", "_next/", "__next"])],
    },
    Rule {
        technology: "React",
        framework: "React",
        signatures: &[AnyInBody(&["react", "reactdom", "react-dom"])],
    },
    Rule {
        technology: "Vue.js",
        framework: "Vue",
        signatures: &[AnyInBody(&["vue.js", "vue", "__vue__"])],
    },
    Rule {
        technology: "Angular",
        framework: "Angular",
        signatures: &[AnyInBody(&["angular", "ng-version"])],
    },
    Rule {
        technology: "Python",
        framework: "Django",
        signatures: &[AnyInBody(&["django", "csrfmiddlewaretoken"])],
    },
    Rule {
        technology: "Python",
        framework: "Flask",
        signatures: &[AnyInBody(&["flask"])],
    },
    Rule {
        technology: "Java",
        framework: "Spring Boot",
        signatures: &[AnyInBody(&["spring", "spring-boot"])],
    },
    Rule {
        technology: ".NET",
        framework: "ASP.NET",
        signatures: &[
            AnyInBody(&["asp.net", ".net"]),
            Header("server", "kestrel"),
        ],
    },
    Rule {
        technology: "Node.js",
        framework: "Express",
        signatures: &[
            AnyInBody(&["express", "node.js"]),
            Header("x-powered-by", "express"),
        ],
    },
    Rule {
        technology: "Python",
        framework: "Jupyter",
        signatures: &[AnyInBody(&["jupyter", "notebook"])],
    },
    Rule {
        technology: "JavaScript",
        framework: "Webpack Dev Server",
        signatures: &[AnyInBody(&["webpack"])],
    },
    Rule {
        technology: "PHP",
        framework: "PHP",
        signatures: &[AnyInBody(&["php"])],
    },
    Rule {
        technology: "Ruby",
        framework: "Rails",
        signatures: &[AnyInBody(&["rails", "ruby"])],
    },
    Rule {
        technology: "Go",
        framework: "Go HTTP Server",
        signatures: &[AllInBody(&["go", "server"])],
    },
];
