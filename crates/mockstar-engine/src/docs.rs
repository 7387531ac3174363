//! Mocker documentation.
//!
//! Rendering Markdown is left to the embedding application through
//! [`DocRenderer`]; the engine only rewrites static asset links so they are
//! addressable from outside the mocker directory.

use once_cell::sync::Lazy;
use regex::Regex;

/// Turns a mocker's documentation source into the HTML served to viewers.
pub trait DocRenderer: Send + Sync {
    fn render(&self, mocker_name: &str, source: &str) -> String;
}

/// Returns the source unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughRenderer;

impl DocRenderer for PassthroughRenderer {
    fn render(&self, _mocker_name: &str, source: &str) -> String {
        source.to_string()
    }
}

static STATIC_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?P<lead>\]\(|src=["']|href=["'])(?:\./)?(?P<dir>[A-Za-z0-9_.-]+)/"#)
        .expect("static link pattern is valid")
});

/// Prefix relative links into `static_dir` with the mocker name.
///
/// `![](./static/logo.jpg)` in mocker `demo` becomes `![](demo/static/logo.jpg)`.
pub fn rewrite_static_links(source: &str, mocker_name: &str, static_dir: &str) -> String {
    STATIC_LINK
        .replace_all(source, |caps: &regex::Captures| {
            let lead = &caps["lead"];
            let dir = &caps["dir"];
            if dir == static_dir {
                format!("{lead}{mocker_name}/{dir}/")
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
