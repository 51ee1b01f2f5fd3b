//! HTML rendering of `go-import` / `go-source` meta tags.
//!
//! Pure string formatting: the same key and metadata always render to the
//! same bytes. The `{/dir}`, `{file}` and `{line}` tokens in the source clause
//! are templates for downstream tooling and are emitted literally.
use crate::{config::RenderConfig, core::metadata::PackageMetadata};

/// Renders resolved packages into the vanity import HTML page.
#[derive(Debug, Clone)]
pub struct Renderer {
    documentation_base_url: String,
    refresh_delay_secs: u64,
}

impl Renderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            documentation_base_url: config
                .documentation_base_url
                .trim_end_matches('/')
                .to_string(),
            refresh_delay_secs: config.refresh_delay_secs,
        }
    }

    /// `go-import` clause: `<key> <vcs> https://<source>`.
    pub fn import_clause(key: &str, metadata: &PackageMetadata) -> String {
        format!("{key} {} https://{}", metadata.vcs, metadata.source)
    }

    /// `go-source` clause: home, directory and file URL templates.
    pub fn source_clause(key: &str, metadata: &PackageMetadata) -> String {
        let src = &metadata.source;
        let branch = &metadata.default_branch;
        format!(
            "{key} https://{src} https://{src}/tree/{branch}{{/dir}} \
             https://{src}/blob/{branch}{{/dir}}/{{file}}#L{{line}}"
        )
    }

    /// Documentation page the browser is redirected to.
    pub fn documentation_url(&self, key: &str) -> String {
        format!("{}/{key}", self.documentation_base_url)
    }

    /// Render the full HTML document for `key`.
    pub fn render(&self, key: &str, metadata: &PackageMetadata) -> String {
        let import_clause = escape_html(&Self::import_clause(key, metadata));
        let source_clause = escape_html(&Self::source_clause(key, metadata));
        let doc_url = escape_html(&self.documentation_url(key));

        format!(
            r#"<!DOCTYPE html>
<html>
  <head>
    <meta http-equiv="Content-Type" content="text/html; charset=utf-8">
    <meta name="go-import" content="{import_clause}">
    <meta name="go-source" content="{source_clause}">
    <meta http-equiv="refresh" content="{delay}; url={doc_url}">
  </head>
  <body>
    Nothing to see here! <a href="{doc_url}">Move along</a>
  </body>
</html>
"#,
            delay = self.refresh_delay_secs,
        )
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
