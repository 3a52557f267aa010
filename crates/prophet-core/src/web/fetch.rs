//! Page fetching and markup stripping.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Node};
use std::time::Duration;

use super::{NetworkError, PageFetcher};

/// Fetches pages over HTTP(S) and returns their readable text.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, NetworkError> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, NetworkError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == 429 {
            return Err(NetworkError::RateLimited(url.to_string()));
        }
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();

        let is_html = content_type.contains("html") || content_type.contains("xml");
        if !is_html && !content_type.starts_with("text/") {
            return Err(NetworkError::UnsupportedContent {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.text().await?;
        Ok(if is_html { html_to_text(&body) } else { body })
    }
}

/// Elements whose text never belongs to the page body.
const SKIPPED: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "iframe", "nav", "header", "footer",
    "aside", "form",
];

/// Elements that end a paragraph.
const BLOCKS: &[&str] = &[
    "p", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "section", "article", "main",
    "blockquote", "pre", "table", "ul", "ol",
];

static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\f\v\x{A0}]+").expect("valid regex"));

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n[\s\n]*").expect("valid regex"));

/// Strips markup and boilerplate from an HTML page.
///
/// Entities are decoded by the parser. Paragraph structure survives as blank
/// lines so the splitter can cut on it.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);
    collect_text(document.root_element(), &mut text);

    let text = INLINE_SPACE.replace_all(&text, " ");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let text = lines.join("\n");

    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
                if BLOCKS.contains(&name) {
                    out.push_str("\n\n");
                } else {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_strips_scripts_and_tags() {
        let html = "<p>Hello <b>world</b></p><script>evil()</script>";
        let text = html_to_text(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("script"));
        assert!(!text.contains("evil"));
    }

    #[test]
    fn test_boilerplate_removed() {
        let html = r#"<html><head><style>.x{color:red}</style></head><body>
            <nav><a href="/">Home</a> | <a href="/about">About</a></nav>
            <article><h1>Central bank holds rates</h1><p>The committee voted 7-2.</p></article>
            <footer>Copyright 2024</footer></body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Central bank holds rates"));
        assert!(text.contains("The committee voted 7-2."));
        assert!(!text.contains("Home"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("color:red"));
    }

    #[test]
    fn test_paragraphs_become_blank_lines() {
        let text = html_to_text("<p>First paragraph.</p><p>Second   paragraph.</p>");
        assert_eq!(text, "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_entities_decoded() {
        let text = html_to_text("<p>AT&amp;T &lt;3 &quot;fast&quot;</p>");
        assert_eq!(text, "AT&T <3 \"fast\"");
    }

    #[test]
    fn test_numeric_and_named_entities_decoded() {
        let text = html_to_text("<p>It&#8217;s the Fed&rsquo;s call &#x2014; rates at 5&#37;</p>");
        assert_eq!(text, "It\u{2019}s the Fed\u{2019}s call \u{2014} rates at 5%");
    }

    #[test]
    fn test_comments_and_head_dropped() {
        let html = "<html><head><title>Site name</title></head><body><!-- tracking --><p>Body text.</p></body></html>";
        assert_eq!(html_to_text(html), "Body text.");
    }
}
