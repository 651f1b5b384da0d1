// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # HTML Output Generation
//!
//! Post-processes rendered pages and writes them to disk. Three modes are
//! available (see [`HtmlOutput`]):
//!
//! - `prettify`: one tag or text run per line, indented by nesting depth;
//! - `minify`: `minify-html` with inline CSS and JS minification;
//! - `raw`: the template output as is.
//!
//! The contents of `script`, `style`, `pre` and `textarea` elements are
//! never re-indented.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tinysite::core::config::HtmlOutput;
//! use tinysite::core::traits::Generator;
//! use tinysite::generators::html::HtmlGenerator;
//! use std::path::Path;
//!
//! let generator = HtmlGenerator::new(HtmlOutput::Minify);
//! generator
//!     .generate("<html><body>Hello World</body></html>", Path::new("compiled/index.html"))
//!     .unwrap();
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use minify_html::{minify, Cfg};

use crate::core::config::HtmlOutput;
use crate::core::error::{Result, SiteError};
use crate::core::traits::Generator;
use crate::process::create_dir_all;

/// List of HTML5 void elements that don't need closing tags
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "pre", "textarea"];

/// Spaces per nesting level in prettified output.
const DEFAULT_INDENT: usize = 1;

/// HTML output generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlGenerator {
    mode: HtmlOutput,
    indent: usize,
}

impl HtmlGenerator {
    /// Creates a generator for the given post-processing mode.
    pub fn new(mode: HtmlOutput) -> Self {
        Self {
            mode,
            indent: DEFAULT_INDENT,
        }
    }

    /// Sets the number of spaces per level when prettifying.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// The configured mode.
    pub fn mode(&self) -> HtmlOutput {
        self.mode
    }

    /// Applies the configured post-processing.
    pub fn process_html(&self, content: &str, path: &Path) -> Result<String> {
        match self.mode {
            HtmlOutput::Raw => Ok(content.to_string()),
            HtmlOutput::Minify => minify_html(content, path),
            HtmlOutput::Prettify => Ok(prettify_html(content, self.indent)),
        }
    }
}

impl Default for HtmlGenerator {
    fn default() -> Self {
        Self::new(HtmlOutput::default())
    }
}

impl Generator for HtmlGenerator {
    fn generate(&self, content: &str, path: &Path) -> Result<()> {
        self.validate(path)?;
        let processed = self.process_html(content, path)?;
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let file = File::create(path)
            .map_err(|e| SiteError::io_error(path.to_path_buf(), e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(processed.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| SiteError::io_error(path.to_path_buf(), e))?;
        Ok(())
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if path.extension().and_then(|s| s.to_str()) != Some("html") {
            return Err(SiteError::output_generation_error(
                "Invalid file extension - expected .html",
                path.to_path_buf(),
                None,
            ));
        }
        Ok(())
    }
}

/// Minifies HTML content using the `minify-html` crate.
fn minify_html(content: &str, path: &Path) -> Result<String> {
    let cfg = Cfg {
        minify_css: true,
        minify_js: true,
        ..Cfg::default()
    };
    String::from_utf8(minify(content.as_bytes(), &cfg)).map_err(|e| {
        SiteError::output_generation_error(
            "HTML minification failed",
            path.to_path_buf(),
            Some(Box::new(e)),
        )
    })
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    RawText(&'a str),
    Markup(&'a str),
    Open {
        name: String,
        raw: &'a str,
        self_closing: bool,
    },
    Close {
        name: String,
        raw: &'a str,
    },
}

/// Re-indents HTML: every tag, comment and text run on its own line.
pub fn prettify_html(content: &str, indent: usize) -> String {
    let mut pretty = String::with_capacity(content.len() * 2);
    let mut open: Vec<String> = Vec::new();
    let mut inline = false;

    let line = |pretty: &mut String, depth: usize, text: &str| {
        if !pretty.is_empty() {
            pretty.push('\n');
        }
        pretty.push_str(&" ".repeat(depth * indent));
        pretty.push_str(text);
    };

    for token in tokenize(content) {
        match token {
            Token::Text(text) => {
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    line(&mut pretty, open.len(), &text);
                }
            }
            Token::RawText(text) => pretty.push_str(text),
            Token::Markup(raw) => line(&mut pretty, open.len(), raw),
            Token::Open {
                name,
                raw,
                self_closing,
            } => {
                line(&mut pretty, open.len(), raw);
                if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
                    continue;
                }
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    inline = true;
                } else {
                    open.push(name);
                }
            }
            Token::Close { name, raw } => {
                if inline {
                    pretty.push_str(raw);
                    inline = false;
                    continue;
                }
                if let Some(position) = open.iter().rposition(|n| *n == name) {
                    open.truncate(position);
                }
                line(&mut pretty, open.len(), raw);
            }
        }
    }
    pretty.push('\n');
    pretty
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let bytes = html.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let Some((token, end)) = parse_markup(html, pos) else {
            pos += 1;
            continue;
        };
        if text_start < pos {
            tokens.push(Token::Text(&html[text_start..pos]));
        }

        let raw_element = match &token {
            Token::Open {
                name,
                self_closing: false,
                ..
            } if RAW_TEXT_ELEMENTS.contains(&name.as_str()) => Some(name.clone()),
            _ => None,
        };
        tokens.push(token);
        pos = end;

        if let Some(name) = raw_element {
            let closing = format!("</{}", name);
            let close_start = html[pos..]
                .to_ascii_lowercase()
                .find(&closing)
                .map_or(html.len(), |offset| pos + offset);
            if close_start > pos {
                tokens.push(Token::RawText(&html[pos..close_start]));
            }
            pos = close_start;
            if let Some((close, end)) = parse_markup(html, close_start) {
                tokens.push(close);
                pos = end;
            }
        }
        text_start = pos;
    }
    if text_start < bytes.len() {
        tokens.push(Token::Text(&html[text_start..]));
    }
    tokens
}

/// Parses the comment, declaration or tag starting at `start`.
fn parse_markup(html: &str, start: usize) -> Option<(Token<'_>, usize)> {
    let rest = &html[start..];
    if rest.len() < 2 {
        return None;
    }
    if rest.starts_with("<!--") {
        let end = rest.find("-->").map_or(html.len(), |i| start + i + 3);
        return Some((Token::Markup(&html[start..end]), end));
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        let end = start + rest.find('>')? + 1;
        return Some((Token::Markup(&html[start..end]), end));
    }

    let closing = rest.starts_with("</");
    let name_start = if closing { 2 } else { 1 };
    if !rest[name_start..].starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut quote: Option<u8> = None;
    let mut end = None;
    for (offset, &byte) in rest.as_bytes().iter().enumerate().skip(name_start) {
        match quote {
            Some(q) if byte == q => quote = None,
            Some(_) => {}
            None if byte == b'"' || byte == b'\'' => quote = Some(byte),
            None if byte == b'>' => {
                end = Some(start + offset + 1);
                break;
            }
            None => {}
        }
    }
    let end = end?;
    let raw = &html[start..end];
    let name: String = rest[name_start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase();

    let token = if closing {
        Token::Close { name, raw }
    } else {
        Token::Open {
            name,
            raw,
            self_closing: raw.ends_with("/>"),
        }
    };
    Some((token, end))
}
