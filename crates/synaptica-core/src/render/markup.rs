//! Explanation markup rendering
//!
//! Uses pulldown-cmark (with math enabled) to turn an explanation into a
//! small block/inline document, then into terminal text. Failures are
//! reported as [`RenderError`] and can be isolated with [`render_isolated`]
//! so a bad response only ever affects the overlay body.

use crate::error::RenderError;
use crate::explanation::ExplanationState;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as MdParser, Tag, TagEnd};
use std::fmt::Write;
use std::ops::Range;

/// Body shown when an explanation cannot be rendered
pub const RENDER_FALLBACK: &str = "Rendering Error: Sorry, there was an error rendering the \
explanation. This can sometimes happen due to invalid mathematical notation (LaTeX) in the \
response.";

/// Inline content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Plain text (emphasis markers dropped)
    Text(String),
    /// Code span
    Code(String),
    /// `$...$` formula
    Math(String),
}

/// Block content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `#` heading
    Heading { level: u8, content: Vec<Inline> },
    /// Paragraph of inline content
    Paragraph(Vec<Inline>),
    /// `$$...$$` formula
    DisplayMath(String),
    /// One list entry; `number` is set for ordered lists
    ListItem {
        number: Option<u64>,
        content: Vec<Inline>,
    },
    /// Fenced or indented code
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    /// Thematic break
    Rule,
}

/// Parsed explanation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Blocks in source order
    pub blocks: Vec<Block>,
}

impl Document {
    /// Number of formulas, inline and display
    #[must_use]
    pub fn formula_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::DisplayMath(_) => 1,
                Block::Heading { content, .. }
                | Block::Paragraph(content)
                | Block::ListItem { content, .. } => content
                    .iter()
                    .filter(|i| matches!(i, Inline::Math(_)))
                    .count(),
                Block::CodeBlock { .. } | Block::Rule => 0,
            })
            .sum()
    }

    /// Terminal rendering
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            match block {
                Block::Heading { level, content } => {
                    let title = inline_text(content);
                    let underline = if *level == 1 { '=' } else { '-' };
                    let _ = writeln!(out, "{title}");
                    let _ = writeln!(
                        out,
                        "{}",
                        underline.to_string().repeat(title.chars().count())
                    );
                }
                Block::Paragraph(content) => {
                    let _ = writeln!(out, "{}", inline_text(content));
                }
                Block::DisplayMath(tex) => {
                    for line in tex.trim().lines() {
                        let _ = writeln!(out, "    {}", line.trim_end());
                    }
                }
                Block::ListItem { number, content } => {
                    let bullet = number.map_or_else(|| "•".to_string(), |n| format!("{n}."));
                    let _ = writeln!(out, "  {bullet} {}", inline_text(content));
                }
                Block::CodeBlock { code, .. } => {
                    for line in code.lines() {
                        let _ = writeln!(out, "    {line}");
                    }
                }
                Block::Rule => {
                    let _ = writeln!(out, "{}", "─".repeat(24));
                }
            }

            let next_is_item = matches!(self.blocks.get(i + 1), Some(Block::ListItem { .. }));
            let tight = matches!(block, Block::ListItem { .. }) && next_is_item;
            if !tight && i + 1 < self.blocks.len() {
                out.push('\n');
            }
        }
        out
    }
}

fn inline_text(content: &[Inline]) -> String {
    let mut out = String::new();
    for inline in content {
        match inline {
            Inline::Text(t) => out.push_str(t),
            Inline::Code(c) => {
                let _ = write!(out, "`{c}`");
            }
            Inline::Math(m) => {
                let _ = write!(out, "⟨{}⟩", m.trim());
            }
        }
    }
    out.trim().to_string()
}

/// Reject `$$` delimiters that are never closed.
///
/// Math and code regions come from pulldown-cmark itself, so only a `$$` the
/// parser left as plain text is reported. A lone `$` that does not pair up
/// (a price, say) stays literal text.
pub fn check_math_delimiters(source: &str) -> Result<(), RenderError> {
    let covered: Vec<Range<usize>> = MdParser::new_ext(source, Options::ENABLE_MATH)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Code(_)
            | Event::InlineMath(_)
            | Event::DisplayMath(_)
            | Event::Start(Tag::CodeBlock(_)) => Some(range),
            _ => None,
        })
        .collect();

    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if let Some(region) = covered.iter().find(|r| r.contains(&i)) {
            i = region.end;
            continue;
        }
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'$') => {
                return Err(RenderError::UnterminatedMath {
                    delimiter: "$$",
                    offset: i,
                });
            }
            _ => i += 1,
        }
    }
    Ok(())
}

/// Parse explanation markup into a [`Document`]
pub fn parse_markup(source: &str) -> Result<Document, RenderError> {
    check_math_delimiters(source)?;

    let mut doc = Document::default();
    let mut inlines: Vec<Inline> = Vec::new();
    let mut heading: Option<u8> = None;
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut item_number: Option<Option<u64>> = None;
    let mut code: Option<(Option<String>, String)> = None;

    for (event, range) in MdParser::new_ext(source, Options::ENABLE_MATH).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush_paragraph(&mut doc, &mut inlines);
                heading = Some(level as u8);
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(level) = heading.take() {
                    doc.blocks.push(Block::Heading {
                        level,
                        content: std::mem::take(&mut inlines),
                    });
                }
            }
            Event::End(TagEnd::Paragraph) if item_number.is_none() => {
                flush_paragraph(&mut doc, &mut inlines);
            }
            Event::End(TagEnd::Paragraph) => push_text(&mut inlines, " "),
            Event::Start(Tag::List(start)) => {
                flush_item(&mut doc, &mut inlines, &mut item_number);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                let number = match lists.last_mut() {
                    Some(Some(n)) => {
                        let current = *n;
                        *n += 1;
                        Some(current)
                    }
                    _ => None,
                };
                item_number = Some(number);
            }
            Event::End(TagEnd::Item) => flush_item(&mut doc, &mut inlines, &mut item_number),
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                code = Some((language, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, body)) = code.take() {
                    doc.blocks.push(Block::CodeBlock {
                        language,
                        code: body,
                    });
                }
            }
            Event::Text(text) => match code.as_mut() {
                Some((_, body)) => body.push_str(&text),
                None => push_text(&mut inlines, &text),
            },
            Event::Code(text) => inlines.push(Inline::Code(text.to_string())),
            Event::InlineMath(tex) => {
                if tex.trim().is_empty() {
                    return Err(RenderError::EmptyFormula {
                        offset: range.start,
                    });
                }
                inlines.push(Inline::Math(tex.to_string()));
            }
            Event::DisplayMath(tex) => {
                if tex.trim().is_empty() {
                    return Err(RenderError::EmptyFormula {
                        offset: range.start,
                    });
                }
                if item_number.is_none() {
                    flush_paragraph(&mut doc, &mut inlines);
                    doc.blocks.push(Block::DisplayMath(tex.to_string()));
                } else {
                    inlines.push(Inline::Math(tex.to_string()));
                }
            }
            Event::SoftBreak => push_text(&mut inlines, " "),
            Event::HardBreak => push_text(&mut inlines, "\n"),
            Event::Rule => doc.blocks.push(Block::Rule),
            _ => {}
        }
    }
    flush_paragraph(&mut doc, &mut inlines);

    Ok(doc)
}

fn push_text(inlines: &mut Vec<Inline>, text: &str) {
    if let Some(Inline::Text(last)) = inlines.last_mut() {
        last.push_str(text);
    } else {
        inlines.push(Inline::Text(text.to_string()));
    }
}

fn flush_paragraph(doc: &mut Document, inlines: &mut Vec<Inline>) {
    let content = std::mem::take(inlines);
    if content
        .iter()
        .any(|i| !matches!(i, Inline::Text(t) if t.trim().is_empty()))
    {
        doc.blocks.push(Block::Paragraph(content));
    }
}

fn flush_item(doc: &mut Document, inlines: &mut Vec<Inline>, item_number: &mut Option<Option<u64>>) {
    if let Some(number) = item_number.take() {
        let content = std::mem::take(inlines);
        if !content.is_empty() {
            doc.blocks.push(Block::ListItem { number, content });
        }
    }
}

/// Render markup to terminal text
pub fn render_markup(source: &str) -> Result<String, RenderError> {
    parse_markup(source).map(|doc| doc.to_plain_text())
}

/// Rendering result with failures contained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedExplanation {
    /// Text to display
    pub body: String,
    /// Set when `body` is the fallback message
    pub error: Option<RenderError>,
}

/// Render markup, replacing the body with [`RENDER_FALLBACK`] on failure
#[must_use]
pub fn render_isolated(source: &str) -> RenderedExplanation {
    match render_markup(source) {
        Ok(body) => RenderedExplanation { body, error: None },
        Err(e) => {
            tracing::warn!(error = %e, "explanation markup could not be rendered");
            RenderedExplanation {
                body: format!("{RENDER_FALLBACK}\n({e})"),
                error: Some(e),
            }
        }
    }
}

/// Full overlay text for the current explanation state; `None` when closed
#[must_use]
pub fn render_overlay(state: &ExplanationState) -> Option<String> {
    if !state.is_open {
        return None;
    }
    let title = format!("Node Intel: {}", state.concept_name);
    let body = if state.is_loading {
        "Generating explanation...".to_string()
    } else {
        render_isolated(&state.text).body
    };
    Some(format!(
        "{title}\n{}\n{body}\n",
        "═".repeat(title.chars().count())
    ))
}
