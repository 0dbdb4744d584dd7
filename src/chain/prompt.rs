//! Prompt templates with `{name}` placeholders.
//!
//! `{{` and `}}` render as literal braces. Templates are parsed once at
//! construction and are immutable afterwards, so a single instance can be
//! shared across concurrent requests.

use crate::types::{AppError, Result};
use std::collections::{BTreeSet, HashMap};

/// Contact address used by the answer template's fallback instruction.
pub const DEFAULT_CONTACT_EMAIL: &str = "help@scrimba.com";

/// Rewrites a conversational question into a context-free one.
pub const REWRITE_TEMPLATE: &str = "Given a question, convert it to a standalone question. \
question: {question} standalone question:";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template_text: String,
    segments: Vec<Segment>,
    placeholders: BTreeSet<String>,
}

impl PromptTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` for unbalanced braces or empty
    /// placeholder names.
    pub fn new(template_text: impl Into<String>) -> Result<Self> {
        let template_text = template_text.into();
        let mut segments = Vec::new();
        let mut placeholders = BTreeSet::new();
        let mut literal = String::new();
        let mut chars = template_text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(AppError::Configuration(format!(
                                    "Unclosed placeholder in template: {:?}",
                                    template_text
                                )))
                            }
                            Some(ch) => name.push(ch),
                        }
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(AppError::Configuration(
                            "Empty placeholder name in template".into(),
                        ));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    placeholders.insert(name.clone());
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    return Err(AppError::Configuration(format!(
                        "Unmatched '}}' in template: {:?}",
                        template_text
                    )))
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            template_text,
            segments,
            placeholders,
        })
    }

    pub fn template_text(&self) -> &str {
        &self.template_text
    }

    pub fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    /// Fails unless every placeholder is one of `allowed`.
    pub fn ensure_only(&self, allowed: &[&str]) -> Result<()> {
        match self
            .placeholders
            .iter()
            .find(|p| !allowed.contains(&p.as_str()))
        {
            Some(unknown) => Err(AppError::Configuration(format!(
                "Template uses unknown placeholder {{{}}}; allowed: {}",
                unknown,
                allowed.join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Substitute every placeholder. Values without a placeholder are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MissingPlaceholder` naming the first placeholder that
    /// has no value.
    pub fn render(&self, values: &HashMap<&str, &str>) -> Result<String> {
        let mut rendered = String::with_capacity(self.template_text.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values.get(name.as_str()).ok_or_else(|| {
                        AppError::MissingPlaceholder {
                            placeholder: name.clone(),
                        }
                    })?;
                    rendered.push_str(value);
                }
            }
        }
        Ok(rendered)
    }
}

/// The instruction the synthesis model must follow when the context does not
/// contain the answer.
pub fn fallback_instruction(contact_email: &str) -> String {
    format!(
        "If you really don't know the answer, say \"I'm sorry, I don't know the answer to that.\" \
         And direct the questioner to email {}. Don't try to make up an answer.",
        contact_email
    )
}

/// Answer template text with the fallback instruction baked in.
pub fn answer_template_text(contact_email: &str) -> String {
    let instruction = fallback_instruction(contact_email)
        .replace('{', "{{")
        .replace('}', "}}");
    format!(
        "You are a helpful and enthusiastic support bot who can answer a given question about \
         Scrimba based on the context provided. Try to find the answer in the context. {} \
         Always speak as if you were chatting to a friend.\n\
         context: {{context}}\n\
         question: {{question}}\n\
         answer: ",
        instruction
    )
}

pub fn rewrite_template() -> Result<PromptTemplate> {
    PromptTemplate::new(REWRITE_TEMPLATE)
}

pub fn answer_template(contact_email: &str) -> Result<PromptTemplate> {
    PromptTemplate::new(answer_template_text(contact_email))
}
