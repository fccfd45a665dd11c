use std::{fmt, str::FromStr};

use miette::Diagnostic;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("unterminated placeholder in template `{template}`")]
    #[diagnostic(code(naming::unterminated_placeholder))]
    Unterminated { template: String },

    #[error("empty placeholder in template `{template}`")]
    #[diagnostic(code(naming::empty_placeholder))]
    EmptyPlaceholder { template: String },

    #[error("unknown placeholder `{{{name}}}` in template `{template}`")]
    #[diagnostic(code(naming::unknown_placeholder))]
    UnknownPlaceholder { name: String, template: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Placeholder(String),
}

/// A string with `{name}` placeholders.
///
/// Framework variables such as `${sls:stage}` or `${opt:stage, 'dev'}` are copied through
/// verbatim, so ARN and URL templates can mix both forms. A placeholder may appear inside a
/// framework variable (`${self:custom.accounts.{service}}`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    source: String,
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Placeholder(name) => Some(name.as_str()),
            TemplatePart::Literal(_) => None,
        })
    }

    pub fn render<F>(&self, mut lookup: F) -> Result<String, TemplateError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                TemplatePart::Literal(lit) => out.push_str(lit),
                TemplatePart::Placeholder(name) => {
                    let value = lookup(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                        name: name.clone(),
                        template: self.source.clone(),
                    })?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let unterminated = || TemplateError::Unterminated {
            template: source.to_string(),
        };

        let mut parts = Vec::new();
        let mut literal = String::new();
        // Open `${` framework variables; their braces are literal text.
        let mut depth = 0usize;
        let mut chars = source.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '$' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push_str("${");
                    depth += 1;
                }
                '}' if depth > 0 => {
                    literal.push('}');
                    depth -= 1;
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(next) => name.push(next),
                            None => return Err(unterminated()),
                        }
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder {
                            template: source.to_string(),
                        });
                    }
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(TemplatePart::Placeholder(name.to_string()));
                }
                _ => literal.push(ch),
            }
        }

        if depth > 0 {
            return Err(unterminated());
        }
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse `template` and fill its placeholders from `vars`.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    template.parse::<Template>()?.render(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
}
