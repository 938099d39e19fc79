// Output name templates with `{name}` placeholders
use crate::error::{Result, TaggrrError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Parsed naming template
///
/// Placeholders are `{name}` with lowercase ASCII names; `{{` and `}}` escape
/// literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let error = |message: String| TaggrrError::Template {
            template: source.to_string(),
            message,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(error(format!("Unclosed placeholder at offset {}", pos)));
                    }
                    let valid = name.chars().all(|n| n.is_ascii_lowercase() || n == '_');
                    if name.is_empty() || !valid {
                        return Err(error(format!("Invalid placeholder '{{{}}}'", name)));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    return Err(error(format!("Unmatched '}}' at offset {}", pos)));
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn uses(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Substitute placeholders; names the lookup does not know render empty
    pub fn render<'a, F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut out = String::with_capacity(self.source.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(lookup(name).unwrap_or("")),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let template = Template::parse("{title} ({year}) - {part}").unwrap();
        let names: Vec<_> = template.placeholders().collect();
        assert_eq!(names, vec!["title", "year", "part"]);

        let rendered = template.render(|name| match name {
            "title" => Some("Example"),
            "year" => Some("2020"),
            _ => None,
        });
        assert_eq!(rendered, "Example (2020) - ");
    }

    #[test]
    fn test_escaped_braces() {
        let template = Template::parse("{{{title}}}").unwrap();
        assert_eq!(template.render(|_| Some("x")), "{x}");
        assert!(!template.uses("year"));
    }

    #[test]
    fn test_malformed_templates() {
        assert!(Template::parse("{title ({year})").is_err());
        assert!(Template::parse("{title").is_err());
        assert!(Template::parse("title}").is_err());
        assert!(Template::parse("{}").is_err());
        assert!(Template::parse("{Title}").is_err());
    }

    #[test]
    fn test_error_names_template() {
        let err = Template::parse("{title").unwrap_err();
        assert!(err.to_string().contains("{title"));
    }
}
