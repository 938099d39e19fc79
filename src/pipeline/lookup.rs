// Metadata lookup collaborator interface
use crate::planning::MetadataResult;

/// Result of one metadata query
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(MetadataResult),
    NotFound,
    /// Failure that persisted through the collaborator's own retries
    TransientError(String),
}

/// External metadata source queried with candidate identifiers
pub trait MetadataLookup: Send + Sync {
    fn lookup(&self, query: &str, source_hint: Option<&str>) -> LookupOutcome;
}

impl<T: MetadataLookup + ?Sized> MetadataLookup for &T {
    fn lookup(&self, query: &str, source_hint: Option<&str>) -> LookupOutcome {
        (**self).lookup(query, source_hint)
    }
}

impl<T: MetadataLookup + ?Sized> MetadataLookup for Box<T> {
    fn lookup(&self, query: &str, source_hint: Option<&str>) -> LookupOutcome {
        (**self).lookup(query, source_hint)
    }
}

/// Offline lookup that derives a title from the identifier itself
///
/// `FC2-PPV-1234567` becomes "FC2 PPV 1234567", `actual_movie_title` becomes
/// "Actual Movie Title". The year is left to the group's year hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierLookup;

impl IdentifierLookup {
    pub fn title_for(identifier: &str) -> String {
        identifier
            .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
            .filter(|word| !word.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl MetadataLookup for IdentifierLookup {
    fn lookup(&self, query: &str, source_hint: Option<&str>) -> LookupOutcome {
        let title = Self::title_for(query);
        if title.is_empty() {
            return LookupOutcome::NotFound;
        }

        LookupOutcome::Found(MetadataResult {
            identifier: query.to_string(),
            title,
            year: None,
            source: source_hint.map(str::to_string),
            poster_url: None,
            fanart_url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_titles() {
        assert_eq!(IdentifierLookup::title_for("FC2-PPV-1234567"), "FC2 PPV 1234567");
        assert_eq!(IdentifierLookup::title_for("actual_movie_title"), "Actual Movie Title");
        assert_eq!(IdentifierLookup::title_for("SSNI-456"), "SSNI 456");
    }

    #[test]
    fn test_identifier_lookup_keeps_source() {
        match IdentifierLookup.lookup("abc123", Some("dmm")) {
            LookupOutcome::Found(meta) => {
                assert_eq!(meta.title, "Abc123");
                assert_eq!(meta.source.as_deref(), Some("dmm"));
                assert_eq!(meta.identifier, "abc123");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(IdentifierLookup.lookup("--", None), LookupOutcome::NotFound);
    }
}
