//! Code action kinds the server can produce.

use std::collections::BTreeSet;

use tower_lsp::lsp_types::CodeActionKind;

pub const SOURCE_FORMAT_ALL: &str = "source.formatAll";
pub const SOURCE_FORMAT_ALL_MODSTORE: &str = "source.formatAll.modstore";

/// A set of code action kinds, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeActions(BTreeSet<String>);

impl CodeActions {
    /// Every kind this server knows how to produce.
    pub fn supported() -> CodeActions {
        [SOURCE_FORMAT_ALL, SOURCE_FORMAT_ALL_MODSTORE].into_iter().collect()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.0.contains(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_sorted_vec(&self) -> Vec<CodeActionKind> {
        self.0
            .iter()
            .map(|kind| CodeActionKind::from(kind.clone()))
            .collect()
    }

    /// The supported kinds a client asked for. A requested kind selects
    /// itself and every more specific kind below it, so `source` selects
    /// both format kinds. `None` selects everything.
    pub fn only(&self, requested: Option<&[CodeActionKind]>) -> CodeActions {
        let Some(requested) = requested else {
            return self.clone();
        };
        self.0
            .iter()
            .filter(|kind| {
                requested.iter().any(|wanted| {
                    let wanted = wanted.as_str();
                    kind.as_str() == wanted || kind.starts_with(&format!("{wanted}."))
                })
            })
            .map(String::as_str)
            .collect()
    }
}

impl<'a> FromIterator<&'a str> for CodeActions {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        CodeActions(iter.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_sorted() {
        let kinds = CodeActions::supported().as_sorted_vec();
        assert_eq!(
            kinds,
            vec![
                CodeActionKind::from(SOURCE_FORMAT_ALL.to_string()),
                CodeActionKind::from(SOURCE_FORMAT_ALL_MODSTORE.to_string()),
            ]
        );
    }

    #[test]
    fn test_only_selects_hierarchy() {
        let supported = CodeActions::supported();

        let source = supported.only(Some(&[CodeActionKind::SOURCE]));
        assert_eq!(source, supported);

        let narrow = supported.only(Some(&[CodeActionKind::from(
            SOURCE_FORMAT_ALL_MODSTORE.to_string(),
        )]));
        assert!(narrow.contains(SOURCE_FORMAT_ALL_MODSTORE));
        assert!(!narrow.contains(SOURCE_FORMAT_ALL));

        let quickfix = supported.only(Some(&[CodeActionKind::QUICKFIX]));
        assert!(quickfix.is_empty());
    }

    #[test]
    fn test_only_without_request_keeps_all() {
        let supported = CodeActions::supported();
        assert_eq!(supported.only(None), supported);
    }
}
