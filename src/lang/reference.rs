use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Position;

use super::{Address, FileRange};

/// A source location plus the symbol address it references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceOrigin {
    pub addr: Address,
    pub range: FileRange,
}

pub type ReferenceOrigins = Vec<ReferenceOrigin>;

/// What kind of declaration a target stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Variable,
    Local,
    Output,
    Resource,
    DataSource,
    ModuleCall,
    Provider,
    Attribute,
}

/// A declared symbol: its address, the range declaring it and any nested
/// targets addressable through it (attributes of a resource, outputs of a
/// module call).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceTarget {
    pub addr: Address,
    pub kind: TargetKind,
    pub name: Option<String>,
    pub description: Option<String>,
    /// The whole declaring construct.
    pub range: Option<FileRange>,
    /// The declaration header, used as the navigation target when present.
    pub def_range: Option<FileRange>,
    #[serde(default)]
    pub nested: Vec<ReferenceTarget>,
}

pub type ReferenceTargets = Vec<ReferenceTarget>;

impl ReferenceTarget {
    pub fn new(addr: Address, kind: TargetKind) -> ReferenceTarget {
        ReferenceTarget {
            addr,
            kind,
            name: None,
            description: None,
            range: None,
            def_range: None,
            nested: vec![],
        }
    }

    pub fn with_range(mut self, range: FileRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_def_range(mut self, range: FileRange) -> Self {
        self.def_range = Some(range);
        self
    }

    pub fn with_nested(mut self, nested: Vec<ReferenceTarget>) -> Self {
        self.nested = nested;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The range to navigate to: the declaration header if known, else the
    /// whole declaration.
    pub fn navigation_range(&self) -> Option<&FileRange> {
        self.def_range.as_ref().or(self.range.as_ref())
    }

    pub fn covers(&self, filename: &str, position: Position) -> bool {
        self.range
            .as_ref()
            .is_some_and(|range| range.contains(filename, position))
    }
}

/// All targets, parents before their nested targets.
pub fn walk_targets(targets: &[ReferenceTarget]) -> Vec<&ReferenceTarget> {
    let mut out = Vec::new();
    let mut stack: Vec<&ReferenceTarget> = targets.iter().rev().collect();
    while let Some(target) = stack.pop() {
        out.push(target);
        stack.extend(target.nested.iter().rev());
    }
    out
}

/// The most specific target for an address: the target with the longest
/// address that is a prefix of (or equal to) `addr`. Ties go to the first
/// target in declaration order.
pub fn best_match<'a>(
    targets: &'a [ReferenceTarget],
    addr: &Address,
) -> Option<&'a ReferenceTarget> {
    walk_targets(targets)
        .into_iter()
        .filter(|target| addr.starts_with(&target.addr))
        .fold(None, |best: Option<&ReferenceTarget>, target| match best {
            Some(current) if current.addr.len() >= target.addr.len() => Some(current),
            _ => Some(target),
        })
}

/// Innermost targets whose range covers the position.
///
/// Returns `None` when no target covers the position at all, so that callers
/// can tell "not addressable" apart from "addressable".
pub fn innermost_targets_at<'a>(
    targets: &'a [ReferenceTarget],
    filename: &str,
    position: Position,
) -> Option<Vec<&'a ReferenceTarget>> {
    fn collect<'a>(
        targets: &'a [ReferenceTarget],
        filename: &str,
        position: Position,
        out: &mut Vec<&'a ReferenceTarget>,
    ) -> bool {
        let mut found = false;
        for target in targets.iter().filter(|t| t.covers(filename, position)) {
            found = true;
            if !collect(&target.nested, filename, position, out) {
                out.push(target);
            }
        }
        found
    }

    let mut out = Vec::new();
    collect(targets, filename, position, &mut out).then_some(out)
}

/// The first origin whose range covers the position.
pub fn origin_at_pos<'a>(
    origins: &'a [ReferenceOrigin],
    filename: &str,
    position: Position,
) -> Option<&'a ReferenceOrigin> {
    origins
        .iter()
        .find(|origin| origin.range.contains(filename, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::SourceRange;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn resource_targets() -> Vec<ReferenceTarget> {
        vec![
            ReferenceTarget::new(addr("aws_instance.web"), TargetKind::Resource)
                .with_range(FileRange::new("main.tf", SourceRange::new((0, 0), (5, 1))))
                .with_nested(vec![ReferenceTarget::new(
                    addr("aws_instance.web.ami"),
                    TargetKind::Attribute,
                )
                .with_range(FileRange::new("main.tf", SourceRange::new((1, 2), (1, 20))))]),
            ReferenceTarget::new(addr("var.list"), TargetKind::Variable)
                .with_range(FileRange::new("vars.tf", SourceRange::new((0, 0), (2, 1)))),
        ]
    }

    #[test]
    fn test_walk_targets_parent_first() {
        let targets = resource_targets();
        let names: Vec<String> = walk_targets(&targets)
            .iter()
            .map(|t| t.addr.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["aws_instance.web", "aws_instance.web.ami", "var.list"]
        );
    }

    #[test]
    fn test_best_match_prefers_most_specific() {
        let targets = resource_targets();

        let exact = best_match(&targets, &addr("aws_instance.web.ami")).unwrap();
        assert_eq!(exact.addr, addr("aws_instance.web.ami"));

        let parent = best_match(&targets, &addr("aws_instance.web.id")).unwrap();
        assert_eq!(parent.addr, addr("aws_instance.web"));

        let indexed = best_match(&targets, &addr("var.list[0]")).unwrap();
        assert_eq!(indexed.addr, addr("var.list"));

        assert!(best_match(&targets, &addr("var.other")).is_none());
    }

    #[test]
    fn test_innermost_targets() {
        let targets = resource_targets();

        let inner = innermost_targets_at(&targets, "main.tf", Position::new(1, 5)).unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].addr, addr("aws_instance.web.ami"));

        let outer = innermost_targets_at(&targets, "main.tf", Position::new(3, 0)).unwrap();
        assert_eq!(outer[0].addr, addr("aws_instance.web"));
    }

    #[test]
    fn test_innermost_not_addressable() {
        let targets = resource_targets();
        assert!(innermost_targets_at(&targets, "main.tf", Position::new(9, 0)).is_none());
        assert!(innermost_targets_at(&targets, "other.tf", Position::new(1, 5)).is_none());
    }

    #[test]
    fn test_origin_at_pos() {
        let origins = vec![ReferenceOrigin {
            addr: addr("var.list"),
            range: FileRange::new("main.tf", SourceRange::new((4, 10), (4, 18))),
        }];

        assert!(origin_at_pos(&origins, "main.tf", Position::new(4, 12)).is_some());
        assert!(origin_at_pos(&origins, "main.tf", Position::new(4, 2)).is_none());
    }
}
