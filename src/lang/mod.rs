//! Symbol addressing and the reference graph vocabulary.
//!
//! Every module contributes two lists to the workspace reference graph:
//!
//! - **origins**: a source location plus the [`Address`] it references
//! - **targets**: a declared symbol's address plus the range declaring it,
//!   possibly containing nested targets for compound symbols
//!
//! Addresses are traversal paths such as `var.region`, `module.network.vpc_id`
//! or `aws_instance.web[0]`.

mod range;
mod reference;

pub use range::{FileRange, SourceRange};
pub use reference::{
    best_match, innermost_targets_at, origin_at_pos, walk_targets, ReferenceOrigin,
    ReferenceOrigins, ReferenceTarget, ReferenceTargets, TargetKind,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One step of a traversal address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressStep {
    /// The leading name of an address (`var`, `module`, `aws_instance`).
    Root(String),
    /// A `.name` traversal.
    Attr(String),
    /// A `[key]` traversal.
    Index(IndexKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKey {
    Number(u64),
    String(String),
}

impl AddressStep {
    /// The name carried by a root or attribute step.
    pub fn name(&self) -> Option<&str> {
        match self {
            AddressStep::Root(name) | AddressStep::Attr(name) => Some(name),
            AddressStep::Index(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("empty address")]
    Empty,
    #[error("unexpected character {found:?} at offset {offset} in {input:?}")]
    Unexpected {
        input: String,
        offset: usize,
        found: char,
    },
    #[error("unterminated index in {0:?}")]
    UnterminatedIndex(String),
}

/// A symbol address: a non-empty list of steps starting with a root step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(Vec<AddressStep>);

impl Address {
    pub fn new(steps: Vec<AddressStep>) -> Address {
        Address(steps)
    }

    pub fn parse(input: &str) -> Result<Address, AddressParseError> {
        input.parse()
    }

    pub fn steps(&self) -> &[AddressStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn root_name(&self) -> Option<&str> {
        match self.0.first() {
            Some(AddressStep::Root(name)) => Some(name),
            _ => None,
        }
    }

    /// True when `prefix` equals the first `prefix.len()` steps of this address.
    pub fn starts_with(&self, prefix: &Address) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Replaces the first `skip` steps with `root`, e.g. turning
    /// `module.child.id` into `output.id` with `skip = 2`.
    ///
    /// Returns `None` when nothing would remain after the skipped steps or the
    /// first remaining step is not a named step.
    pub fn rebase(&self, skip: usize, root: &str) -> Option<Address> {
        let rest = self.0.get(skip..)?;
        let (first, tail) = rest.split_first()?;
        let name = first.name()?;

        let mut steps = Vec::with_capacity(rest.len() + 1);
        steps.push(AddressStep::Root(root.to_string()));
        steps.push(AddressStep::Attr(name.to_string()));
        steps.extend(tail.iter().cloned());
        Some(Address(steps))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            match step {
                AddressStep::Root(name) => f.write_str(name)?,
                AddressStep::Attr(name) => write!(f, ".{name}")?,
                AddressStep::Index(IndexKey::Number(n)) => write!(f, "[{n}]")?,
                AddressStep::Index(IndexKey::String(s)) => write!(f, "[{s:?}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let unexpected = |offset: usize, found: char| AddressParseError::Unexpected {
            input: input.to_string(),
            offset,
            found,
        };

        let mut steps = Vec::new();
        let mut chars = input.char_indices().peekable();

        let read_name = |chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>| {
            let mut name = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '-' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            name
        };

        let root = read_name(&mut chars);
        if root.is_empty() {
            return match chars.peek() {
                None => Err(AddressParseError::Empty),
                Some(&(offset, c)) => Err(unexpected(offset, c)),
            };
        }
        steps.push(AddressStep::Root(root));

        while let Some((offset, c)) = chars.next() {
            match c {
                '.' => {
                    let name = read_name(&mut chars);
                    if name.is_empty() {
                        return Err(match chars.peek() {
                            Some(&(offset, c)) => unexpected(offset, c),
                            None => unexpected(offset, c),
                        });
                    }
                    steps.push(AddressStep::Attr(name));
                }
                '[' => {
                    let mut raw = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        raw.push(c);
                    }
                    if !closed {
                        return Err(AddressParseError::UnterminatedIndex(input.to_string()));
                    }
                    let key = if let Some(quoted) =
                        raw.strip_prefix('"').and_then(|r| r.strip_suffix('"'))
                    {
                        IndexKey::String(quoted.to_string())
                    } else {
                        raw.parse::<u64>()
                            .map(IndexKey::Number)
                            .map_err(|_| unexpected(offset + 1, raw.chars().next().unwrap_or(']')))?
                    };
                    steps.push(AddressStep::Index(key));
                }
                other => return Err(unexpected(offset, other)),
            }
        }

        Ok(Address(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        for input in [
            "var.region",
            "module.child.id",
            "aws_instance.web[0]",
            "local.tags[\"env\"].value",
        ] {
            let addr = Address::parse(input).unwrap();
            assert_eq!(addr.to_string(), input);
        }
    }

    #[test]
    fn test_parse_steps() {
        let addr = Address::parse("module.child.list[2]").unwrap();
        assert_eq!(
            addr.steps(),
            &[
                AddressStep::Root("module".into()),
                AddressStep::Attr("child".into()),
                AddressStep::Attr("list".into()),
                AddressStep::Index(IndexKey::Number(2)),
            ]
        );
        assert_eq!(addr.root_name(), Some("module"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Address::parse(""), Err(AddressParseError::Empty));
        assert!(matches!(
            Address::parse("var..x"),
            Err(AddressParseError::Unexpected { .. })
        ));
        assert!(matches!(
            Address::parse("var.x[0"),
            Err(AddressParseError::UnterminatedIndex(_))
        ));
        assert!(Address::parse("var.x[abc]").is_err());
    }

    #[test]
    fn test_starts_with() {
        let full = Address::parse("aws_instance.web.id").unwrap();
        let prefix = Address::parse("aws_instance.web").unwrap();

        assert!(full.starts_with(&prefix));
        assert!(full.starts_with(&full));
        assert!(!prefix.starts_with(&full));
    }

    #[test]
    fn test_rebase_module_output() {
        let addr = Address::parse("module.child.id[0]").unwrap();
        let rebased = addr.rebase(2, "output").unwrap();
        assert_eq!(rebased.to_string(), "output.id[0]");

        let bare = Address::parse("module.child").unwrap();
        assert!(bare.rebase(2, "output").is_none());
    }
}
