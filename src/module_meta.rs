//! Declared facts about a module: provider requirements, core version
//! constraints, variables, outputs and module calls.
//!
//! These are produced by metadata workers outside this crate and consumed by
//! schema construction and by parent modules that need a child's interface.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVIDER_HOST: &str = "registry.terraform.io";
pub const LEGACY_NAMESPACE: &str = "-";

static ADDR_PART_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").unwrap());
static HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]*(:[0-9]+)?$").unwrap());

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProviderAddrError {
    #[error("provider address {0:?} must have one to three slash-separated parts")]
    PartCount(String),
    #[error("invalid {part} {value:?} in provider address")]
    InvalidPart { part: &'static str, value: String },
}

/// Fully qualified provider address `hostname/namespace/type`.
///
/// Serialised as its string form so it can key JSON objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderAddr {
    pub hostname: String,
    pub namespace: String,
    pub type_name: String,
}

impl ProviderAddr {
    pub fn new(namespace: &str, type_name: &str) -> ProviderAddr {
        ProviderAddr {
            hostname: DEFAULT_PROVIDER_HOST.to_string(),
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
        }
    }

    /// Addresses written as a bare type name predate namespaces.
    pub fn is_legacy(&self) -> bool {
        self.namespace == LEGACY_NAMESPACE
    }

    /// `namespace/type` for the default registry, the full address otherwise.
    pub fn for_display(&self) -> String {
        if self.hostname == DEFAULT_PROVIDER_HOST {
            format!("{}/{}", self.namespace, self.type_name)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for ProviderAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.hostname, self.namespace, self.type_name)
    }
}

impl FromStr for ProviderAddr {
    type Err = ProviderAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let parts: Vec<&str> = lowered.split('/').collect();
        let (hostname, namespace, type_name) = match parts.as_slice() {
            [type_name] => (DEFAULT_PROVIDER_HOST, LEGACY_NAMESPACE, *type_name),
            [namespace, type_name] => (DEFAULT_PROVIDER_HOST, *namespace, *type_name),
            [hostname, namespace, type_name] => (*hostname, *namespace, *type_name),
            _ => return Err(ProviderAddrError::PartCount(s.to_string())),
        };

        if !HOST_RE.is_match(hostname) {
            return Err(ProviderAddrError::InvalidPart {
                part: "hostname",
                value: hostname.to_string(),
            });
        }
        if namespace != LEGACY_NAMESPACE && !ADDR_PART_RE.is_match(namespace) {
            return Err(ProviderAddrError::InvalidPart {
                part: "namespace",
                value: namespace.to_string(),
            });
        }
        if !ADDR_PART_RE.is_match(type_name) {
            return Err(ProviderAddrError::InvalidPart {
                part: "type",
                value: type_name.to_string(),
            });
        }

        Ok(ProviderAddr {
            hostname: hostname.to_string(),
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
        })
    }
}

impl TryFrom<String> for ProviderAddr {
    type Error = ProviderAddrError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ProviderAddr> for String {
    fn from(addr: ProviderAddr) -> String {
        addr.to_string()
    }
}

/// Module-local provider reference, e.g. `aws` or `aws.west`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderRef {
    pub local_name: String,
    pub alias: Option<String>,
}

impl ProviderRef {
    pub fn new(local_name: &str) -> ProviderRef {
        ProviderRef {
            local_name: local_name.to_string(),
            alias: None,
        }
    }
}

impl fmt::Display for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{}.{}", self.local_name, alias),
            None => f.write_str(&self.local_name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// `~>`: allows the rightmost given version segment to increase.
    Pessimistic,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub op: ConstraintOp,
    pub version: Version,
    /// Number of version segments written (`1.2` is 2).
    pub segments: usize,
}

impl Constraint {
    pub fn matches(&self, v: &Version) -> bool {
        let v = &Version::new(v.major, v.minor, v.patch);
        match self.op {
            ConstraintOp::Eq => v == &self.version,
            ConstraintOp::Ne => v != &self.version,
            ConstraintOp::Gt => v > &self.version,
            ConstraintOp::Ge => v >= &self.version,
            ConstraintOp::Lt => v < &self.version,
            ConstraintOp::Le => v <= &self.version,
            ConstraintOp::Pessimistic => {
                let upper = match self.segments {
                    3 => Version::new(self.version.major, self.version.minor + 1, 0),
                    _ => Version::new(self.version.major + 1, 0, 0),
                };
                v >= &self.version && v < &upper
            }
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed version constraint {0:?}")]
pub struct ConstraintParseError(pub String);

/// A conjunction of version constraints such as `>= 1.3, < 2.0`.
///
/// An empty set matches every version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionConstraints(pub Vec<Constraint>);

impl VersionConstraints {
    pub fn parse(input: &str) -> Result<VersionConstraints, ConstraintParseError> {
        input.parse()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.0.iter().all(|c| c.matches(version))
    }
}

impl FromStr for VersionConstraints {
    type Err = ConstraintParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ConstraintParseError(input.to_string());
        input
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (op, rest) = [
                    ("~>", ConstraintOp::Pessimistic),
                    (">=", ConstraintOp::Ge),
                    ("<=", ConstraintOp::Le),
                    ("!=", ConstraintOp::Ne),
                    (">", ConstraintOp::Gt),
                    ("<", ConstraintOp::Lt),
                    ("=", ConstraintOp::Eq),
                ]
                .into_iter()
                .find_map(|(prefix, op)| part.strip_prefix(prefix).map(|rest| (op, rest)))
                .unwrap_or((ConstraintOp::Eq, part));

                let raw = rest.trim().trim_start_matches('v');
                let segments: Vec<&str> = raw.split('.').collect();
                if segments.is_empty() || segments.len() > 3 {
                    return Err(err());
                }
                let mut numbers = [0u64; 3];
                for (i, segment) in segments.iter().enumerate() {
                    numbers[i] = segment.parse().map_err(|_| err())?;
                }

                Ok(Constraint {
                    op,
                    version: Version::new(numbers[0], numbers[1], numbers[2]),
                    segments: segments.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(VersionConstraints)
    }
}

impl fmt::Display for VersionConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|c| {
                let op = match c.op {
                    ConstraintOp::Eq => "=",
                    ConstraintOp::Ne => "!=",
                    ConstraintOp::Gt => ">",
                    ConstraintOp::Ge => ">=",
                    ConstraintOp::Lt => "<",
                    ConstraintOp::Le => "<=",
                    ConstraintOp::Pessimistic => "~>",
                };
                let v = &c.version;
                let version = match c.segments {
                    1 => format!("{}", v.major),
                    2 => format!("{}.{}", v.major, v.minor),
                    _ => v.to_string(),
                };
                format!("{op} {version}")
            })
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub description: Option<String>,
    /// The type expression as written, e.g. `list(string)`.
    pub type_expr: Option<String>,
    pub default: Option<serde_json::Value>,
    pub sensitive: bool,
}

impl Variable {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub description: Option<String>,
    pub sensitive: bool,
}

/// A module call resolved to an absolute directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleCall {
    pub local_name: String,
    pub source_addr: String,
    pub path: PathBuf,
}

/// Metadata of one module in the shape consumed by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleMeta {
    pub path: PathBuf,
    pub core_requirements: VersionConstraints,
    pub provider_references: BTreeMap<ProviderRef, ProviderAddr>,
    pub provider_requirements: BTreeMap<ProviderAddr, VersionConstraints>,
    pub variables: BTreeMap<String, Variable>,
    pub outputs: BTreeMap<String, Output>,
}
