//! Core language schema by core version.

use once_cell::sync::Lazy;
use semver::Version;

use super::{AttributeSchema, BlockSchema, BodySchema, LabelSchema, SchemaError};
use crate::module_meta::VersionConstraints;

/// Block types and the core version that introduced them.
const BLOCKS_SINCE: &[(&str, (u64, u64, u64))] = &[
    ("terraform", (0, 12, 0)),
    ("provider", (0, 12, 0)),
    ("variable", (0, 12, 0)),
    ("locals", (0, 12, 0)),
    ("output", (0, 12, 0)),
    ("module", (0, 12, 0)),
    ("resource", (0, 12, 0)),
    ("data", (0, 12, 0)),
    ("moved", (1, 1, 0)),
    ("import", (1, 5, 0)),
    ("check", (1, 5, 0)),
    ("removed", (1, 7, 0)),
];

static KNOWN_VERSIONS: Lazy<Vec<Version>> = Lazy::new(|| {
    [
        (0, 12, 0),
        (0, 13, 0),
        (0, 14, 0),
        (0, 15, 0),
        (1, 0, 0),
        (1, 1, 0),
        (1, 2, 0),
        (1, 3, 0),
        (1, 4, 0),
        (1, 5, 0),
        (1, 6, 0),
        (1, 7, 0),
        (1, 8, 0),
        (1, 9, 0),
    ]
    .into_iter()
    .map(|(major, minor, patch)| Version::new(major, minor, patch))
    .collect()
});

/// Core versions with a known schema, oldest first.
pub fn known_core_versions() -> &'static [Version] {
    &KNOWN_VERSIONS
}

/// Picks the core version to build a schema for.
///
/// A known tool version that satisfies the constraints is used as is.
/// Otherwise the newest known version satisfying the constraints wins.
fn select_version(constraints: &VersionConstraints, tool: Option<&Version>) -> Option<Version> {
    if let Some(tool) = tool.filter(|v| constraints.matches(v)) {
        return Some(tool.clone());
    }
    KNOWN_VERSIONS
        .iter()
        .rev()
        .find(|v| constraints.matches(v))
        .cloned()
}

/// The core schema for a module with the given core constraints and, when
/// known, the resolved core tool version.
pub fn core_module_schema(
    constraints: &VersionConstraints,
    tool: Option<&Version>,
) -> Result<BodySchema, SchemaError> {
    let version = select_version(constraints, tool).ok_or_else(|| {
        SchemaError::NoCompatibleCoreSchema {
            constraints: constraints.to_string(),
        }
    })?;

    let mut body = BodySchema::new();
    for (name, (major, minor, patch)) in BLOCKS_SINCE {
        if version >= Version::new(*major, *minor, *patch) {
            body.blocks.insert(name.to_string(), block(name));
        }
    }
    Ok(body)
}

fn attrs(names: &[&str]) -> BodySchema {
    names.iter().fold(BodySchema::new(), |body, name| {
        body.with_attribute(name, AttributeSchema::optional())
    })
}

fn lifecycle() -> BlockSchema {
    BlockSchema::new(
        vec![],
        attrs(&[
            "create_before_destroy",
            "prevent_destroy",
            "ignore_changes",
            "replace_triggered_by",
        ]),
    )
}

fn block(name: &str) -> BlockSchema {
    match name {
        "terraform" => BlockSchema::new(
            vec![],
            attrs(&["required_version", "experiments"])
                .with_block("required_providers", BlockSchema::new(vec![], BodySchema {
                    any_attribute: true,
                    ..Default::default()
                }))
                .with_block(
                    "backend",
                    BlockSchema::new(vec![LabelSchema::dep_key("type")], BodySchema::new()),
                )
                .with_block(
                    "cloud",
                    BlockSchema::new(vec![], attrs(&["organization", "hostname", "token"])),
                ),
        ),
        "provider" => BlockSchema::new(
            vec![LabelSchema::dep_key("name")],
            attrs(&["alias", "version"]),
        ),
        "variable" => BlockSchema::new(
            vec![LabelSchema::new("name")],
            attrs(&["description", "type", "default", "sensitive", "nullable"]).with_block(
                "validation",
                BlockSchema::new(
                    vec![],
                    BodySchema::new()
                        .with_attribute("condition", AttributeSchema::required())
                        .with_attribute("error_message", AttributeSchema::required()),
                ),
            ),
        ),
        "locals" => BlockSchema::new(
            vec![],
            BodySchema {
                any_attribute: true,
                ..Default::default()
            },
        ),
        "output" => BlockSchema::new(
            vec![LabelSchema::new("name")],
            attrs(&["description", "sensitive", "depends_on"])
                .with_attribute("value", AttributeSchema::required()),
        ),
        "module" => BlockSchema::new(
            vec![LabelSchema::dep_key("name")],
            attrs(&["version", "count", "for_each", "providers", "depends_on"])
                .with_attribute("source", AttributeSchema::required()),
        ),
        "resource" => BlockSchema::new(
            vec![LabelSchema::dep_key("type"), LabelSchema::new("name")],
            attrs(&["count", "for_each", "provider", "depends_on"])
                .with_block("lifecycle", lifecycle()),
        ),
        "data" => BlockSchema::new(
            vec![LabelSchema::dep_key("type"), LabelSchema::new("name")],
            attrs(&["count", "for_each", "provider", "depends_on"])
                .with_block("lifecycle", lifecycle()),
        ),
        "moved" => BlockSchema::new(
            vec![],
            BodySchema::new()
                .with_attribute("from", AttributeSchema::required())
                .with_attribute("to", AttributeSchema::required()),
        ),
        "import" => BlockSchema::new(
            vec![],
            attrs(&["provider", "for_each"])
                .with_attribute("to", AttributeSchema::required())
                .with_attribute("id", AttributeSchema::required()),
        ),
        "check" => BlockSchema::new(
            vec![LabelSchema::new("name")],
            BodySchema::new().with_block(
                "assert",
                BlockSchema::new(
                    vec![],
                    BodySchema::new()
                        .with_attribute("condition", AttributeSchema::required())
                        .with_attribute("error_message", AttributeSchema::required()),
                ),
            ),
        ),
        "removed" => BlockSchema::new(
            vec![],
            BodySchema::new()
                .with_attribute("from", AttributeSchema::required())
                .with_block("lifecycle", lifecycle()),
        ),
        _ => BlockSchema::default(),
    }
}
