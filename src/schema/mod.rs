//! Body schemas describing which blocks and attributes a configuration
//! directory may contain.
//!
//! ## Design Decisions
//!
//! - The core language schema depends only on the core version (see [`core`])
//! - Provider schemas attach to the `provider`, `resource` and `data` blocks
//!   as *dependent bodies*, keyed by the block's first label
//! - Variable files get a schema synthesised from declared variables
//!   (see [`variables`])
//! - The global provider schema document lives in a [`SchemaStore`] and is
//!   replaced wholesale on refresh

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod core;
mod store;
mod variables;

pub use self::core::{core_module_schema, known_core_versions};
pub use store::{
    ChangeCallback, JsonFileSource, ManualWatcher, RefreshMode, SchemaReader, SchemaSource,
    SchemaStore, StaticSource, Watcher,
};
pub use variables::schema_for_variables;

use crate::module_meta::ProviderAddr;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("no compatible core schema for constraints {constraints:?}")]
    NoCompatibleCoreSchema { constraints: String },
    #[error("invalid variable name {name:?}")]
    InvalidVariableName { name: String },
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeSchema {
    pub description: Option<String>,
    pub required: bool,
    pub sensitive: bool,
    /// Type constraint as written, e.g. `list(string)`.
    pub type_expr: Option<String>,
}

impl AttributeSchema {
    pub fn required() -> AttributeSchema {
        AttributeSchema {
            required: true,
            ..Default::default()
        }
    }

    pub fn optional() -> AttributeSchema {
        AttributeSchema::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSchema {
    pub name: String,
    /// Whether the label's value selects a dependent body.
    #[serde(default)]
    pub is_dep_key: bool,
}

impl LabelSchema {
    pub fn new(name: &str) -> LabelSchema {
        LabelSchema {
            name: name.to_string(),
            is_dep_key: false,
        }
    }

    pub fn dep_key(name: &str) -> LabelSchema {
        LabelSchema {
            name: name.to_string(),
            is_dep_key: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockSchema {
    pub description: Option<String>,
    pub labels: Vec<LabelSchema>,
    pub body: BodySchema,
    /// Extra bodies merged into `body` when the dependency key label has the
    /// given value.
    pub dependent: BTreeMap<String, BodySchema>,
}

impl BlockSchema {
    pub fn new(labels: Vec<LabelSchema>, body: BodySchema) -> BlockSchema {
        BlockSchema {
            labels,
            body,
            ..Default::default()
        }
    }

    /// The effective body for a block whose dependency key is `key`.
    pub fn body_for(&self, key: &str) -> BodySchema {
        let mut body = self.body.clone();
        if let Some(dependent) = self.dependent.get(key) {
            body.merge(dependent.clone());
        }
        body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodySchema {
    pub attributes: BTreeMap<String, AttributeSchema>,
    pub blocks: BTreeMap<String, BlockSchema>,
    /// Accepts attributes of any name, as in `locals`.
    pub any_attribute: bool,
}

impl BodySchema {
    pub fn new() -> BodySchema {
        BodySchema::default()
    }

    pub fn with_attribute(mut self, name: &str, attr: AttributeSchema) -> Self {
        self.attributes.insert(name.to_string(), attr);
        self
    }

    pub fn with_block(mut self, name: &str, block: BlockSchema) -> Self {
        self.blocks.insert(name.to_string(), block);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    pub fn block(&self, name: &str) -> Option<&BlockSchema> {
        self.blocks.get(name)
    }

    /// Merges `other` into this body. Attributes in `other` win; blocks
    /// present on both sides are merged recursively, dependent bodies
    /// included.
    pub fn merge(&mut self, other: BodySchema) {
        self.any_attribute |= other.any_attribute;
        self.attributes.extend(other.attributes);
        for (name, block) in other.blocks {
            match self.blocks.get_mut(&name) {
                Some(existing) => {
                    if block.description.is_some() {
                        existing.description = block.description;
                    }
                    if !block.labels.is_empty() {
                        existing.labels = block.labels;
                    }
                    existing.body.merge(block.body);
                    for (key, body) in block.dependent {
                        existing.dependent.entry(key).or_default().merge(body);
                    }
                }
                None => {
                    self.blocks.insert(name, block);
                }
            }
        }
    }

    /// Adds a dependent body under block `block_name`, keyed by `key`.
    /// Does nothing if the block is unknown.
    pub fn add_dependent(&mut self, block_name: &str, key: &str, body: BodySchema) {
        if let Some(block) = self.blocks.get_mut(block_name) {
            block.dependent.entry(key.to_string()).or_default().merge(body);
        }
    }
}

/// Schema published by one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSchema {
    pub provider: BodySchema,
    pub resources: BTreeMap<String, BodySchema>,
    pub data_sources: BTreeMap<String, BodySchema>,
}

/// The global provider schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSchemas {
    pub providers: BTreeMap<ProviderAddr, ProviderSchema>,
}

impl ProviderSchemas {
    pub fn provider(&self, addr: &ProviderAddr) -> Option<&ProviderSchema> {
        self.providers.get(addr)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Merges one provider's schema into a module schema under the provider's
/// local name.
pub fn merge_provider_schema(body: &mut BodySchema, local_name: &str, schema: &ProviderSchema) {
    body.add_dependent("provider", local_name, schema.provider.clone());
    for (ty, resource) in &schema.resources {
        body.add_dependent("resource", ty, resource.clone());
    }
    for (ty, data) in &schema.data_sources {
        body.add_dependent("data", ty, data.clone());
    }
}
