//! Schema for variable-value files, synthesised from declared variables.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{AttributeSchema, BodySchema, SchemaError};
use crate::module_meta::Variable;

static VARIABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

/// One attribute per declared variable, required when it has no default.
pub fn schema_for_variables(
    variables: &BTreeMap<String, Variable>,
) -> Result<BodySchema, SchemaError> {
    let mut body = BodySchema::new();
    for (name, variable) in variables {
        if !VARIABLE_NAME_RE.is_match(name) {
            return Err(SchemaError::InvalidVariableName { name: name.clone() });
        }
        body.attributes.insert(
            name.clone(),
            AttributeSchema {
                description: variable.description.clone(),
                required: variable.is_required(),
                sensitive: variable.sensitive,
                type_expr: variable.type_expr.clone(),
            },
        );
    }
    Ok(body)
}
