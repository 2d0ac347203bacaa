//! TOML fixtures describing attributes, users, policies and resources.
//!
//! ```toml
//! [attributes]
//! clearance = "integer"
//! department = "string"
//!
//! [users.alice]
//! clearance = 3
//! department = "engineering"
//!
//! [policies]
//! cleared-engineers = [
//!     { attribute = "clearance", operator = ">", value = "2" },
//!     { attribute = "department", operator = "starts_with", value = "eng" },
//! ]
//!
//! [resources]
//! design-docs = ["cleared-engineers"]
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tessera_store::DefinitionWriter;
use tessera_types::{
    AttributeName, AttributeType, Condition, PolicyName, ResourceName, UserId,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fixture {
    pub attributes: BTreeMap<AttributeName, AttributeType>,
    pub users: BTreeMap<UserId, BTreeMap<AttributeName, toml::Value>>,
    pub policies: BTreeMap<PolicyName, Vec<Condition>>,
    pub resources: BTreeMap<ResourceName, Vec<PolicyName>>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid fixture {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Writes every definition into `store`, attributes first and resources
    /// last so references resolve.
    pub fn populate<W: DefinitionWriter + ?Sized>(&self, store: &W) -> Result<()> {
        for (name, attribute_type) in &self.attributes {
            store
                .define_attribute(name, *attribute_type)
                .with_context(|| format!("attribute '{name}'"))?;
        }

        for (user, attributes) in &self.users {
            let attributes = attributes
                .iter()
                .map(|(name, value)| -> Result<(AttributeName, String)> {
                    Ok((name.clone(), literal(value)?))
                })
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("user '{user}'"))?;
            store
                .put_user(user, attributes)
                .with_context(|| format!("user '{user}'"))?;
        }

        for (policy, conditions) in &self.policies {
            store
                .put_policy(policy, conditions.clone())
                .with_context(|| format!("policy '{policy}'"))?;
        }

        for (resource, policies) in &self.resources {
            store
                .put_resource(resource, policies.clone())
                .with_context(|| format!("resource '{resource}'"))?;
        }

        Ok(())
    }
}

/// Attribute values are stored as literals; TOML integers and booleans are
/// accepted for convenience.
fn literal(value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => bail!("unsupported attribute value {other}"),
    }
}
