//! Tool registry: the frozen list of tool definitions and the name lookup.

use std::collections::HashMap;
use std::fmt;

use azdo_core::{Error, Result};

use crate::protocol::ToolDefinition;
use crate::tools;

/// Functional area that owns a group of tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Projects,
    WorkItems,
    Git,
    Pipelines,
    Releases,
    Wiki,
    Boards,
    Users,
}

impl Domain {
    /// Every domain in listing priority order.
    pub const ALL: [Domain; 8] = [
        Domain::Projects,
        Domain::WorkItems,
        Domain::Git,
        Domain::Pipelines,
        Domain::Releases,
        Domain::Wiki,
        Domain::Boards,
        Domain::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Projects => "projects",
            Domain::WorkItems => "work_items",
            Domain::Git => "git",
            Domain::Pipelines => "pipelines",
            Domain::Releases => "releases",
            Domain::Wiki => "wiki",
            Domain::Boards => "boards",
            Domain::Users => "users",
        }
    }

    /// Tool definitions declared by this domain.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        match self {
            Domain::Projects => tools::projects::definitions(),
            Domain::WorkItems => tools::work_items::definitions(),
            Domain::Git => tools::git::definitions(),
            Domain::Pipelines => tools::pipelines::definitions(),
            Domain::Releases => tools::releases::definitions(),
            Domain::Wiki => tools::wiki::definitions(),
            Domain::Boards => tools::boards::definitions(),
            Domain::Users => tools::users::definitions(),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered tool definitions plus an explicit name to domain map.
///
/// Built once at startup and shared by `Arc`; never mutated afterwards.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    owners: HashMap<String, Domain>,
}

impl ToolRegistry {
    /// Registry of every built-in tool.
    pub fn new() -> Result<Self> {
        Self::from_domains(
            Domain::ALL
                .iter()
                .map(|domain| (*domain, domain.definitions())),
        )
    }

    /// Build a registry from per-domain definition lists, keeping their order.
    ///
    /// Fails if two definitions share a name.
    pub fn from_domains(
        domains: impl IntoIterator<Item = (Domain, Vec<ToolDefinition>)>,
    ) -> Result<Self> {
        let mut tools = Vec::new();
        let mut owners = HashMap::new();

        for (domain, definitions) in domains {
            for definition in definitions {
                if let Some(existing) = owners.insert(definition.name.clone(), domain) {
                    return Err(Error::Config(format!(
                        "Duplicate tool name `{}` (declared by {} and {})",
                        definition.name, existing, domain
                    )));
                }
                tools.push(definition);
            }
        }

        tracing::debug!("Registered {} tools", tools.len());
        Ok(Self { tools, owners })
    }

    /// All definitions in listing order.
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn domain_of(&self, name: &str) -> Option<Domain> {
        self.owners.get(name).copied()
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(name: &str) -> ToolDefinition {
        ToolDefinition::new(name, "test", json!({"type": "object", "properties": {}}))
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let err = ToolRegistry::from_domains(vec![
            (Domain::Projects, vec![def("list_things")]),
            (Domain::Git, vec![def("list_things")]),
        ])
        .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("list_things"));
    }

    #[test]
    fn test_builtin_registry_builds() {
        let registry = ToolRegistry::new().unwrap();
        assert!(registry.len() >= 40);
        assert_eq!(registry.domain_of("get_work_item"), Some(Domain::WorkItems));
        assert_eq!(registry.domain_of("upsert_wiki_page"), Some(Domain::Wiki));
        assert_eq!(registry.domain_of("nope"), None);
    }

    #[test]
    fn test_listing_follows_domain_priority() {
        let registry = ToolRegistry::new().unwrap();

        let positions: Vec<usize> = registry
            .tools()
            .iter()
            .map(|t| {
                let domain = registry.domain_of(&t.name).unwrap();
                Domain::ALL.iter().position(|d| *d == domain).unwrap()
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] <= w[1]));

        // Declaration order inside a domain is preserved.
        let expected: Vec<String> = Domain::ALL
            .iter()
            .flat_map(|d| d.definitions())
            .map(|t| t.name)
            .collect();
        let actual: Vec<String> = registry.tools().iter().map(|t| t.name.clone()).collect();
        assert_eq!(actual, expected);
        assert_eq!(registry.tools()[0].name, "list_projects");
    }

    #[test]
    fn test_every_schema_is_an_object_schema() {
        let registry = ToolRegistry::new().unwrap();
        for tool in registry.tools() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(tool.input_schema["properties"].is_object(), "{}", tool.name);
            assert!(!tool.description.is_empty(), "{}", tool.name);
        }
    }
}
