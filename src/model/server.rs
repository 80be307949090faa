//! Servers and server variables

use indexmap::IndexMap;

use super::{Bindings, Extensions, ExternalDocumentation, ModelRef, SecurityScheme, Tag};

/// A message broker or endpoint
///
/// v2's single `url` is split into `host` and `pathname` when read and composed
/// again when a v2 document is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Server {
    pub host: String,
    pub protocol: String,
    pub protocol_version: Option<String>,
    pub pathname: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub variables: IndexMap<String, ModelRef<ServerVariable>>,
    pub security: Vec<ModelRef<SecurityScheme>>,
    pub tags: Vec<ModelRef<Tag>>,
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub bindings: Option<ModelRef<Bindings>>,
    pub extensions: Extensions,
}

impl Server {
    /// `host` followed by `pathname`, the v2 `url` form
    pub fn url(&self) -> String {
        match &self.pathname {
            Some(pathname) if !pathname.is_empty() => {
                if pathname.starts_with('/') {
                    format!("{}{}", self.host, pathname)
                } else {
                    format!("{}/{}", self.host, pathname)
                }
            }
            _ => self.host.clone(),
        }
    }
}

/// Substitution value for a `{variable}` in a server host or pathname
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerVariable {
    pub enum_values: Vec<String>,
    pub default: Option<String>,
    pub description: Option<String>,
    pub examples: Vec<String>,
    pub extensions: Extensions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_composition() {
        let mut server = Server {
            host: "test.mykafkacluster.org:18092".into(),
            ..Default::default()
        };
        assert_eq!(server.url(), "test.mykafkacluster.org:18092");
        server.pathname = Some("/v1".into());
        assert_eq!(server.url(), "test.mykafkacluster.org:18092/v1");
        server.pathname = Some("v2".into());
        assert_eq!(server.url(), "test.mykafkacluster.org:18092/v2");
    }
}
