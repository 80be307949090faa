use super::{Extensions, ExternalDocumentation, ModelRef, Tag};

/// Metadata about the API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    /// Root-level `tags` in v2 documents land here
    pub tags: Vec<ModelRef<Tag>>,
    /// Root-level `externalDocs` in v2 documents land here
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct License {
    pub name: String,
    pub url: Option<String>,
    pub extensions: Extensions,
}
