use super::{Extensions, ModelRef};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
    pub external_docs: Option<ModelRef<ExternalDocumentation>>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalDocumentation {
    pub description: Option<String>,
    pub url: String,
    pub extensions: Extensions,
}
