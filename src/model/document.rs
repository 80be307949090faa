use indexmap::IndexMap;

use super::{Channel, Components, Extensions, Info, ModelRef, Operation, Server};

/// Root of an AsyncAPI document
///
/// `operations` is always populated in the v3 shape, including for v2 input
/// after the upgrade pipeline has run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub id: Option<String>,
    pub info: Info,
    pub servers: IndexMap<String, ModelRef<Server>>,
    pub default_content_type: Option<String>,
    pub channels: IndexMap<String, ModelRef<Channel>>,
    pub operations: IndexMap<String, ModelRef<Operation>>,
    pub components: Components,
    pub extensions: Extensions,
}
