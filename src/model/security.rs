//! Security schemes and OAuth flows

use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};

use super::Extensions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecuritySchemeType {
    UserPassword,
    ApiKey,
    X509,
    SymmetricEncryption,
    AsymmetricEncryption,
    HttpApiKey,
    Http,
    OAuth2,
    OpenIdConnect,
    Plain,
    ScramSha256,
    ScramSha512,
    Gssapi,
}

impl SecuritySchemeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecuritySchemeType::UserPassword => "userPassword",
            SecuritySchemeType::ApiKey => "apiKey",
            SecuritySchemeType::X509 => "X509",
            SecuritySchemeType::SymmetricEncryption => "symmetricEncryption",
            SecuritySchemeType::AsymmetricEncryption => "asymmetricEncryption",
            SecuritySchemeType::HttpApiKey => "httpApiKey",
            SecuritySchemeType::Http => "http",
            SecuritySchemeType::OAuth2 => "oauth2",
            SecuritySchemeType::OpenIdConnect => "openIdConnect",
            SecuritySchemeType::Plain => "plain",
            SecuritySchemeType::ScramSha256 => "scramSha256",
            SecuritySchemeType::ScramSha512 => "scramSha512",
            SecuritySchemeType::Gssapi => "gssapi",
        }
    }
}

impl FromStr for SecuritySchemeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s {
            "userPassword" => SecuritySchemeType::UserPassword,
            "apiKey" => SecuritySchemeType::ApiKey,
            "X509" => SecuritySchemeType::X509,
            "symmetricEncryption" => SecuritySchemeType::SymmetricEncryption,
            "asymmetricEncryption" => SecuritySchemeType::AsymmetricEncryption,
            "httpApiKey" => SecuritySchemeType::HttpApiKey,
            "http" => SecuritySchemeType::Http,
            "oauth2" => SecuritySchemeType::OAuth2,
            "openIdConnect" => SecuritySchemeType::OpenIdConnect,
            "plain" => SecuritySchemeType::Plain,
            "scramSha256" => SecuritySchemeType::ScramSha256,
            "scramSha512" => SecuritySchemeType::ScramSha512,
            "gssapi" => SecuritySchemeType::Gssapi,
            other => return Err(format!("unknown security scheme type '{}'", other)),
        };
        Ok(parsed)
    }
}

impl fmt::Display for SecuritySchemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `in` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecuritySchemeLocation {
    User,
    Password,
    Query,
    Header,
    Cookie,
}

impl SecuritySchemeLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecuritySchemeLocation::User => "user",
            SecuritySchemeLocation::Password => "password",
            SecuritySchemeLocation::Query => "query",
            SecuritySchemeLocation::Header => "header",
            SecuritySchemeLocation::Cookie => "cookie",
        }
    }
}

impl FromStr for SecuritySchemeLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(SecuritySchemeLocation::User),
            "password" => Ok(SecuritySchemeLocation::Password),
            "query" => Ok(SecuritySchemeLocation::Query),
            "header" => Ok(SecuritySchemeLocation::Header),
            "cookie" => Ok(SecuritySchemeLocation::Cookie),
            other => Err(format!("unknown security scheme location '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityScheme {
    pub scheme_type: Option<SecuritySchemeType>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub location: Option<SecuritySchemeLocation>,
    pub scheme: Option<String>,
    pub bearer_format: Option<String>,
    pub flows: Option<OAuthFlows>,
    pub open_id_connect_url: Option<String>,
    /// Scopes required by the API; v2 requirement scopes are merged in here
    pub scopes: IndexSet<String>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OAuthFlows {
    pub implicit: Option<OAuthFlow>,
    pub password: Option<OAuthFlow>,
    pub client_credentials: Option<OAuthFlow>,
    pub authorization_code: Option<OAuthFlow>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OAuthFlow {
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
    /// Scope name to description (`scopes` in v2, `availableScopes` in v3)
    pub available_scopes: IndexMap<String, String>,
    pub extensions: Extensions,
}
