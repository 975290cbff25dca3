//! IMS identity context: who is calling the API and with which token.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Context name used when none is configured.
pub const DEFAULT_CONTEXT_NAME: &str = "aio-cli-plugin-cloudmanager";

/// Default Cloud Manager endpoint.
pub const DEFAULT_BASE_URL: &str = "https://cloudmanager.adobe.io";

/// Credentials for one IMS context.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImsContext {
    /// IMS organization, sent as `x-gw-ims-org-id`.
    pub org_id: String,
    /// Integration client id, sent as `x-api-key`.
    pub client_id: String,
    /// Bearer token.
    pub access_token: String,
}

impl fmt::Debug for ImsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImsContext")
            .field("org_id", &self.org_id)
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Source of the caller's identity.
pub trait IdentityProvider {
    /// Name of the context being resolved, used in error messages.
    fn context_name(&self) -> &str;

    /// Current credentials, or [`Error::AuthContext`] when none are configured.
    fn current_context(&self) -> Result<ImsContext, Error>;
}

/// Identity held as a plain value.
///
/// Starts empty or populated; `set` and `reset` swap it between runs.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    name: String,
    context: Option<ImsContext>,
}

impl StaticIdentity {
    /// Populated identity under the default context name.
    pub fn new(context: ImsContext) -> Self {
        Self {
            name: DEFAULT_CONTEXT_NAME.to_string(),
            context: Some(context),
        }
    }

    /// Identity with no credentials; every lookup fails.
    pub fn empty() -> Self {
        Self {
            name: DEFAULT_CONTEXT_NAME.to_string(),
            context: None,
        }
    }

    /// Renames the context reported in errors.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Installs credentials.
    pub fn set(&mut self, context: ImsContext) {
        self.context = Some(context);
    }

    /// Drops credentials.
    pub fn reset(&mut self) {
        self.context = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn context_name(&self) -> &str {
        &self.name
    }

    fn current_context(&self) -> Result<ImsContext, Error> {
        self.context.clone().ok_or_else(|| Error::AuthContext {
            context: self.name.clone(),
        })
    }
}

/// Everything an API client is bound to.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiBinding {
    /// See [`ImsContext::org_id`].
    pub org_id: String,
    /// See [`ImsContext::client_id`].
    pub client_id: String,
    /// See [`ImsContext::access_token`].
    pub access_token: String,
    /// Cloud Manager endpoint, e.g. [`DEFAULT_BASE_URL`].
    pub base_url: String,
}

impl ApiBinding {
    /// Combines a resolved context with an endpoint.
    pub fn new(context: ImsContext, base_url: impl Into<String>) -> Self {
        Self {
            org_id: context.org_id,
            client_id: context.client_id,
            access_token: context.access_token,
            base_url: base_url.into(),
        }
    }
}

impl fmt::Debug for ApiBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiBinding")
            .field("org_id", &self.org_id)
            .field("client_id", &self.client_id)
            .field("access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
