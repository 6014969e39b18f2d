// brewery-api/src/auth.rs
// ============================================================================
// Module: Brewery API Authn/Authz
// Description: Authentication and capability checks for brewery operations.
// Purpose: Fail-closed role enforcement for create, update, and delete.
// Dependencies: brewery-config, serde, sha2, subtle
// ============================================================================

//! ## Overview
//! Each endpoint operation declares an [`AuthAction`]. Reads are public;
//! writes require a role. [`DefaultBreweryAuthz`] resolves the caller from
//! the configured mode (loopback-only or bearer tokens) and then checks the
//! role. Missing or bad credentials are [`AuthError::Unauthenticated`]; a
//! known caller without the role is [`AuthError::Unauthorized`].
//!
//! Bearer tokens are compared in constant time and only their sha256
//! fingerprint leaves this module.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use brewery_config::Role;
use brewery_config::ServerAuthConfig;
use brewery_config::ServerAuthMode;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

/// Subject reported for loopback callers in local-only mode.
const LOOPBACK_SUBJECT: &str = "loopback";

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context used for auth decisions.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Authorization header value.
    pub auth_header: Option<String>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(peer_ip: Option<IpAddr>, auth_header: Option<String>) -> Self {
        Self {
            peer_ip,
            auth_header,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns true when the peer IP is loopback.
    #[must_use]
    pub fn peer_is_loopback(&self) -> bool {
        self.peer_ip.is_some_and(|ip| ip.is_loopback())
    }
}

// ============================================================================
// SECTION: Auth Context
// ============================================================================

/// Resolved caller context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authentication method.
    pub method: AuthMethod,
    /// Optional subject identifier.
    pub subject: Option<String>,
    /// Roles held by the caller.
    pub roles: BTreeSet<Role>,
    /// Token fingerprint for bearer auth (sha256, hex).
    pub token_fingerprint: Option<String>,
}

impl AuthContext {
    /// Context for a caller that presented no credentials on a public action.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            method: AuthMethod::Anonymous,
            subject: None,
            roles: BTreeSet::new(),
            token_fingerprint: None,
        }
    }

    /// Returns true when the caller holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Returns the audit label for the authentication method.
    const fn method_label(&self) -> &'static str {
        match self.method {
            AuthMethod::Anonymous => "anonymous",
            AuthMethod::Local => "local",
            AuthMethod::BearerToken => "bearer_token",
        }
    }
}

/// Authentication method used for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No credentials evaluated (public action).
    Anonymous,
    /// Local-only loopback access.
    Local,
    /// Bearer token authentication.
    BearerToken,
}

/// Capability-checked brewery operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    /// List every brewery.
    ListBreweries,
    /// Fetch one brewery.
    GetBrewery,
    /// Create a brewery.
    CreateBrewery,
    /// Update a brewery.
    UpdateBrewery,
    /// Delete a brewery.
    DeleteBrewery,
}

impl AuthAction {
    /// Role required for the action, or `None` for public actions.
    #[must_use]
    pub const fn required_role(self) -> Option<Role> {
        match self {
            Self::ListBreweries | Self::GetBrewery => None,
            Self::CreateBrewery | Self::DeleteBrewery => Some(Role::Admin),
            Self::UpdateBrewery => Some(Role::Brewer),
        }
    }

    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ListBreweries => "breweries/list",
            Self::GetBrewery => "breweries/get",
            Self::CreateBrewery => "breweries/create",
            Self::UpdateBrewery => "breweries/update",
            Self::DeleteBrewery => "breweries/delete",
        }
    }
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication or authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid authentication.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Caller is authenticated but not authorized.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Capability check for brewery operations.
pub trait BreweryAuthz: Send + Sync {
    /// Authorize an action. Returns the resolved caller on success.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the caller cannot be authenticated or
    /// lacks the role the action requires.
    fn authorize(&self, ctx: &RequestContext, action: AuthAction)
    -> Result<AuthContext, AuthError>;
}

// ============================================================================
// SECTION: Default Policy
// ============================================================================

/// Principal resolved from configuration.
struct Principal {
    /// Subject identifier.
    subject: String,
    /// Bearer token.
    token: String,
    /// Granted roles.
    roles: BTreeSet<Role>,
}

/// Default authz implementation derived from server config.
pub struct DefaultBreweryAuthz {
    /// Auth mode.
    mode: ServerAuthMode,
    /// Principals accepted in bearer mode.
    principals: Vec<Principal>,
}

impl DefaultBreweryAuthz {
    /// Builds a default authz policy from server auth configuration.
    #[must_use]
    pub fn from_config(config: Option<&ServerAuthConfig>) -> Self {
        let mode = config.map_or(ServerAuthMode::LocalOnly, |cfg| cfg.mode);
        let principals = config
            .map(|cfg| {
                cfg.principals
                    .iter()
                    .map(|principal| Principal {
                        subject: principal.subject.clone(),
                        token: principal.token.clone(),
                        roles: principal.roles.iter().copied().collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            mode,
            principals,
        }
    }

    /// Returns the configured auth mode.
    #[must_use]
    pub const fn mode(&self) -> ServerAuthMode {
        self.mode
    }

    /// Resolves the caller for the configured mode.
    fn authenticate(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError> {
        match self.mode {
            ServerAuthMode::LocalOnly => authenticate_local_only(ctx),
            ServerAuthMode::BearerToken => self.authenticate_bearer(ctx),
        }
    }

    /// Matches the bearer token against every principal.
    fn authenticate_bearer(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError> {
        let token = parse_bearer_token(ctx.auth_header.as_deref())?;
        let mut matched: Option<&Principal> = None;
        for principal in &self.principals {
            let equal: bool = principal.token.as_bytes().ct_eq(token.as_bytes()).into();
            if equal && matched.is_none() {
                matched = Some(principal);
            }
        }
        let principal = matched
            .ok_or_else(|| AuthError::Unauthenticated("invalid bearer token".to_string()))?;
        Ok(AuthContext {
            method: AuthMethod::BearerToken,
            subject: Some(principal.subject.clone()),
            roles: principal.roles.clone(),
            token_fingerprint: Some(token_fingerprint(&token)),
        })
    }
}

impl BreweryAuthz for DefaultBreweryAuthz {
    fn authorize(
        &self,
        ctx: &RequestContext,
        action: AuthAction,
    ) -> Result<AuthContext, AuthError> {
        let Some(role) = action.required_role() else {
            return Ok(AuthContext::anonymous());
        };
        let auth = self.authenticate(ctx)?;
        if !auth.has_role(role) {
            return Err(AuthError::Unauthorized(format!("{action} requires role {role}")));
        }
        Ok(auth)
    }
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Auth audit event payload.
#[derive(Debug, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Action label.
    action: &'static str,
    /// Caller IP address (if available).
    peer_ip: Option<String>,
    /// Auth method label.
    auth_method: Option<&'static str>,
    /// Caller subject.
    subject: Option<String>,
    /// Bearer token fingerprint (sha256).
    token_fingerprint: Option<String>,
    /// Failure reason (for deny events).
    reason: Option<String>,
    /// Request identifier (if provided).
    request_id: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(ctx: &RequestContext, action: AuthAction, auth: &AuthContext) -> Self {
        Self {
            event: "brewery_authz",
            decision: "allow",
            action: action.label(),
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            auth_method: Some(auth.method_label()),
            subject: auth.subject.clone(),
            token_fingerprint: auth.token_fingerprint.clone(),
            reason: None,
            request_id: ctx.request_id.clone(),
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(ctx: &RequestContext, action: AuthAction, error: &AuthError) -> Self {
        Self {
            event: "brewery_authz",
            decision: "deny",
            action: action.label(),
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            auth_method: None,
            subject: None,
            token_fingerprint: None,
            reason: Some(error.to_string()),
            request_id: ctx.request_id.clone(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Grants every role to loopback callers.
fn authenticate_local_only(ctx: &RequestContext) -> Result<AuthContext, AuthError> {
    if !ctx.peer_is_loopback() {
        return Err(AuthError::Unauthenticated(
            "local-only mode requires loopback access".to_string(),
        ));
    }
    Ok(AuthContext {
        method: AuthMethod::Local,
        subject: Some(LOOPBACK_SUBJECT.to_string()),
        roles: Role::ALL.into_iter().collect(),
        token_fingerprint: None,
    })
}

/// Extracts the token from a `Bearer` authorization header.
fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Returns the lowercase hex sha256 of a token.
fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex_encode(&digest)
}

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
