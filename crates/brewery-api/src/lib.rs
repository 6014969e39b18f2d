// brewery-api/src/lib.rs
// ============================================================================
// Module: Brewery API Library
// Description: HTTP access endpoint for brewery records.
// Purpose: Expose the record store over REST with role-gated writes.
// Dependencies: axum, brewery-core, brewery-config, brewery-store-sqlite
// ============================================================================

//! ## Overview
//! `brewery-api` serves the `/breweries` resource over HTTP. Reads are
//! public; create and delete require the `admin` role and update requires
//! the `brewer` role. Every capability decision and every request emits a
//! JSON audit event through an [`ApiAuditSink`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ApiAuditEvent;
pub use audit::ApiAuditEventParams;
pub use audit::ApiAuditSink;
pub use audit::ApiOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::audit_sink_from_config;
pub use auth::AuthAction;
pub use auth::AuthAuditEvent;
pub use auth::AuthContext;
pub use auth::AuthError;
pub use auth::AuthMethod;
pub use auth::BreweryAuthz;
pub use auth::DefaultBreweryAuthz;
pub use auth::RequestContext;
pub use server::ApiError;
pub use server::BreweryServer;
pub use server::ServerError;
