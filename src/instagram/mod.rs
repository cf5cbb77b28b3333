//! # Instagram Integration Module
//!
//! This module provides the crate's interface to Instagram: session
//! authentication, account lookups, and friendship mutations. It abstracts
//! the two API surfaces the platform exposes (the mobile private API and the
//! public web API) behind one client and one trait.
//!
//! ## Architecture
//!
//! ```text
//! Engine Layer (resolution, follow execution)
//!          ↓
//! InstagramApi trait (seam; implemented by the real client and test fakes)
//!          ↓
//! InstagramClient
//!     ├── auth         login, session adoption, liveness probe
//!     ├── users        identifier lookups (profile info, web profile, search)
//!     └── friendships  follow mutation, following list
//!          ↓
//! HTTP Layer (reqwest, device identity headers)
//! ```
//!
//! ## API Surfaces
//!
//! - **Mobile host** (`i.instagram.com/api/v1`) - all session operations,
//!   lookups, and mutations; requests carry the device user agent, device
//!   ids, the session cookie, and the `IGT:2` bearer authorization.
//! - **Web host** (`www.instagram.com/api/v1`) - the web-profile lookup
//!   fallback; requests carry a browser user agent and the public app id.
//!
//! ## Error Handling
//!
//! Every non-success response is classified in
//! [`client`] into the crate's [`ApiError`] taxonomy. Components above this
//! module never inspect provider payloads; they match on the enum.
//!
//! ## Device Identity
//!
//! [`DeviceProfile`] is built once at startup and injected into the client.
//! Requests made through the same client always present the same device, and
//! the android id stays stable for a given account seed across runs.

pub mod client;
pub mod device;

mod auth;
mod friendships;
mod users;

use std::collections::HashSet;

use async_trait::async_trait;

pub use client::InstagramClient;
pub use device::DeviceProfile;

use crate::{
    errors::{ApiError, AuthError},
    types::{AccountSession, SessionToken},
};

/// Operations the engine needs from the platform.
///
/// Implemented by [`InstagramClient`] for production and by scripted fakes in
/// tests. Every method is a single logical API call; policy (retries,
/// waits, re-authentication) lives in the engine layer.
#[async_trait]
pub trait InstagramApi: Send + Sync {
    /// Adopts an existing session token, probing it for liveness.
    async fn login_by_token(&self, token: &SessionToken) -> Result<AccountSession, AuthError>;

    /// Username/password login; mints a fresh session.
    async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountSession, AuthError>;

    /// Liveness probe returning the session's own account id.
    async fn current_account(&self, session: &AccountSession) -> Result<String, ApiError>;

    /// Primary lookup: handle to account id via the mobile profile endpoint.
    async fn user_id_by_username(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError>;

    /// Fallback lookup via the public web profile surface.
    async fn web_profile_user_id(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError>;

    /// Last-resort lookup via user search (exact match only).
    async fn search_user_id(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError>;

    /// Follow mutation; `true` when the friendship is established or pending.
    async fn follow_user(&self, session: &AccountSession, user_id: &str)
    -> Result<bool, ApiError>;

    /// Lowercased handles the account currently follows, capped at `amount`.
    async fn following_usernames(
        &self,
        session: &AccountSession,
        amount: usize,
    ) -> Result<HashSet<String>, ApiError>;
}

#[async_trait]
impl InstagramApi for InstagramClient {
    async fn login_by_token(&self, token: &SessionToken) -> Result<AccountSession, AuthError> {
        InstagramClient::login_by_token(self, token).await
    }

    async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountSession, AuthError> {
        InstagramClient::login_with_password(self, username, password).await
    }

    async fn current_account(&self, session: &AccountSession) -> Result<String, ApiError> {
        InstagramClient::current_account(self, session).await
    }

    async fn user_id_by_username(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        InstagramClient::user_id_by_username(self, session, handle).await
    }

    async fn web_profile_user_id(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        InstagramClient::web_profile_user_id(self, session, handle).await
    }

    async fn search_user_id(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        InstagramClient::search_user_id(self, session, handle).await
    }

    async fn follow_user(
        &self,
        session: &AccountSession,
        user_id: &str,
    ) -> Result<bool, ApiError> {
        InstagramClient::follow_user(self, session, user_id).await
    }

    async fn following_usernames(
        &self,
        session: &AccountSession,
        amount: usize,
    ) -> Result<HashSet<String>, ApiError> {
        InstagramClient::following_usernames(self, session, amount).await
    }
}
