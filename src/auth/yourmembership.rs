//! YourMembership social-auth backend.
//!
//! YourMembership does not speak OAuth. Login goes through its session API:
//! 1. `Session.Create` opens an API session; the id is kept in the browser session
//! 2. `Auth.CreateToken` returns the provider URL the user is redirected to
//! 3. On callback, `Member.Profile.Get` on the same session returns the member profile
//!
//! Every call is an XML envelope POSTed to a single endpoint (see [`super::envelope`]).

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::envelope::{parse_response, ApiResponse, RequestEnvelope};
use super::strategy::{Authenticator, SessionStore, SocialBackend, UserDetails};
use super::transport::{HttpTransport, ReqwestTransport};
use crate::error::{AuthError, Result};
use crate::YourMembershipConfig;

pub const BACKEND_NAME: &str = "yourmembership";

/// Production API endpoint.
pub const YMAPI_ENDPOINT: &str = "https://api.yourmembership.com/";

/// Browser-session key holding the provider session id between redirects.
pub const SESSION_KEY: &str = "ymsessionID";

/// The provider expects this content type even though the body is XML.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const SESSION_CREATE: &str = "Session.Create";
pub const AUTH_CREATE_TOKEN: &str = "Auth.CreateToken";
pub const MEMBER_PROFILE_GET: &str = "Member.Profile.Get";

const ID_KEY: &str = "WebsiteID";

const EXTRA_DATA: &[(&str, &str)] = &[("user_id", "user_id"), ("session_id", "SessionID")];

/// Backend for the YourMembership session API.
pub struct YourMembershipBackend {
    api_key: String,
    private_key: String,
    redirect_uri: String,
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
}

impl YourMembershipBackend {
    /// Create a backend that talks to the provider over `reqwest`.
    pub fn new(config: &YourMembershipConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: &YourMembershipConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            api_key: config.api_key.clone(),
            private_key: config.private_key.clone(),
            redirect_uri: config.redirect_uri.clone(),
            endpoint: config.endpoint.clone(),
            transport,
        }
    }

    /// Configured `(api_key, private_key)` pair.
    pub fn key_and_secret(&self) -> (&str, &str) {
        (&self.api_key, &self.private_key)
    }

    /// URI the provider sends the user back to.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Serialize the XML envelope for one call. A fresh `CallID` is generated
    /// every time.
    pub fn build_request(
        &self,
        method: &str,
        session_id: Option<&str>,
        args: &[(&str, &str)],
    ) -> Result<String> {
        let (api_key, _) = self.key_and_secret();
        RequestEnvelope::new(api_key, method, session_id, args).to_xml()
    }

    /// Execute one API call and decode its envelope.
    #[instrument(skip(self, session_id, args), fields(has_session = session_id.is_some()))]
    pub async fn call_api(
        &self,
        method: &str,
        session_id: Option<&str>,
        args: &[(&str, &str)],
    ) -> Result<ApiResponse> {
        let body = self
            .build_request(method, session_id, args)
            .map_err(|e| e.with_backend(BACKEND_NAME))?;

        debug!(endpoint = %self.endpoint, "calling YourMembership API");

        let text = self
            .transport
            .post(&self.endpoint, FORM_CONTENT_TYPE, body)
            .await
            .map_err(|e| AuthError::from(e).with_backend(BACKEND_NAME))?;

        let response = parse_response(&text, method).map_err(|e| e.with_backend(BACKEND_NAME))?;
        debug!(fields = response.len(), "YourMembership call succeeded");
        Ok(response)
    }

    /// Open a new API session and return its id.
    pub async fn create_session(&self) -> Result<String> {
        let response = self.call_api(SESSION_CREATE, None, &[]).await?;
        let session_id = response
            .require("SessionID")
            .map_err(|e| e.with_backend(BACKEND_NAME))?;
        Ok(session_id.to_string())
    }

    /// Start a login: open a session, remember it in the browser session, and
    /// return the provider URL to redirect the user to.
    pub async fn auth_url(&self, session: &dyn SessionStore) -> Result<String> {
        let session_id = self.create_session().await?;
        session.set(SESSION_KEY, session_id.clone());
        info!("YourMembership session created for login");

        let args = [("RetUrl", self.redirect_uri())];
        let response = self
            .call_api(AUTH_CREATE_TOKEN, Some(&session_id), &args)
            .await?;
        let url = response
            .require("GoToUrl")
            .map_err(|e| e.with_backend(BACKEND_NAME))?;
        Ok(url.to_string())
    }

    /// Finish a login started by [`auth_url`](Self::auth_url).
    ///
    /// Fetches the member profile for the stored session and hands it to the
    /// host authenticator. The stored session is removed once the profile has
    /// been fetched. Transport failures surface as [`AuthErrorKind::Http`].
    ///
    /// [`AuthErrorKind::Http`]: crate::error::AuthErrorKind::Http
    pub async fn auth_complete<A: Authenticator>(
        &self,
        session: &dyn SessionStore,
        authenticator: &A,
    ) -> Result<A::User> {
        self.complete(session, authenticator)
            .await
            .map_err(AuthError::into_http)
    }

    async fn complete<A: Authenticator>(
        &self,
        session: &dyn SessionStore,
        authenticator: &A,
    ) -> Result<A::User> {
        let session_id = session
            .get(SESSION_KEY)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::state_missing("Missing Session ID.").with_backend(BACKEND_NAME))?;

        let response = self
            .call_api(MEMBER_PROFILE_GET, Some(&session_id), &[])
            .await?;
        session.remove(SESSION_KEY);

        let user = authenticator.authenticate(self, response).await?;
        info!("YourMembership login completed");
        Ok(user)
    }
}

impl SocialBackend for YourMembershipBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn requires_email_validation(&self) -> bool {
        false
    }

    fn id_key(&self) -> &'static str {
        ID_KEY
    }

    fn extra_data_fields(&self) -> &'static [(&'static str, &'static str)] {
        EXTRA_DATA
    }

    fn user_details(&self, response: &ApiResponse) -> Result<UserDetails> {
        let field = |name: &str| {
            response
                .require(name)
                .map(str::to_string)
                .map_err(|e| e.with_backend(BACKEND_NAME))
        };

        let first_name = field("FirstName")?;
        let last_name = field("LastName")?;
        Ok(UserDetails {
            username: field("Username")?,
            email: field("EmailAddr")?,
            fullname: format!("{}{}", last_name, first_name),
            first_name,
            last_name,
        })
    }

    fn user_id(&self, _details: &UserDetails, response: &ApiResponse) -> Result<String> {
        response
            .require(ID_KEY)
            .map(str::to_string)
            .map_err(|e| e.with_backend(BACKEND_NAME))
    }
}

// ============================================================================
// Tests
// ============================================================================
