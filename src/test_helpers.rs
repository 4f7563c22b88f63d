//! Test helper factories and a recording host authenticator
//!
//! Provides provider response bodies in the YourMembership wire format and a
//! minimal host-side `Authenticator` that resolves the user the way a login
//! host would.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::auth::envelope::ApiResponse;
use crate::auth::strategy::{Authenticator, SocialBackend, UserDetails};
use crate::error::Result;
use crate::{YourMembershipConfig, YMAPI_ENDPOINT};

// ============================================================================
// Config
// ============================================================================

/// Backend config pointing at the production endpoint (mocked in unit tests).
pub fn test_config() -> YourMembershipConfig {
    YourMembershipConfig {
        api_key: "test-api-key".to_string(),
        private_key: "test-private-key".to_string(),
        redirect_uri: "https://app.example.com/complete/yourmembership/".to_string(),
        endpoint: YMAPI_ENDPOINT.to_string(),
    }
}

// ============================================================================
// Provider response bodies
// ============================================================================

fn success_body(method: &str, children: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <YourMembership_Response>\n\
         <ErrCode>0</ErrCode>\n\
         <ExtendedErrorInfo></ExtendedErrorInfo>\n\
         <{method}>\n{children}\n</{method}>\n\
         </YourMembership_Response>\n"
    )
}

pub fn session_create_body(session_id: &str) -> String {
    success_body(
        "Session.Create",
        &format!("<SessionID>{}</SessionID>", session_id),
    )
}

pub fn create_token_body(goto_url: &str) -> String {
    success_body(
        "Auth.CreateToken",
        &format!(
            "<AuthToken>8F0E9B1A</AuthToken>\n<GoToUrl><![CDATA[{}]]></GoToUrl>",
            goto_url
        ),
    )
}

pub fn profile_body() -> String {
    success_body(
        "Member.Profile.Get",
        "<ID>9F1B2C3D</ID>\n\
         <WebsiteID>42</WebsiteID>\n\
         <Username>bob</Username>\n\
         <EmailAddr>b@x.com</EmailAddr>\n\
         <FirstName>Bob</FirstName>\n\
         <LastName>Lee</LastName>\n\
         <Title/>",
    )
}

pub fn error_body(code: i32, description: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <YourMembership_Response>\n\
         <ErrCode>{}</ErrCode>\n\
         <ExtendedErrorInfo>call failed</ExtendedErrorInfo>\n\
         <ErrDesc>{}</ErrDesc>\n\
         </YourMembership_Response>\n",
        code, description
    )
}

// ============================================================================
// Host authenticator
// ============================================================================

/// User resolved by [`RecordingAuthenticator`].
#[derive(Debug, Clone)]
pub struct TestUser {
    pub backend: String,
    pub uid: String,
    pub details: UserDetails,
    pub extra_data: BTreeMap<String, String>,
}

/// Authenticator that resolves a user from the backend's extraction hooks.
pub struct RecordingAuthenticator;

#[async_trait]
impl Authenticator for RecordingAuthenticator {
    type User = TestUser;

    async fn authenticate(
        &self,
        backend: &dyn SocialBackend,
        response: ApiResponse,
    ) -> Result<TestUser> {
        let details = backend.user_details(&response)?;
        let uid = backend.user_id(&details, &response)?;
        let extra_data = backend.extra_data(&response, Some(&details));
        Ok(TestUser {
            backend: backend.name().to_string(),
            uid,
            details,
            extra_data,
        })
    }
}
