//! SpiceDB adapter (`authzed.api.v1.PermissionsService/CheckPermission`)

use super::{BackendError, BearerToken, CheckResult, PermissionBackend};
use crate::consistency::CheckedAt;
use crate::proto::authzed::check_permission_response::Permissionship as WirePermissionship;
use crate::proto::authzed::permissions_service_client::PermissionsServiceClient;
use crate::proto::authzed::{
    CheckPermissionRequest, CheckPermissionResponse, ObjectReference, SubjectReference,
};
use crate::query::{PermissionQuery, Permissionship};
use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::Request;
use tracing::debug;

/// Permission checks against SpiceDB
///
/// Holds one client over a shared channel for the life of the process. Each
/// check clones the client, which shares the underlying connection.
#[derive(Clone, Debug)]
pub struct SpiceDbBackend {
    client: PermissionsServiceClient<Channel>,
    token: Option<BearerToken>,
}

impl SpiceDbBackend {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: PermissionsServiceClient::new(channel),
            token: None,
        }
    }

    /// Authenticate to SpiceDB with its pre-shared key
    pub fn with_preshared_key(mut self, token: BearerToken) -> Self {
        self.token = Some(token);
        self
    }

    fn to_request(query: &PermissionQuery) -> CheckPermissionRequest {
        CheckPermissionRequest {
            resource: Some(ObjectReference {
                object_type: query.resource.object_type.clone(),
                object_id: query.resource.object_id.clone(),
            }),
            permission: query.permission.clone(),
            subject: Some(SubjectReference {
                object: Some(ObjectReference {
                    object_type: query.subject.object_type.clone(),
                    object_id: query.subject.object_id.clone(),
                }),
                optional_relation: String::new(),
            }),
        }
    }

    fn from_response(response: &CheckPermissionResponse) -> Permissionship {
        match WirePermissionship::try_from(response.permissionship) {
            Ok(WirePermissionship::HasPermission) => Permissionship::HasPermission,
            Ok(WirePermissionship::NoPermission) => Permissionship::NoPermission,
            Ok(WirePermissionship::ConditionalPermission) => Permissionship::Conditional,
            Ok(WirePermissionship::Unspecified) | Err(_) => Permissionship::Unspecified,
        }
    }

    fn checked_at(response: &CheckPermissionResponse) -> Option<CheckedAt> {
        response
            .checked_at
            .as_ref()
            .filter(|zed_token| !zed_token.token.is_empty())
            .map(|zed_token| CheckedAt::new(zed_token.token.clone()))
    }
}

#[async_trait]
impl PermissionBackend for SpiceDbBackend {
    fn name(&self) -> &'static str {
        "spicedb"
    }

    async fn check(&self, query: &PermissionQuery) -> Result<Permissionship, BackendError> {
        self.check_with_revision(query)
            .await
            .map(|result| result.permissionship)
    }

    async fn check_with_revision(
        &self,
        query: &PermissionQuery,
    ) -> Result<CheckResult, BackendError> {
        let mut request = Request::new(Self::to_request(query));
        if let Some(token) = &self.token {
            token.apply(&mut request);
        }

        let mut client = self.client.clone();
        let response = client.check_permission(request).await?.into_inner();

        debug!(
            checked_at = ?response.checked_at.as_ref().map(|t| t.token.as_str()),
            permissionship = response.permissionship,
            "SpiceDB check completed"
        );

        Ok(CheckResult {
            permissionship: Self::from_response(&response),
            checked_at: Self::checked_at(&response),
        })
    }
}
