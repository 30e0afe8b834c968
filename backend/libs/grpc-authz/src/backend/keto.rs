//! Ory Keto adapter (`ory.keto.acl.v1alpha1.CheckService/Check`)
//!
//! Keto has no separate permission concept, so the query maps as
//! resource type -> namespace, resource id -> object, permission -> relation,
//! and the subject id is passed as a plain subject id.

use super::{BackendError, BearerToken, CheckResult, PermissionBackend};
use crate::consistency::CheckedAt;
use crate::proto::keto::check_service_client::CheckServiceClient;
use crate::proto::keto::{subject, CheckRequest, CheckResponse, Subject};
use crate::query::{PermissionQuery, Permissionship};
use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::Request;

#[derive(Clone, Debug)]
pub struct KetoBackend {
    client: CheckServiceClient<Channel>,
    token: Option<BearerToken>,
}

impl KetoBackend {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: CheckServiceClient::new(channel),
            token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: BearerToken) -> Self {
        self.token = Some(token);
        self
    }

    fn to_request(query: &PermissionQuery) -> CheckRequest {
        CheckRequest {
            namespace: query.resource.object_type.clone(),
            object: query.resource.object_id.clone(),
            relation: query.permission.clone(),
            subject: Some(Subject {
                r#ref: Some(subject::Ref::Id(query.subject.object_id.clone())),
            }),
            latest: false,
            snaptoken: String::new(),
        }
    }

    fn from_response(response: &CheckResponse) -> CheckResult {
        let permissionship = if response.allowed {
            Permissionship::HasPermission
        } else {
            Permissionship::NoPermission
        };

        CheckResult {
            permissionship,
            checked_at: (!response.snaptoken.is_empty())
                .then(|| CheckedAt::new(response.snaptoken.clone())),
        }
    }
}

#[async_trait]
impl PermissionBackend for KetoBackend {
    fn name(&self) -> &'static str {
        "keto"
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
        let response = client.check(request).await?.into_inner();

        Ok(Self::from_response(&response))
    }
}
