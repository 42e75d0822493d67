//! `/servicePrincipals` endpoints

use crate::client::{DirectoryObjectId, GraphClient};
use async_trait::async_trait;
use entra_control::ServicePrincipalApi;
use entra_types::{DirectoryResult, ServicePrincipalCreate};
use reqwest::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServicePrincipalUpsertBody<'a> {
    display_name: &'a str,
    account_enabled: bool,
    tags: &'a [String],
}

impl<'a> From<&'a ServicePrincipalCreate> for ServicePrincipalUpsertBody<'a> {
    fn from(request: &'a ServicePrincipalCreate) -> Self {
        Self {
            display_name: &request.display_name,
            account_enabled: request.account_enabled,
            tags: &request.tags,
        }
    }
}

fn by_app_id(app_id: &str) -> String {
    format!("servicePrincipals(appId='{}')", app_id)
}

#[async_trait]
impl ServicePrincipalApi for GraphClient {
    /// Upserts by app ID. Graph answers 201 with the new object when it
    /// created one and 204 when the principal already existed, in which case
    /// its ID is read back.
    async fn create(&self, request: &ServicePrincipalCreate) -> DirectoryResult<String> {
        let url = self.url(&by_app_id(&request.app_id));
        let body = ServicePrincipalUpsertBody::from(request);
        let response = self
            .patch_with_headers(&url, &body, &[("Prefer", "create-if-missing")])
            .await?;

        let id = if response.status() == StatusCode::NO_CONTENT {
            let url = self.url(&format!("{}?$select=id", by_app_id(&request.app_id)));
            let existing: DirectoryObjectId = self.get_json(&url).await?;
            existing.id
        } else {
            let created: DirectoryObjectId = Self::decode(response).await?;
            created.id
        };

        tracing::debug!(app_id = %request.app_id, service_principal_id = %id, "Graph service principal ensured");
        Ok(id)
    }

    async fn delete(&self, id: &str) -> DirectoryResult<()> {
        self.delete_url(&self.url(&format!("servicePrincipals/{}", id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_body_shape() {
        let request = ServicePrincipalCreate {
            app_id: "app-1".into(),
            display_name: "svc-a".into(),
            account_enabled: true,
            tags: vec!["HideApp".into()],
        };
        let body = serde_json::to_value(ServicePrincipalUpsertBody::from(&request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "displayName": "svc-a",
                "accountEnabled": true,
                "tags": ["HideApp"]
            })
        );
        assert_eq!(by_app_id("app-1"), "servicePrincipals(appId='app-1')");
    }
}
