//! `/applications` endpoints

use crate::client::{DirectoryObjectId, GraphClient, ReferenceCreate};
use async_trait::async_trait;
use entra_control::ApplicationApi;
use entra_types::{
    Application, ApplicationCreate, ApplicationFields, ApplicationPatch, CreatedApplication,
    DirectoryResult, InformationalUrls, RequiredResourceAccess,
};
use serde::{Deserialize, Serialize};

const APPLICATION_SELECT: &str = "id,appId,displayName,description,notes,tags,signInAudience,\
samlMetadataUrl,isFallbackPublicClient,isDeviceOnlyAuthSupported,groupMembershipClaims,\
identifierUris,serviceManagementReference";

/// Application as returned by Graph
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationResource {
    id: String,
    app_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    sign_in_audience: Option<String>,
    #[serde(default)]
    saml_metadata_url: Option<String>,
    #[serde(default)]
    is_fallback_public_client: Option<bool>,
    #[serde(default)]
    is_device_only_auth_supported: Option<bool>,
    #[serde(default)]
    group_membership_claims: Option<String>,
    #[serde(default)]
    identifier_uris: Option<Vec<String>>,
    #[serde(default)]
    service_management_reference: Option<String>,
}

impl From<ApplicationResource> for Application {
    fn from(r: ApplicationResource) -> Self {
        Application {
            object_id: r.id,
            app_id: r.app_id,
            fields: ApplicationFields {
                display_name: r.display_name.unwrap_or_default(),
                description: r.description,
                notes: r.notes,
                tags: r.tags.unwrap_or_default(),
                sign_in_audience: r.sign_in_audience,
                saml_metadata_url: r.saml_metadata_url,
                is_fallback_public_client: r.is_fallback_public_client.unwrap_or(false),
                is_device_only_auth_supported: r.is_device_only_auth_supported.unwrap_or(false),
                group_membership_claims: r.group_membership_claims,
                identifier_uris: r.identifier_uris.unwrap_or_default(),
                service_management_reference: r.service_management_reference,
            }
            .normalized(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationCreateBody<'a> {
    display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    tags: &'a Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sign_in_audience: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saml_metadata_url: Option<&'a str>,
    is_fallback_public_client: bool,
    is_device_only_auth_supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_membership_claims: Option<&'a str>,
    identifier_uris: &'a Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_management_reference: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<&'a InformationalUrls>,
    #[serde(skip_serializing_if = "is_empty")]
    required_resource_access: &'a Vec<RequiredResourceAccess>,
}

fn is_empty<T>(values: &&Vec<T>) -> bool {
    values.is_empty()
}

impl<'a> From<&'a ApplicationCreate> for ApplicationCreateBody<'a> {
    fn from(request: &'a ApplicationCreate) -> Self {
        let f = &request.fields;
        Self {
            display_name: &f.display_name,
            description: f.description.as_deref(),
            notes: f.notes.as_deref(),
            tags: &f.tags,
            sign_in_audience: f.sign_in_audience.as_deref(),
            saml_metadata_url: f.saml_metadata_url.as_deref(),
            is_fallback_public_client: f.is_fallback_public_client,
            is_device_only_auth_supported: f.is_device_only_auth_supported,
            group_membership_claims: f.group_membership_claims.as_deref(),
            identifier_uris: &f.identifier_uris,
            service_management_reference: f.service_management_reference.as_deref(),
            info: request.info.as_ref(),
            required_resource_access: &request.required_resource_access,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedApplicationResource {
    id: String,
    app_id: String,
}

#[async_trait]
impl ApplicationApi for GraphClient {
    async fn get(&self, object_id: &str) -> DirectoryResult<Application> {
        let url = self.url(&format!("applications/{}?$select={}", object_id, APPLICATION_SELECT));
        let resource: ApplicationResource = self.get_json(&url).await?;
        Ok(resource.into())
    }

    async fn create(&self, request: &ApplicationCreate) -> DirectoryResult<CreatedApplication> {
        let body = ApplicationCreateBody::from(request);
        let created: CreatedApplicationResource =
            self.post_json(&self.url("applications"), &body).await?;
        tracing::debug!(app_id = %created.app_id, object_id = %created.id, "Graph application created");
        Ok(CreatedApplication {
            app_id: created.app_id,
            object_id: created.id,
        })
    }

    async fn patch(&self, object_id: &str, patch: &ApplicationPatch) -> DirectoryResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.patch_json(&self.url(&format!("applications/{}", object_id)), patch)
            .await?;
        Ok(())
    }

    async fn delete(&self, object_id: &str) -> DirectoryResult<()> {
        self.delete_url(&self.url(&format!("applications/{}", object_id)))
            .await?;
        Ok(())
    }

    async fn list_owners(&self, object_id: &str) -> DirectoryResult<Vec<String>> {
        let url = self.url(&format!("applications/{}/owners?$select=id", object_id));
        let owners: Vec<DirectoryObjectId> = self.get_all(&url).await?;
        Ok(owners.into_iter().map(|o| o.id).collect())
    }

    /// Graph accepts a single `$ref` per request for application owners, so
    /// the batch is sent one reference at a time and stops at the first error.
    async fn add_owners(&self, object_id: &str, owner_ids: &[String]) -> DirectoryResult<()> {
        let url = self.url(&format!("applications/{}/owners/$ref", object_id));
        for owner_id in owner_ids {
            let body = ReferenceCreate {
                odata_id: self.directory_object_url(owner_id),
            };
            self.post_empty(&url, &body).await?;
        }
        Ok(())
    }

    async fn remove_owners(&self, object_id: &str, owner_ids: &[String]) -> DirectoryResult<()> {
        for owner_id in owner_ids {
            let url = self.url(&format!("applications/{}/owners/{}/$ref", object_id, owner_id));
            self.delete_url(&url).await?;
        }
        Ok(())
    }
}
