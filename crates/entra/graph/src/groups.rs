//! `/groups` endpoints

use crate::client::{DirectoryObjectId, GraphClient, ReferenceCreate};
use async_trait::async_trait;
use entra_control::GroupApi;
use entra_types::{
    CreatedGroup, DirectoryResult, Group, GroupCreate, GroupFields, GroupPatch, GroupRelation,
};
use serde::{Deserialize, Serialize};

const GROUP_SELECT: &str =
    "id,displayName,description,mailNickname,mailEnabled,securityEnabled,groupTypes";

/// Graph caps `members@odata.bind` at 20 references per request
const MEMBER_BIND_CHUNK: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupResource {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    mail_nickname: Option<String>,
    #[serde(default)]
    mail_enabled: Option<bool>,
    #[serde(default)]
    security_enabled: Option<bool>,
    #[serde(default)]
    group_types: Option<Vec<String>>,
}

impl From<GroupResource> for Group {
    fn from(r: GroupResource) -> Self {
        Group {
            id: r.id,
            fields: GroupFields {
                display_name: r.display_name.unwrap_or_default(),
                description: r.description,
                mail_nickname: r.mail_nickname.unwrap_or_default(),
                security_enabled: r.security_enabled.unwrap_or(false),
            }
            .normalized(),
            group_types: r.group_types.unwrap_or_default(),
            mail_enabled: r.mail_enabled.unwrap_or(false),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupCreateBody<'a> {
    display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    mail_enabled: bool,
    mail_nickname: &'a str,
    security_enabled: bool,
    group_types: &'a [String],
}

impl<'a> From<&'a GroupCreate> for GroupCreateBody<'a> {
    fn from(request: &'a GroupCreate) -> Self {
        Self {
            display_name: &request.fields.display_name,
            description: request.fields.description.as_deref(),
            mail_enabled: request.mail_enabled,
            mail_nickname: &request.fields.mail_nickname,
            security_enabled: request.fields.security_enabled,
            group_types: &request.group_types,
        }
    }
}

#[derive(Debug, Serialize)]
struct MemberBind {
    #[serde(rename = "members@odata.bind")]
    members: Vec<String>,
}

#[async_trait]
impl GroupApi for GraphClient {
    async fn get(&self, id: &str) -> DirectoryResult<Group> {
        let url = self.url(&format!("groups/{}?$select={}", id, GROUP_SELECT));
        let resource: GroupResource = self.get_json(&url).await?;
        Ok(resource.into())
    }

    async fn create(&self, request: &GroupCreate) -> DirectoryResult<CreatedGroup> {
        let body = GroupCreateBody::from(request);
        let created: GroupResource = self.post_json(&self.url("groups"), &body).await?;
        tracing::debug!(group_id = %created.id, "Graph group created");
        Ok(CreatedGroup {
            display_name: created
                .display_name
                .unwrap_or_else(|| request.fields.display_name.clone()),
            id: created.id,
        })
    }

    async fn patch(&self, id: &str, patch: &GroupPatch) -> DirectoryResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.patch_json(&self.url(&format!("groups/{}", id)), patch)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DirectoryResult<()> {
        self.delete_url(&self.url(&format!("groups/{}", id))).await?;
        Ok(())
    }

    async fn list_relations(
        &self,
        id: &str,
        relation: GroupRelation,
    ) -> DirectoryResult<Vec<String>> {
        let url = self.url(&format!("groups/{}/{}?$select=id", id, relation));
        let objects: Vec<DirectoryObjectId> = self.get_all(&url).await?;
        Ok(objects.into_iter().map(|o| o.id).collect())
    }

    /// Members are bound in chunks through a group PATCH; owners only accept
    /// one `$ref` per request.
    async fn add_relations(
        &self,
        id: &str,
        relation: GroupRelation,
        object_ids: &[String],
    ) -> DirectoryResult<()> {
        match relation {
            GroupRelation::Members => {
                let url = self.url(&format!("groups/{}", id));
                for chunk in object_ids.chunks(MEMBER_BIND_CHUNK) {
                    let body = MemberBind {
                        members: chunk
                            .iter()
                            .map(|object_id| self.directory_object_url(object_id))
                            .collect(),
                    };
                    self.patch_json(&url, &body).await?;
                }
            }
            GroupRelation::Owners => {
                let url = self.url(&format!("groups/{}/owners/$ref", id));
                for object_id in object_ids {
                    let body = ReferenceCreate {
                        odata_id: self.directory_object_url(object_id),
                    };
                    self.post_empty(&url, &body).await?;
                }
            }
        }
        Ok(())
    }

    async fn remove_relations(
        &self,
        id: &str,
        relation: GroupRelation,
        object_ids: &[String],
    ) -> DirectoryResult<()> {
        for object_id in object_ids {
            let url = self.url(&format!("groups/{}/{}/{}/$ref", id, relation, object_id));
            self.delete_url(&url).await?;
        }
        Ok(())
    }
}
