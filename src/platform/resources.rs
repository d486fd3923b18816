// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! The platform's resource model: custom-resource GVKs, the labels that tie
//! revisions to services and pods to their parents, and typed accessors
//! over the untyped custom-object payloads.

use k8s_openapi::api::core::v1::Pod;
use kube::api::{ApiResource, DynamicObject};
use kube::core::GroupVersionKind;
use serde_json::Value;

use crate::watch::ResourceIdentity;

pub const SERVING_GROUP: &str = "serving.svctl.dev";
pub const BUILD_GROUP: &str = "build.svctl.dev";
pub const VERSION: &str = "v1alpha1";

/// Revision → owning service.
pub const SERVICE_LABEL: &str = "serving.svctl.dev/service";
/// Pod → owning revision, by name (used for log tags).
pub const REVISION_LABEL: &str = "serving.svctl.dev/revision";
/// Pod → owning revision, by UID (used for watch scoping).
pub const REVISION_UID_LABEL: &str = "serving.svctl.dev/revision-uid";
/// Pod → owning build, by UID.
pub const BUILD_UID_LABEL: &str = "build.svctl.dev/build-uid";

/// The container running user code in a revision pod.
pub const USER_CONTAINER: &str = "user-container";
/// The container executing build steps in a build pod.
pub const BUILD_STEP_CONTAINER: &str = "build-step";
/// Init container that blocks until local source is uploaded into it.
pub const SOURCE_LOADER_CONTAINER: &str = "source-loader";

pub fn service_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(SERVING_GROUP, VERSION, "Service"))
}

pub fn revision_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(SERVING_GROUP, VERSION, "Revision"))
}

pub fn build_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(BUILD_GROUP, VERSION, "Build"))
}

/// Namespace/name of a build's execution pod, published on its status once
/// the cluster builder schedules it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

/// Walk `obj.data` down a path of object keys.
fn data_path<'a>(obj: &'a DynamicObject, path: &[&str]) -> Option<&'a Value> {
    let mut value = &obj.data;
    for key in path {
        value = value.get(key)?;
    }
    Some(value)
}

fn data_str<'a>(obj: &'a DynamicObject, path: &[&str]) -> Option<&'a str> {
    data_path(obj, path)?.as_str()
}

/// `status.builderName`, once a builder is assigned. Empty means
/// unassigned.
pub fn builder_name(build: &DynamicObject) -> Option<&str> {
    data_str(build, &["status", "builderName"]).filter(|name| !name.is_empty())
}

/// `status.podRef`, once the execution pod is known.
pub fn build_pod_ref(build: &DynamicObject) -> Option<PodRef> {
    let namespace = data_str(build, &["status", "podRef", "namespace"])?;
    let name = data_str(build, &["status", "podRef", "name"])?;
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    Some(PodRef {
        namespace: namespace.to_string(),
        name: name.to_string(),
    })
}

/// Status (`"True"`/`"False"`/`"Unknown"`) of the condition with the given
/// type, from the conventional `status.conditions` list.
pub fn condition_status<'a>(obj: &'a DynamicObject, condition: &str) -> Option<&'a str> {
    let conditions = data_path(obj, &["status", "conditions"])?.as_array()?;
    conditions
        .iter()
        .find(|entry| entry.get("type").and_then(Value::as_str) == Some(condition))
        .and_then(|entry| entry.get("status"))
        .and_then(Value::as_str)
}

/// `status.latestCreatedRevisionName` on a service.
pub fn latest_revision(service: &DynamicObject) -> Option<&str> {
    data_str(service, &["status", "latestCreatedRevisionName"])
}

/// Whether the named init container currently reports a `running` state.
pub fn init_container_running(pod: &Pod, container: &str) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.init_container_statuses.as_ref())
        .is_some_and(|statuses| {
            statuses.iter().any(|status| {
                status.name == container
                    && status
                        .state
                        .as_ref()
                        .is_some_and(|state| state.running.is_some())
            })
        })
}

impl ResourceIdentity for DynamicObject {
    fn uid(&self) -> Option<&str> {
        self.metadata.uid.as_deref()
    }

    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

impl ResourceIdentity for Pod {
    fn uid(&self) -> Option<&str> {
        self.metadata.uid.as_deref()
    }

    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use kube::api::ObjectMeta;
    use serde_json::json;

    use super::*;

    /// A build object with the given status payload.
    pub fn build_with_status(name: &str, status: Value) -> DynamicObject {
        DynamicObject {
            types: None,
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                uid: Some(format!("uid-{name}")),
                ..Default::default()
            },
            data: json!({ "status": status }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::build_with_status;
    use super::*;

    #[test]
    fn builder_name_requires_a_non_empty_value() {
        let unassigned = build_with_status("b", json!({}));
        assert_eq!(builder_name(&unassigned), None);

        let empty = build_with_status("b", json!({ "builderName": "" }));
        assert_eq!(builder_name(&empty), None);

        let assigned = build_with_status("b", json!({ "builderName": "cluster-builder-2" }));
        assert_eq!(builder_name(&assigned), Some("cluster-builder-2"));
    }

    #[test]
    fn pod_ref_requires_both_fields() {
        let partial = build_with_status("b", json!({ "podRef": { "name": "build-pod" } }));
        assert_eq!(build_pod_ref(&partial), None);

        let complete = build_with_status(
            "b",
            json!({ "podRef": { "namespace": "builds", "name": "build-pod" } }),
        );
        assert_eq!(
            build_pod_ref(&complete),
            Some(PodRef {
                namespace: "builds".to_string(),
                name: "build-pod".to_string(),
            })
        );
    }

    #[test]
    fn condition_lookup_matches_by_type() {
        let build = build_with_status(
            "b",
            json!({
                "conditions": [
                    { "type": "Started", "status": "True" },
                    { "type": "Succeeded", "status": "Unknown" },
                ]
            }),
        );
        assert_eq!(condition_status(&build, "Succeeded"), Some("Unknown"));
        assert_eq!(condition_status(&build, "Missing"), None);
    }

    #[test]
    fn init_container_state_is_name_scoped() {
        use k8s_openapi::api::core::v1::{
            ContainerState, ContainerStateRunning, ContainerStatus, PodStatus,
        };

        let pod = Pod {
            status: Some(PodStatus {
                init_container_statuses: Some(vec![ContainerStatus {
                    name: SOURCE_LOADER_CONTAINER.to_string(),
                    state: Some(ContainerState {
                        running: Some(ContainerStateRunning::default()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(init_container_running(&pod, SOURCE_LOADER_CONTAINER));
        assert!(!init_container_running(&pod, "other-container"));
    }
}
