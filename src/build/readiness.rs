// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Readiness watchers for the build flow.
//!
//! Each watcher is a [`poll_until`] loop over a fetch-by-name closure and a
//! pure predicate on the fetched resource. They block their caller until a
//! specific state transition is observed, then hand back the derived value
//! so a one-shot action (source upload, log tail, verdict) can proceed.

use std::future::Future;

use anyhow::Result;
use k8s_openapi::api::core::v1::Pod;
use kube::api::DynamicObject;
use tokio_util::sync::CancellationToken;

use crate::platform::resources::{self, PodRef};
use crate::watch::poll::{PollOutcome, poll_until};

/// A pod lifecycle phase from which no further transition occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalPhase {
    Succeeded,
    Failed,
}

fn terminal_phase(pod: &Pod) -> Option<TerminalPhase> {
    match pod
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
    {
        Some("Succeeded") => Some(TerminalPhase::Succeeded),
        Some("Failed") => Some(TerminalPhase::Failed),
        _ => None,
    }
}

/// Block until the build's status names an assigned builder.
pub async fn wait_builder_assigned<F, Fut>(
    fetch: F,
    cancel: &CancellationToken,
) -> PollOutcome<String>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<DynamicObject>>,
{
    match poll_until(
        fetch,
        |build| resources::builder_name(build).is_some(),
        cancel,
    )
    .await
    {
        PollOutcome::Satisfied(build) => PollOutcome::Satisfied(
            resources::builder_name(&build)
                .unwrap_or_default()
                .to_string(),
        ),
        PollOutcome::Cancelled(latest) => PollOutcome::Cancelled(
            latest
                .as_ref()
                .and_then(|build| resources::builder_name(build).map(str::to_owned)),
        ),
    }
}

/// Block until the build's status names its execution pod.
pub async fn wait_pod_assigned<F, Fut>(
    fetch: F,
    cancel: &CancellationToken,
) -> PollOutcome<PodRef>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<DynamicObject>>,
{
    match poll_until(
        fetch,
        |build| resources::build_pod_ref(build).is_some(),
        cancel,
    )
    .await
    {
        PollOutcome::Satisfied(build) => match resources::build_pod_ref(&build) {
            Some(pod_ref) => PollOutcome::Satisfied(pod_ref),
            None => PollOutcome::Cancelled(None),
        },
        PollOutcome::Cancelled(latest) => {
            PollOutcome::Cancelled(latest.as_ref().and_then(resources::build_pod_ref))
        }
    }
}

/// Block until the named init container reports a running state, returning
/// the pod that satisfied the check.
pub async fn wait_init_container_running<F, Fut>(
    fetch: F,
    container: &str,
    cancel: &CancellationToken,
) -> PollOutcome<Pod>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Pod>>,
{
    poll_until(
        fetch,
        |pod| resources::init_container_running(pod, container),
        cancel,
    )
    .await
}

/// Block until the pod reaches a terminal phase, returning which one. A
/// cancelled wait carries no phase: the outcome is unknown, not failed.
pub async fn wait_terminal_phase<F, Fut>(
    fetch: F,
    cancel: &CancellationToken,
) -> PollOutcome<TerminalPhase>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Pod>>,
{
    match poll_until(fetch, |pod| terminal_phase(pod).is_some(), cancel).await {
        PollOutcome::Satisfied(pod) => match terminal_phase(&pod) {
            Some(phase) => PollOutcome::Satisfied(phase),
            None => PollOutcome::Cancelled(None),
        },
        PollOutcome::Cancelled(latest) => {
            PollOutcome::Cancelled(latest.as_ref().and_then(terminal_phase))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use k8s_openapi::api::core::v1::PodStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    use super::*;
    use crate::platform::resources::testing::build_with_status;
    use crate::watch::cancel::cancel_after;

    fn pod_in_phase(phase: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("build-pod".to_string()),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn builder_assignment_surfaces_once_status_fills_in() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let fetch_attempts = Arc::clone(&attempts);
        let outcome = wait_builder_assigned(
            move || {
                let attempt = fetch_attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Ok(build_with_status("b", json!({})))
                    } else {
                        Ok(build_with_status("b", json!({ "builderName": "builder-1" })))
                    }
                }
            },
            &CancellationToken::new(),
        )
        .await;

        match outcome {
            PollOutcome::Satisfied(name) => assert_eq!(name, "builder-1"),
            PollOutcome::Cancelled(_) => panic!("expected assignment"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unassigned_builder_with_timer_returns_unknown_within_a_tick() {
        let cancel = CancellationToken::new();
        let _ = cancel_after(&cancel, Duration::from_millis(100));

        let started = std::time::Instant::now();
        let outcome = wait_builder_assigned(
            || async { Ok(build_with_status("b", json!({}))) },
            &cancel,
        )
        .await;

        assert!(started.elapsed() <= Duration::from_millis(1100) + Duration::from_millis(200));
        match outcome {
            PollOutcome::Cancelled(latest) => assert!(latest.is_none()),
            PollOutcome::Satisfied(_) => panic!("builder never assigned"),
        }
    }

    #[tokio::test]
    async fn pod_assignment_returns_the_reference() {
        let outcome = wait_pod_assigned(
            || async {
                Ok(build_with_status(
                    "b",
                    json!({ "podRef": { "namespace": "builds", "name": "build-pod" } }),
                ))
            },
            &CancellationToken::new(),
        )
        .await;

        match outcome {
            PollOutcome::Satisfied(pod_ref) => {
                assert_eq!(pod_ref.namespace, "builds");
                assert_eq!(pod_ref.name, "build-pod");
            }
            PollOutcome::Cancelled(_) => panic!("expected assignment"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_phase_waits_through_running() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let fetch_attempts = Arc::clone(&attempts);
        let outcome = wait_terminal_phase(
            move || {
                let attempt = fetch_attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Ok(pod_in_phase("Running"))
                    } else {
                        Ok(pod_in_phase("Failed"))
                    }
                }
            },
            &CancellationToken::new(),
        )
        .await;

        match outcome {
            PollOutcome::Satisfied(phase) => assert_eq!(phase, TerminalPhase::Failed),
            PollOutcome::Cancelled(_) => panic!("expected terminal phase"),
        }
    }

    #[tokio::test]
    async fn init_container_wait_matches_by_name() {
        use k8s_openapi::api::core::v1::{
            ContainerState, ContainerStateRunning, ContainerStatus,
        };

        let pod = Pod {
            status: Some(PodStatus {
                init_container_statuses: Some(vec![ContainerStatus {
                    name: resources::SOURCE_LOADER_CONTAINER.to_string(),
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

        let outcome = wait_init_container_running(
            || {
                let pod = pod.clone();
                async move { Ok(pod) }
            },
            resources::SOURCE_LOADER_CONTAINER,
            &CancellationToken::new(),
        )
        .await;
        assert!(outcome.is_satisfied());
    }
}
