// Realization of configuration changes on live members
// Fans a change out to every target member and gathers the per-member outcomes

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use cairn_api::{CacheElement, CacheElementOperation, Member, RealizationResult};

/// Apply primitive invoked on one member
#[async_trait]
pub trait MemberFunction: Send + Sync {
    /// Apply `operation` for `element` to the running state of `member`
    async fn execute(
        &self,
        member: &Member,
        operation: CacheElementOperation,
        element: &CacheElement,
    ) -> anyhow::Result<RealizationResult>;

    /// Whether `member` currently exposes an element with the same identity
    async fn contains(&self, member: &Member, element: &CacheElement) -> anyhow::Result<bool>;
}

/// Realizes changes on a set of members
#[async_trait]
pub trait RealizationExecutor: Send + Sync {
    /// Apply the change to every member and return one outcome per member
    ///
    /// Never fails: errors and timeouts are recorded as failed outcomes.
    async fn apply(
        &self,
        operation: CacheElementOperation,
        element: &CacheElement,
        members: &[Member],
    ) -> Vec<RealizationResult>;

    /// Names of the members that already expose the element
    async fn members_with_element(
        &self,
        element: &CacheElement,
        members: &[Member],
    ) -> anyhow::Result<Vec<String>>;
}

/// Concurrent executor with a per-member timeout
pub struct ClusterRealizationExecutor {
    function: Arc<dyn MemberFunction>,
    member_timeout: Duration,
}

impl ClusterRealizationExecutor {
    pub fn new(function: Arc<dyn MemberFunction>, member_timeout: Duration) -> Self {
        Self {
            function,
            member_timeout,
        }
    }
}

#[async_trait]
impl RealizationExecutor for ClusterRealizationExecutor {
    async fn apply(
        &self,
        operation: CacheElementOperation,
        element: &CacheElement,
        members: &[Member],
    ) -> Vec<RealizationResult> {
        let calls = members.iter().map(|member| async move {
            let call = self.function.execute(member, operation, element);
            match tokio::time::timeout(self.member_timeout, call).await {
                Ok(Ok(mut result)) => {
                    // Outcomes are always attributed to the targeted member
                    result.member_name = member.name.clone();
                    result
                }
                Ok(Err(e)) => {
                    warn!(member = %member.name, error = %e, "Realization failed");
                    RealizationResult::failure(&member.name, e.to_string())
                }
                Err(_) => {
                    warn!(member = %member.name, "Realization timed out");
                    RealizationResult::failure(
                        &member.name,
                        format!("Timed out after {}ms", self.member_timeout.as_millis()),
                    )
                }
            }
        });

        let results = join_all(calls).await;
        debug!(
            operation = %operation,
            element = %element.id(),
            members = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "Realization finished"
        );
        results
    }

    async fn members_with_element(
        &self,
        element: &CacheElement,
        members: &[Member],
    ) -> anyhow::Result<Vec<String>> {
        let queries = members.iter().map(|member| async move {
            let query = self.function.contains(member, element);
            match tokio::time::timeout(self.member_timeout, query).await {
                Ok(Ok(found)) => Ok((member.name.clone(), found)),
                Ok(Err(e)) => Err(e.context(format!("querying member '{}'", member.name))),
                Err(_) => Err(anyhow::anyhow!(
                    "querying member '{}' timed out after {}ms",
                    member.name,
                    self.member_timeout.as_millis()
                )),
            }
        });

        let mut names = Vec::new();
        for outcome in join_all(queries).await {
            let (name, found) = outcome?;
            if found {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_api::RegionConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedFunction {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MemberFunction for ScriptedFunction {
        async fn execute(
            &self,
            member: &Member,
            _operation: CacheElementOperation,
            _element: &CacheElement,
        ) -> anyhow::Result<RealizationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match member.name.as_str() {
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(RealizationResult::success(&member.name))
                }
                "broken" => Err(anyhow::anyhow!("connection refused")),
                "rejecting" => Ok(RealizationResult::failure(&member.name, "disk full")),
                _ => Ok(RealizationResult::success("someone-else")),
            }
        }

        async fn contains(&self, member: &Member, _element: &CacheElement) -> anyhow::Result<bool> {
            match member.name.as_str() {
                "broken" => Err(anyhow::anyhow!("connection refused")),
                "holder" => Ok(true),
                _ => Ok(false),
            }
        }
    }

    fn executor() -> (ClusterRealizationExecutor, Arc<ScriptedFunction>) {
        let function = Arc::new(ScriptedFunction {
            calls: AtomicUsize::new(0),
        });
        let executor = ClusterRealizationExecutor::new(function.clone(), Duration::from_millis(100));
        (executor, function)
    }

    fn members(names: &[&str]) -> Vec<Member> {
        names
            .iter()
            .map(|n| Member::new(*n, format!("{}:40404", n)))
            .collect()
    }

    #[tokio::test]
    async fn test_apply_collects_every_outcome() {
        let (executor, function) = executor();
        let element: CacheElement = RegionConfig::new("orders").into();

        let results = executor
            .apply(
                CacheElementOperation::Create,
                &element,
                &members(&["ok", "rejecting", "broken", "slow"]),
            )
            .await;

        assert_eq!(function.calls.load(Ordering::SeqCst), 4);
        assert_eq!(results.len(), 4);
        assert!(results[0].success);
        assert_eq!(results[0].member_name, "ok");
        assert_eq!(results[1].message.as_deref(), Some("disk full"));
        assert_eq!(results[2].message.as_deref(), Some("connection refused"));
        assert!(!results[3].success);
        assert!(results[3].message.as_deref().unwrap().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_apply_without_members() {
        let (executor, function) = executor();
        let element: CacheElement = RegionConfig::new("orders").into();

        let results = executor
            .apply(CacheElementOperation::Delete, &element, &[])
            .await;
        assert!(results.is_empty());
        assert_eq!(function.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_members_with_element() {
        let (executor, _) = executor();
        let element: CacheElement = RegionConfig::new("orders").into();

        let holders = executor
            .members_with_element(&element, &members(&["ok", "holder"]))
            .await
            .unwrap();
        assert_eq!(holders, vec!["holder"]);

        let err = executor
            .members_with_element(&element, &members(&["ok", "broken"]))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("broken"));
    }
}
