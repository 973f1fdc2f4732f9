// Server bootstrap
// Wires the store, the local member and the management service from configuration

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use cairn_core::cluster::ServerMemberManager;
use cairn_core::{ClusterRealizationExecutor, Configuration, LocalCacheFunction};
use cairn_management::{ClusterManagementService, ManagementConfig};
use cairn_persistence::{
    ConfigurationPersistence, EmbeddedPersistService, LockOptions, LockService,
    MemoryPersistService, StorageMode,
};

use crate::metrics;

/// A running standalone server
pub struct App {
    pub configuration: Configuration,
    pub membership: Arc<ServerMemberManager>,
    pub function: Arc<LocalCacheFunction>,
    pub persistence: Option<Arc<dyn ConfigurationPersistence>>,
    pub service: Arc<ClusterManagementService>,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    /// Stop the background tasks
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        info!("Cairn server stopped");
    }
}

fn lock_options(configuration: &Configuration) -> LockOptions {
    LockOptions {
        ttl: configuration.lock_ttl(),
        wait_timeout: configuration.lock_wait_timeout(),
        poll_interval: configuration.lock_poll_interval(),
    }
}

/// Open the configured store, or `None` when cluster configuration is disabled
pub fn build_persistence(
    configuration: &Configuration,
    lock_service: Arc<LockService>,
) -> anyhow::Result<Option<Arc<dyn ConfigurationPersistence>>> {
    if !configuration.is_cluster_configuration_enabled() {
        info!("Cluster configuration service is disabled");
        return Ok(None);
    }

    let mode = StorageMode::from_str(&configuration.persistence_mode())
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    info!("Persistence mode: {}", mode);

    let options = lock_options(configuration);
    let persistence: Arc<dyn ConfigurationPersistence> = match mode {
        StorageMode::Memory => Arc::new(MemoryPersistService::with_lock(lock_service, options)),
        StorageMode::Embedded => {
            let path = configuration.persistence_path();
            info!("Initializing embedded storage at: {}", path);
            Arc::new(EmbeddedPersistService::open_with_lock(
                &path,
                lock_service,
                options,
            )?)
        }
    };
    Ok(Some(persistence))
}

/// Load the persisted documents that apply to the local member into its cache
async fn restore_local_cache(
    persistence: &dyn ConfigurationPersistence,
    membership: &ServerMemberManager,
    function: &LocalCacheFunction,
) -> anyhow::Result<()> {
    let Some(local) = membership.get_self() else {
        return Ok(());
    };

    for group in persistence.groups().await? {
        if !local.belongs_to(&group) {
            continue;
        }
        if let Some(doc) = persistence.cache_config(&group, false).await? {
            debug!(member = %local.name, group = %group, regions = doc.regions.len(), "Restoring group configuration");
            function.apply_document(&local.name, &doc);
        }
    }
    Ok(())
}

fn spawn_member_watcher(membership: Arc<ServerMemberManager>) -> JoinHandle<()> {
    let mut events = membership.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    info!(
                        change = %event.change_type,
                        member = %event.member.name,
                        state = %event.member.state,
                        "Member changed"
                    );
                    metrics::record_cluster_members(&membership);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Member events lagged");
                    metrics::record_cluster_members(&membership);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Build the standalone server from configuration
///
/// Must be called from within a tokio runtime.
pub async fn bootstrap(configuration: Configuration) -> anyhow::Result<App> {
    let management_config = ManagementConfig::from_configuration(&configuration);

    let membership = Arc::new(ServerMemberManager::from_configuration(&configuration));
    metrics::record_cluster_members(&membership);
    let function = Arc::new(LocalCacheFunction::new());

    let lock_service = Arc::new(LockService::new());
    let mut tasks = vec![lock_service.start_expiry_task(configuration.lock_ttl())];

    let persistence = build_persistence(&configuration, lock_service)?;
    if let Some(persistence) = &persistence {
        restore_local_cache(persistence.as_ref(), &membership, &function).await?;
    }

    let executor = Arc::new(ClusterRealizationExecutor::new(
        function.clone(),
        management_config.realization_timeout,
    ));
    let service = Arc::new(ClusterManagementService::new(
        persistence.clone(),
        membership.clone(),
        executor,
        &management_config,
    ));

    tasks.push(
        service
            .operations()
            .history()
            .start_sweeper(management_config.operation_sweep_interval),
    );
    tasks.push(spawn_member_watcher(membership.clone()));

    info!(
        member = %configuration.member_name(),
        enabled = persistence.is_some(),
        "Cairn server started"
    );

    Ok(App {
        configuration,
        membership,
        function,
        persistence,
        service,
        tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_api::{CacheConfig, RegionConfig, RegionType};

    fn configuration(entries: &[(&str, &str)]) -> Configuration {
        let mut builder = config::Config::builder();
        for (key, value) in entries {
            builder = builder.set_default(*key, *value).unwrap();
        }
        Configuration::from_config(builder.build().unwrap())
    }

    #[tokio::test]
    async fn test_disabled_cluster_configuration() {
        let app = bootstrap(configuration(&[(
            "cairn.cluster-configuration.enabled",
            "false",
        )]))
        .await
        .unwrap();
        assert!(app.persistence.is_none());
        assert!(app.membership.get_self().is_some());
        app.shutdown();
    }

    #[tokio::test]
    async fn test_invalid_persistence_mode() {
        let result = build_persistence(
            &configuration(&[("cairn.persistence.mode", "cloud")]),
            Arc::new(LockService::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_restores_documents_for_local_groups() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap().to_string();
        let entries = [
            ("cairn.persistence.embedded.path", path.as_str()),
            ("cairn.member.name", "server-1"),
            ("cairn.member.groups", "group1"),
        ];

        {
            let persistence = build_persistence(&configuration(&entries), Arc::new(LockService::new()))
                .unwrap()
                .unwrap();
            let token = persistence.lock().await.unwrap();
            for (group, name) in [("cluster", "orders"), ("group1", "customers"), ("group2", "items")] {
                persistence
                    .update_cache_config(
                        &token,
                        group,
                        Box::new(move |doc: &mut CacheConfig| {
                            doc.regions
                                .push(RegionConfig::new(name).with_type(RegionType::Replicate));
                            Ok(())
                        }),
                    )
                    .await
                    .unwrap();
            }
            persistence.unlock(&token);
        }

        let app = bootstrap(configuration(&entries)).await.unwrap();
        let cache = app.function.snapshot("server-1").unwrap();
        assert!(cache.regions.contains_key("orders"));
        assert!(cache.regions.contains_key("customers"));
        assert!(!cache.regions.contains_key("items"));
        app.shutdown();
    }
}
