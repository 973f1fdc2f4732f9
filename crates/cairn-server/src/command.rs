// Administration commands
// Maps each command onto the management service and renders the outcome as JSON

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use cairn_api::{
    CacheElement, ClusterManagementError, GatewayReceiverConfig, OperationDescriptor,
    RegionConfig, StatusCode,
};
use cairn_management::ClusterManagementService;
use cairn_management::operation::EXPORT_ENDPOINT;

use crate::model::Command;
use crate::model::config::{GatewayReceiverArgs, RegionArgs};

const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of one command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub status_code: StatusCode,
    pub body: Value,
}

impl CommandOutput {
    fn from_result<T: Serialize>(
        status_code: StatusCode,
        result: &T,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            status_code,
            body: serde_json::to_value(result)?,
        })
    }

    fn from_error(err: ClusterManagementError) -> anyhow::Result<Self> {
        let status_code = err.status_code;
        Self::from_result(status_code, &err.into_result())
    }

    pub fn is_successful(&self) -> bool {
        self.status_code.is_successful()
    }
}

impl From<RegionArgs> for RegionConfig {
    fn from(args: RegionArgs) -> Self {
        RegionConfig {
            name: args.name,
            group: args.group,
            region_type: args.region_type,
            key_constraint: args.key_constraint,
            value_constraint: args.value_constraint,
            ..RegionConfig::default()
        }
    }
}

impl From<GatewayReceiverArgs> for GatewayReceiverConfig {
    fn from(args: GatewayReceiverArgs) -> Self {
        GatewayReceiverConfig {
            group: args.group,
            start_port: args.start_port,
            end_port: args.end_port,
            bind_address: args.bind_address,
            hostname_for_senders: args.hostname_for_senders,
            maximum_time_between_pings: args.maximum_time_between_pings,
            socket_buffer_size: args.socket_buffer_size,
            manual_start: args.manual_start,
            ..GatewayReceiverConfig::default()
        }
    }
}

async fn create(
    service: &ClusterManagementService,
    element: CacheElement,
) -> anyhow::Result<CommandOutput> {
    match service.create(element).await {
        Ok(result) => CommandOutput::from_result(result.status_code, &result),
        Err(e) => CommandOutput::from_error(e),
    }
}

async fn delete(
    service: &ClusterManagementService,
    element: CacheElement,
) -> anyhow::Result<CommandOutput> {
    match service.delete(element).await {
        Ok(result) => CommandOutput::from_result(result.status_code, &result),
        Err(e) => CommandOutput::from_error(e),
    }
}

async fn list(
    service: &ClusterManagementService,
    filter: CacheElement,
) -> anyhow::Result<CommandOutput> {
    match service.list(filter).await {
        Ok(result) => CommandOutput::from_result(result.status_code, &result),
        Err(e) => CommandOutput::from_error(e),
    }
}

/// Start the export operation and poll it to completion
async fn export(
    service: &ClusterManagementService,
    group: Option<String>,
) -> anyhow::Result<CommandOutput> {
    let mut descriptor = OperationDescriptor::new(EXPORT_ENDPOINT);
    if let Some(group) = group {
        descriptor = descriptor.with_payload(serde_json::json!({ "group": group }));
    }

    let started = match service.start(descriptor).await {
        Ok(started) => started,
        Err(e) => return CommandOutput::from_error(e),
    };
    info!(operation_id = %started.operation_id, uri = %started.uri, "Export started");

    loop {
        let status = match service.check_status(&started.operation_id) {
            Ok(status) => status,
            Err(e) => return CommandOutput::from_error(e),
        };
        if status.is_complete() {
            return CommandOutput::from_result(status.status_code, &status);
        }
        tokio::time::sleep(EXPORT_POLL_INTERVAL).await;
    }
}

/// Run one administration command
pub async fn run(
    service: &ClusterManagementService,
    command: Command,
) -> anyhow::Result<CommandOutput> {
    match command {
        Command::CreateRegion(args) => create(service, RegionConfig::from(args).into()).await,
        Command::CreateGatewayReceiver(args) => {
            create(service, GatewayReceiverConfig::from(args).into()).await
        }
        Command::DeleteRegion { name } => delete(service, RegionConfig::new(name).into()).await,
        Command::DeleteGatewayReceiver { group } => {
            let receiver = GatewayReceiverConfig {
                group,
                ..GatewayReceiverConfig::default()
            };
            delete(service, receiver.into()).await
        }
        Command::ListRegions { name, group } => {
            let filter = RegionConfig {
                name: name.unwrap_or_default(),
                group,
                ..RegionConfig::default()
            };
            list(service, filter.into()).await
        }
        Command::ListGatewayReceivers { group } => {
            let filter = GatewayReceiverConfig {
                group,
                ..GatewayReceiverConfig::default()
            };
            list(service, filter.into()).await
        }
        Command::Export { group } => export(service, group).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cairn_api::{Member, RegionType};
    use cairn_core::cluster::ServerMemberManager;
    use cairn_core::{ClusterRealizationExecutor, LocalCacheFunction};
    use cairn_management::ManagementConfig;
    use cairn_persistence::MemoryPersistService;

    fn service() -> ClusterManagementService {
        let members = ServerMemberManager::new();
        members.register(Member::new("server-1", "127.0.0.1:40404").with_groups(["group1"]));
        ClusterManagementService::new(
            Some(Arc::new(MemoryPersistService::new())),
            Arc::new(members),
            Arc::new(ClusterRealizationExecutor::new(
                Arc::new(LocalCacheFunction::new()),
                Duration::from_secs(1),
            )),
            &ManagementConfig::default(),
        )
    }

    fn region_args(name: &str, group: Option<&str>) -> RegionArgs {
        RegionArgs {
            name: name.to_string(),
            region_type: Some(RegionType::Partition),
            group: group.map(str::to_string),
            key_constraint: None,
            value_constraint: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let service = service();

        let created = run(&service, Command::CreateRegion(region_args("orders", Some("group1"))))
            .await
            .unwrap();
        assert!(created.is_successful());
        assert_eq!(created.body["statusCode"], "OK");

        let listed = run(
            &service,
            Command::ListRegions {
                name: None,
                group: Some("group1".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(listed.body["result"][0]["name"], "orders");
        assert_eq!(listed.body["result"][0]["type"], "PARTITION");
    }

    #[tokio::test]
    async fn test_error_rendered_as_result() {
        let service = service();

        let output = run(
            &service,
            Command::DeleteRegion {
                name: "unknown".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(!output.is_successful());
        assert_eq!(output.status_code, StatusCode::EntityNotFound);
        assert_eq!(output.body["statusCode"], "ENTITY_NOT_FOUND");
        assert_eq!(
            output.body["statusMessage"],
            "RegionConfig 'unknown' does not exist."
        );
    }

    #[tokio::test]
    async fn test_export_polls_to_completion() {
        let service = service();
        run(&service, Command::CreateRegion(region_args("orders", None)))
            .await
            .unwrap();

        let output = run(&service, Command::Export { group: None }).await.unwrap();
        assert_eq!(output.status_code, StatusCode::Ok);
        assert_eq!(
            output.body["result"]["groups"]["cluster"]["regions"][0]["name"],
            "orders"
        );
    }

    #[tokio::test]
    async fn test_gateway_receiver_commands() {
        let service = service();
        let args = GatewayReceiverArgs {
            group: Some("group1".to_string()),
            start_port: Some(5000),
            end_port: Some(5100),
            bind_address: None,
            hostname_for_senders: None,
            maximum_time_between_pings: None,
            socket_buffer_size: None,
            manual_start: true,
        };

        let created = run(&service, Command::CreateGatewayReceiver(args)).await.unwrap();
        assert!(created.is_successful());

        let deleted = run(
            &service,
            Command::DeleteGatewayReceiver {
                group: Some("group1".to_string()),
            },
        )
        .await
        .unwrap();
        assert!(deleted.is_successful());
    }
}
