// Cluster management service
// Validates configuration changes, realizes them on live members and persists them

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use cairn_api::{
    CacheConfig, CacheElement, CacheElementOperation, ClusterManagementError, ClusterManagementListResult,
    ClusterManagementOperationResult, ClusterManagementOperationStatusResult,
    ClusterManagementRealizationResult, ElementKind, Member, OperationDescriptor, RealizationResult,
    StatusCode, validation_message,
};
use cairn_common::is_cluster_group;
use cairn_core::RealizationExecutor;
use cairn_core::cluster::ClusterMembership;
use cairn_persistence::{ConfigurationLockGuard, ConfigurationPersistence};

use crate::config::ManagementConfig;
use crate::metrics::{self, Timer};
use crate::mutator::{ConfigurationManager, GatewayReceiverConfigManager, RegionConfigManager};
use crate::operation::{ExportConfigurationPerformer, OperationManager, OperationPerformer};
use crate::validator::{
    CacheElementValidator, ElementValidator, GatewayReceiverConfigValidator, MemberValidator,
    RegionConfigValidator,
};

/// Entry point for create, delete and list of configuration elements and for
/// asynchronous operations
///
/// Create and delete hold the cluster configuration lock from the persisted-state
/// checks until persistence, so concurrent changes are serialized. Nothing is
/// persisted unless every targeted live member realized the change.
pub struct ClusterManagementService {
    persistence: Option<Arc<dyn ConfigurationPersistence>>,
    membership: Arc<dyn ClusterMembership>,
    executor: Arc<dyn RealizationExecutor>,
    common_validator: CacheElementValidator,
    validators: HashMap<ElementKind, Arc<dyn ElementValidator>>,
    managers: HashMap<ElementKind, Arc<dyn ConfigurationManager>>,
    operations: OperationManager,
}

impl ClusterManagementService {
    /// Create a service with the built-in element types and operations
    ///
    /// Without `persistence` the cluster configuration feature is disabled and
    /// every create, delete and list fails with ILLEGAL_STATE.
    pub fn new(
        persistence: Option<Arc<dyn ConfigurationPersistence>>,
        membership: Arc<dyn ClusterMembership>,
        executor: Arc<dyn RealizationExecutor>,
        config: &ManagementConfig,
    ) -> Self {
        let operations = OperationManager::new(config);
        if let Some(persistence) = &persistence {
            operations.register(Arc::new(ExportConfigurationPerformer::new(
                persistence.clone(),
            )));
        }

        let mut service = Self {
            persistence,
            membership,
            executor,
            common_validator: CacheElementValidator,
            validators: HashMap::new(),
            managers: HashMap::new(),
            operations,
        };
        service.register_element_type(
            Arc::new(RegionConfigValidator),
            Arc::new(RegionConfigManager),
        );
        service.register_element_type(
            Arc::new(GatewayReceiverConfigValidator),
            Arc::new(GatewayReceiverConfigManager),
        );
        service
    }

    /// Register the validator and manager of an element type
    pub fn register_element_type(
        &mut self,
        validator: Arc<dyn ElementValidator>,
        manager: Arc<dyn ConfigurationManager>,
    ) {
        self.validators.insert(validator.kind(), validator);
        self.managers.insert(manager.kind(), manager);
    }

    /// Register an operation performer
    pub fn register_operation(&self, performer: Arc<dyn OperationPerformer>) {
        self.operations.register(performer);
    }

    pub fn operations(&self) -> &OperationManager {
        &self.operations
    }

    // ===================== Create =====================

    /// Create an element on every live member of its group, then persist it
    pub async fn create(
        &self,
        element: CacheElement,
    ) -> Result<ClusterManagementRealizationResult, ClusterManagementError> {
        let timer = Timer::new();
        let kind = element.kind();
        let outcome = self.do_create(element).await;
        metrics::record_change(
            CacheElementOperation::Create,
            kind,
            status_of(&outcome),
            timer.elapsed_secs(),
        );
        outcome
    }

    async fn do_create(
        &self,
        mut element: CacheElement,
    ) -> Result<ClusterManagementRealizationResult, ClusterManagementError> {
        let persistence = self.persistence()?;
        let kind = element.kind();
        let (validator, manager) = self.element_type(kind)?;
        let operation = CacheElementOperation::Create;

        self.common_validator
            .validate(operation, &element)
            .map_err(|e| ClusterManagementError::illegal_argument(validation_message(&e)))?;
        validator
            .validate(operation, &element)
            .map_err(|e| ClusterManagementError::illegal_argument(validation_message(&e)))?;

        let group = element.config_group().to_string();
        let guard = self.lock(&persistence).await?;
        let member_validator = self.member_validator(&persistence);

        let existing = member_validator
            .find_existing(&element, manager.as_ref())
            .await
            .map_err(|e| internal("Failed to read persisted configuration", e))?;
        validator
            .validate_existing(&element, &existing)
            .map_err(|e| ClusterManagementError::illegal_argument(validation_message(&e)))?;
        member_validator.validate_create(&element, &existing).await?;

        let targets = member_validator.find_servers(element.group());
        let member_statuses = self.realize(operation, &element, &targets).await;
        if member_statuses.iter().any(|s| !s.success) {
            return Ok(ClusterManagementRealizationResult::new(
                StatusCode::Error,
                "Failed to create on all members.",
                member_statuses,
            ));
        }

        element.set_group(None);
        element.clear_groups();
        let persisted_manager = manager.clone();
        if let Err(e) = guard
            .update(
                &group,
                Box::new(move |doc: &mut CacheConfig| persisted_manager.add(doc, element)),
            )
            .await
        {
            warn!(group = %group, error = %e, "Failed to persist created element");
            return Ok(ClusterManagementRealizationResult::new(
                StatusCode::InternalError,
                format!("Failed to persist configuration for {}: {:#}", group, e),
                member_statuses,
            ));
        }

        info!(kind = %kind.type_name(), group = %group, "Configuration element created");
        Ok(ClusterManagementRealizationResult::new(
            StatusCode::Ok,
            format!("Successfully updated configuration for {}.", group),
            member_statuses,
        ))
    }

    // ===================== Delete =====================

    /// Delete an element from every live member holding it, then from every
    /// group document containing it
    pub async fn delete(
        &self,
        element: CacheElement,
    ) -> Result<ClusterManagementRealizationResult, ClusterManagementError> {
        let timer = Timer::new();
        let kind = element.kind();
        let outcome = self.do_delete(element).await;
        metrics::record_change(
            CacheElementOperation::Delete,
            kind,
            status_of(&outcome),
            timer.elapsed_secs(),
        );
        outcome
    }

    async fn do_delete(
        &self,
        element: CacheElement,
    ) -> Result<ClusterManagementRealizationResult, ClusterManagementError> {
        let persistence = self.persistence()?;
        let kind = element.kind();
        let (validator, manager) = self.element_type(kind)?;
        let operation = CacheElementOperation::Delete;

        if kind.has_cluster_unique_identity() && element.group().is_some() {
            return Err(ClusterManagementError::illegal_argument(format!(
                "Group is an invalid option when deleting {}.",
                kind.display_name()
            )));
        }
        self.common_validator
            .validate(operation, &element)
            .map_err(|e| ClusterManagementError::illegal_argument(validation_message(&e)))?;
        validator
            .validate(operation, &element)
            .map_err(|e| ClusterManagementError::illegal_argument(validation_message(&e)))?;

        let guard = self.lock(&persistence).await?;
        let member_validator = self.member_validator(&persistence);

        let groups = member_validator
            .find_groups_with_this_element(&element, manager.as_ref())
            .await
            .map_err(|e| internal("Failed to read persisted configuration", e))?;
        if groups.is_empty() {
            return Err(ClusterManagementError::not_found(format!(
                "{} '{}' does not exist.",
                kind.type_name(),
                element.id()
            )));
        }

        let targets = member_validator.find_servers_in(&groups);
        let member_statuses = self.realize(operation, &element, &targets).await;
        if member_statuses.iter().any(|s| !s.success) {
            return Ok(ClusterManagementRealizationResult::new(
                StatusCode::Error,
                "Failed to delete on all members.",
                member_statuses,
            ));
        }

        for group in &groups {
            let persisted_manager = manager.clone();
            let target = element.clone();
            if let Err(e) = guard
                .update(
                    group,
                    Box::new(move |doc: &mut CacheConfig| persisted_manager.delete(doc, &target)),
                )
                .await
            {
                warn!(group = %group, error = %e, "Failed to persist deleted element");
                return Ok(ClusterManagementRealizationResult::new(
                    StatusCode::InternalError,
                    format!("Failed to persist configuration for {}: {:#}", group, e),
                    member_statuses,
                ));
            }
        }

        info!(kind = %kind.type_name(), id = %element.id(), groups = ?groups, "Configuration element deleted");
        Ok(ClusterManagementRealizationResult::new(
            StatusCode::Ok,
            format!(
                "Successfully removed configuration for [{}]",
                groups.join(", ")
            ),
            member_statuses,
        ))
    }

    // ===================== List =====================

    /// List persisted elements matching the filter, merged across groups
    ///
    /// Every known group is scanned even when the filter names one, since an
    /// element can apply to a group through several documents. The group
    /// filter is applied to the merged applicable groups.
    pub async fn list(
        &self,
        filter: CacheElement,
    ) -> Result<ClusterManagementListResult, ClusterManagementError> {
        let timer = Timer::new();
        let kind = filter.kind();
        let outcome = self.do_list(filter).await;
        metrics::record_request("list", kind, status_of(&outcome), timer.elapsed_secs());
        outcome
    }

    async fn do_list(
        &self,
        filter: CacheElement,
    ) -> Result<ClusterManagementListResult, ClusterManagementError> {
        let persistence = self.persistence()?;
        let (_, manager) = self.element_type(filter.kind())?;
        let member_validator = self.member_validator(&persistence);

        let groups = member_validator
            .ordered_groups()
            .await
            .map_err(|e| internal("Failed to read persisted configuration", e))?;

        let mut merged: Vec<CacheElement> = Vec::new();
        for group in &groups {
            let doc = persistence
                .cache_config(group, true)
                .await
                .map_err(|e| internal("Failed to read persisted configuration", e))?
                .unwrap_or_default();

            for mut found in manager.list(&doc, &filter) {
                let source = (!is_cluster_group(group)).then(|| group.clone());
                found.set_group(source);
                found.clear_groups();
                match merged.iter_mut().find(|m| m.same_identity(&found)) {
                    Some(existing) => existing.add_group(group),
                    None => {
                        found.add_group(group);
                        merged.push(found);
                    }
                }
            }
        }

        if let Some(wanted) = filter.group() {
            merged.retain(|e| e.groups().iter().any(|g| g == wanted));
        }

        debug!(kind = %filter.kind(), groups = groups.len(), results = merged.len(), "Listed configuration elements");
        Ok(ClusterManagementListResult::ok(merged))
    }

    // ===================== Operations =====================

    /// Start an asynchronous operation
    pub async fn start(
        &self,
        descriptor: OperationDescriptor,
    ) -> Result<ClusterManagementOperationResult, ClusterManagementError> {
        self.operations.start(descriptor).await
    }

    /// Poll the state of an operation
    pub fn check_status(
        &self,
        id: &str,
    ) -> Result<ClusterManagementOperationStatusResult, ClusterManagementError> {
        self.operations.check_status(id)
    }

    // ===================== Helpers =====================

    fn persistence(&self) -> Result<Arc<dyn ConfigurationPersistence>, ClusterManagementError> {
        match &self.persistence {
            Some(persistence) if persistence.is_enabled() => Ok(persistence.clone()),
            _ => Err(ClusterManagementError::illegal_state(
                "Cluster configuration service needs to be enabled",
            )),
        }
    }

    fn element_type(
        &self,
        kind: ElementKind,
    ) -> Result<(Arc<dyn ElementValidator>, Arc<dyn ConfigurationManager>), ClusterManagementError>
    {
        match (self.validators.get(&kind), self.managers.get(&kind)) {
            (Some(validator), Some(manager)) => Ok((validator.clone(), manager.clone())),
            _ => Err(ClusterManagementError::illegal_argument(format!(
                "{} is not supported.",
                kind.type_name()
            ))),
        }
    }

    fn member_validator(&self, persistence: &Arc<dyn ConfigurationPersistence>) -> MemberValidator {
        MemberValidator::new(
            persistence.clone(),
            self.membership.clone(),
            self.executor.clone(),
        )
    }

    async fn lock(
        &self,
        persistence: &Arc<dyn ConfigurationPersistence>,
    ) -> Result<ConfigurationLockGuard, ClusterManagementError> {
        ConfigurationLockGuard::acquire(persistence)
            .await
            .ok_or_else(|| {
                warn!("Cluster configuration lock unavailable");
                ClusterManagementError::illegal_state(
                    "Unable to acquire the cluster configuration lock.",
                )
            })
    }

    async fn realize(
        &self,
        operation: CacheElementOperation,
        element: &CacheElement,
        targets: &[Member],
    ) -> Vec<RealizationResult> {
        if targets.is_empty() {
            debug!(element = %element.id(), "No live members targeted");
            return Vec::new();
        }

        let statuses = self.executor.apply(operation, element, targets).await;
        let failed = statuses.iter().filter(|s| !s.success).count();
        if failed > 0 {
            warn!(operation = %operation, element = %element.id(), failed, "Realization failed on members");
            metrics::record_realization_failures(operation, element.kind(), failed);
        }
        statuses
    }
}

fn status_of<T>(outcome: &Result<T, ClusterManagementError>) -> StatusCode
where
    T: HasStatus,
{
    match outcome {
        Ok(result) => result.status(),
        Err(e) => e.status_code,
    }
}

trait HasStatus {
    fn status(&self) -> StatusCode;
}

impl HasStatus for ClusterManagementRealizationResult {
    fn status(&self) -> StatusCode {
        self.status_code
    }
}

impl HasStatus for ClusterManagementListResult {
    fn status(&self) -> StatusCode {
        self.status_code
    }
}

fn internal(context: &str, err: anyhow::Error) -> ClusterManagementError {
    warn!(error = %err, "{}", context);
    ClusterManagementError::internal(format!("{}: {:#}", context, err))
}
