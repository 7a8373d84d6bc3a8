//! Supervisor registry service

use validator::Validate;

use crate::{
    error::AppResult,
    models::audit::{AuditEntry, AuditQuery},
    models::supervisor::{
        CreateSupervisor, Supervisor, SupervisorQuery, SupervisorShort, UpdateSupervisor,
    },
    repository::{audit::operation_id, with_retry, with_write_retry, Repository},
};

#[derive(Clone)]
pub struct SupervisorsService {
    repository: Repository,
}

impl SupervisorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_supervisor(&self, id: &str) -> AppResult<Supervisor> {
        with_retry("get_supervisor", || self.repository.supervisors.get_by_id(id)).await
    }

    pub async fn list_supervisors(
        &self,
        query: &SupervisorQuery,
    ) -> AppResult<(Vec<SupervisorShort>, i64)> {
        with_retry("list_supervisors", || self.repository.supervisors.search(query)).await
    }

    /// Register a supervisor; every field is validated before the store is touched
    pub async fn create_supervisor(&self, mut data: CreateSupervisor) -> AppResult<Supervisor> {
        data.email = data.email.trim().to_lowercase();
        data.validate()?;

        let op = operation_id();
        let supervisor = with_write_retry(
            "create_supervisor",
            || self.repository.supervisors.create(&op, &data),
            || self.landed_supervisor(&op),
        )
        .await?;
        tracing::info!(
            supervisor_id = %supervisor.id,
            level = %supervisor.permission_level,
            "Supervisor created"
        );
        Ok(supervisor)
    }

    pub async fn update_supervisor(
        &self,
        id: &str,
        mut data: UpdateSupervisor,
    ) -> AppResult<Supervisor> {
        data.email = data.email.map(|e| e.trim().to_lowercase());
        data.validate()?;
        let op = operation_id();
        with_write_retry(
            "update_supervisor",
            || self.repository.supervisors.update(&op, id, &data),
            || self.landed_supervisor(&op),
        )
        .await
    }

    pub async fn delete_supervisor(&self, id: &str) -> AppResult<()> {
        let op = operation_id();
        with_write_retry(
            "delete_supervisor",
            || self.repository.supervisors.delete(&op, id),
            || self.repository.audit.landed_then(&op, |_| async { Ok(()) }),
        )
        .await?;
        tracing::info!(supervisor_id = id, "Supervisor deleted");
        Ok(())
    }

    /// Audit trail of a supervisor, newest first. Entries outlive the
    /// supervisor record, so an unknown id yields an empty page.
    pub async fn list_audit(
        &self,
        id: &str,
        query: &AuditQuery,
    ) -> AppResult<(Vec<AuditEntry>, i64)> {
        with_retry("list_audit", || self.repository.audit.list_for_supervisor(id, query)).await
    }

    /// Supervisor written by `op`, if that write committed
    async fn landed_supervisor(&self, op: &str) -> AppResult<Option<Supervisor>> {
        self.repository
            .audit
            .landed_then(op, |id| async move { self.repository.supervisors.get_by_id(&id).await })
            .await
    }
}
