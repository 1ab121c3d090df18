//! Organization hierarchy engine: tenant tree maintenance with cycle
//! prevention, soft deletion, activation constraints, and cached views.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    hierarchy::build_group_tree, CreateOrganizationRequest, Organization, OrganizationHierarchy,
    OrganizationStats, UpdateOrganizationRequest,
};
use crate::store::DirectoryStore;

use super::audit::{AuditEntry, AuditSink, HierarchyChangeEntry};
use super::directory_cache::DirectoryCache;
use super::error::ServiceError;
use super::invalidation::{EventKind, InvalidationCoordinator, InvalidationEvent};

#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn DirectoryStore>,
    cache: DirectoryCache,
    audit: Arc<dyn AuditSink>,
    invalidation: Arc<InvalidationCoordinator>,
}

impl OrganizationService {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        cache: DirectoryCache,
        audit: Arc<dyn AuditSink>,
        invalidation: Arc<InvalidationCoordinator>,
    ) -> Self {
        Self {
            store,
            cache,
            audit,
            invalidation,
        }
    }

    pub async fn create_organization(
        &self,
        req: CreateOrganizationRequest,
        actor: &str,
    ) -> Result<Organization, ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        if let Some(existing) = self
            .store
            .find_organization_by_name(&req.name)
            .await
            .map_err(ServiceError::Store)?
        {
            if !existing.lifecycle.is_deleted() {
                return Err(ServiceError::NameConflict(req.name));
            }
        }

        if let Some(parent_id) = req.parent_id {
            let parent = self
                .store
                .find_organization_by_id(parent_id)
                .await
                .map_err(ServiceError::Store)?
                .ok_or(ServiceError::ParentNotFound)?;
            if !parent.is_operational() {
                return Err(ServiceError::ParentInactive);
            }
        }

        let org = Organization::new(req.name, req.description, req.parent_id);
        self.store
            .insert_organization(&org)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "organization.create",
            org.id,
            format!("Created organization {}", org.name),
            serde_json::json!({ "name": org.name, "parent_id": org.parent_id }),
        )
        .await;

        self.publish(
            InvalidationEvent::new(EventKind::OrganizationCreated, org.id, "organization", org.id)
                .with_parent(org.parent_id),
        )
        .await;

        tracing::info!(org_id = %org.id, name = %org.name, "Organization created");
        Ok(org)
    }

    /// Soft-deleted organizations read as absent.
    pub async fn get_organization(&self, id: Uuid) -> Result<Organization, ServiceError> {
        let org = self
            .store
            .find_organization_by_id(id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::OrganizationNotFound)?;
        if org.lifecycle.is_deleted() {
            return Err(ServiceError::OrganizationNotFound);
        }
        Ok(org)
    }

    pub async fn update_organization(
        &self,
        id: Uuid,
        patch: UpdateOrganizationRequest,
        actor: &str,
    ) -> Result<Organization, ServiceError> {
        patch
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let mut org = self.get_organization(id).await?;
        let old_parent_id = org.parent_id;

        if let Some(name) = &patch.name {
            if *name != org.name {
                if let Some(existing) = self
                    .store
                    .find_organization_by_name(name)
                    .await
                    .map_err(ServiceError::Store)?
                {
                    if existing.id != id && !existing.lifecycle.is_deleted() {
                        return Err(ServiceError::NameConflict(name.clone()));
                    }
                }
                org.name = name.clone();
            }
        }

        if let Some(description) = patch.description {
            org.description = Some(description);
        }

        let mut hierarchy_changed = false;
        if let Some(new_parent) = patch.parent_id {
            if new_parent != old_parent_id {
                if let Some(parent_id) = new_parent {
                    if parent_id == id {
                        return Err(ServiceError::CircularHierarchy);
                    }
                    let parent = self
                        .store
                        .find_organization_by_id(parent_id)
                        .await
                        .map_err(ServiceError::Store)?
                        .ok_or(ServiceError::ParentNotFound)?;
                    if !parent.is_operational() {
                        return Err(ServiceError::ParentInactive);
                    }
                    self.ensure_no_cycle(id, parent_id).await?;
                }
                org.parent_id = new_parent;
                hierarchy_changed = true;
            }
        }

        org.updated_at = Utc::now();
        self.store
            .update_organization(&org)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "organization.update",
            org.id,
            format!("Updated organization {}", org.name),
            serde_json::json!({
                "name": org.name,
                "old_parent_id": old_parent_id,
                "new_parent_id": org.parent_id,
            }),
        )
        .await;

        if hierarchy_changed {
            if let Err(e) = self
                .audit
                .log_hierarchy_change(HierarchyChangeEntry {
                    actor_id: actor.to_string(),
                    action: "organization.reparent".to_string(),
                    resource_type: "organization".to_string(),
                    resource_id: org.id.to_string(),
                    old_parent_id,
                    new_parent_id: org.parent_id,
                    message: format!("Moved organization {}", org.name),
                    success: true,
                    created_at: Utc::now(),
                })
                .await
            {
                tracing::warn!(error = %e, org_id = %org.id, "Failed to audit hierarchy change");
            }

            // Every descendant's cached parent chain and hierarchy view now
            // point through the old ancestor path.
            let affected = self.collect_descendant_ids(org.id).await?;
            self.publish(
                InvalidationEvent::new(
                    EventKind::OrganizationHierarchyChanged,
                    org.id,
                    "organization",
                    org.id,
                )
                .with_parent(org.parent_id)
                .with_old_parent(old_parent_id)
                .with_affected(affected),
            )
            .await;
        } else {
            self.publish(InvalidationEvent::new(
                EventKind::OrganizationUpdated,
                org.id,
                "organization",
                org.id,
            ))
            .await;
        }

        Ok(org)
    }

    pub async fn delete_organization(&self, id: Uuid, actor: &str) -> Result<(), ServiceError> {
        let mut org = self
            .store
            .find_organization_by_id(id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::OrganizationNotFound)?;
        if org.lifecycle.is_deleted() {
            return Err(ServiceError::AlreadyDeleted);
        }

        let child_count = self
            .store
            .count_children(id)
            .await
            .map_err(ServiceError::Store)?;
        if child_count > 0 {
            return Err(ServiceError::HasChildOrganizations);
        }

        if self
            .store
            .has_active_groups(id)
            .await
            .map_err(ServiceError::Store)?
        {
            return Err(ServiceError::HasActiveGroups);
        }

        org.soft_delete(actor, Utc::now());
        self.store
            .update_organization(&org)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "organization.delete",
            org.id,
            format!("Soft-deleted organization {}", org.name),
            serde_json::json!({ "name": org.name }),
        )
        .await;

        // The parent's cached children listings still carry the deleted org.
        self.publish(
            InvalidationEvent::new(EventKind::OrganizationDeleted, org.id, "organization", org.id)
                .with_affected(org.parent_id.into_iter().collect()),
        )
        .await;

        tracing::info!(org_id = %org.id, "Organization soft-deleted");
        Ok(())
    }

    /// Re-enable an organization; its parent (if any) must itself be active.
    pub async fn activate(&self, id: Uuid, actor: &str) -> Result<Organization, ServiceError> {
        let mut org = self.get_organization(id).await?;

        if let Some(parent_id) = org.parent_id {
            let parent = self
                .store
                .find_organization_by_id(parent_id)
                .await
                .map_err(ServiceError::Store)?
                .ok_or(ServiceError::ParentNotFound)?;
            if !parent.is_operational() {
                return Err(ServiceError::ParentInactive);
            }
        }

        org.is_active = true;
        org.updated_at = Utc::now();
        self.store
            .update_organization(&org)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "organization.activate",
            org.id,
            format!("Activated organization {}", org.name),
            serde_json::Value::Null,
        )
        .await;
        self.publish(InvalidationEvent::new(
            EventKind::OrganizationUpdated,
            org.id,
            "organization",
            org.id,
        ))
        .await;

        Ok(org)
    }

    /// Disable an organization; refused while active children remain.
    pub async fn deactivate(&self, id: Uuid, actor: &str) -> Result<Organization, ServiceError> {
        let mut org = self.get_organization(id).await?;

        let active_children = self
            .store
            .list_active_children(id)
            .await
            .map_err(ServiceError::Store)?;
        if !active_children.is_empty() {
            return Err(ServiceError::HasActiveChildren);
        }

        org.is_active = false;
        org.updated_at = Utc::now();
        self.store
            .update_organization(&org)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "organization.deactivate",
            org.id,
            format!("Deactivated organization {}", org.name),
            serde_json::Value::Null,
        )
        .await;
        self.publish(InvalidationEvent::new(
            EventKind::OrganizationUpdated,
            org.id,
            "organization",
            org.id,
        ))
        .await;

        Ok(org)
    }

    pub async fn list_children(
        &self,
        id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Organization>, ServiceError> {
        if let Some(children) = self.cache.get_children(id, active_only).await {
            return Ok(children);
        }

        let children = if active_only {
            self.store.list_active_children(id).await
        } else {
            self.store.list_children(id).await
        }
        .map_err(ServiceError::Store)?;

        self.cache.put_children(id, active_only, &children).await;
        Ok(children)
    }

    /// Composite hierarchy view: chain to root, direct children, and the
    /// group tree. The composite and each piece are cached; uncached pieces
    /// load concurrently.
    pub async fn get_hierarchy(&self, id: Uuid) -> Result<OrganizationHierarchy, ServiceError> {
        if let Some(hierarchy) = self.cache.get_hierarchy(id).await {
            return Ok(hierarchy);
        }

        let organization = self.get_organization(id).await?;

        let (parent_chain, children, groups) = tokio::try_join!(
            self.load_parent_chain(&organization),
            self.list_children(id, false),
            async {
                if let Some(tree) = self.cache.get_group_tree(id).await {
                    return Ok(tree);
                }
                let groups = self
                    .store
                    .list_groups(id)
                    .await
                    .map_err(ServiceError::Store)?;
                let tree = build_group_tree(groups);
                self.cache.put_group_tree(id, &tree).await;
                Ok(tree)
            }
        )?;

        let hierarchy = OrganizationHierarchy {
            organization,
            parent_chain,
            children,
            groups,
        };
        self.cache.put_hierarchy(id, &hierarchy).await;
        Ok(hierarchy)
    }

    pub async fn get_stats(&self, id: Uuid) -> Result<OrganizationStats, ServiceError> {
        if let Some(stats) = self.cache.get_stats(id).await {
            return Ok(stats);
        }

        // Ensure the org exists before counting against it.
        self.get_organization(id).await?;

        let (child_count, group_count, user_count) = tokio::try_join!(
            async { self.store.count_children(id).await.map_err(ServiceError::Store) },
            async { self.store.count_groups(id).await.map_err(ServiceError::Store) },
            async { self.store.count_users(id).await.map_err(ServiceError::Store) },
        )?;

        let stats = OrganizationStats {
            organization_id: id,
            child_count,
            group_count,
            user_count,
            generated_at: Utc::now(),
        };
        self.cache.put_stats(id, &stats).await;
        Ok(stats)
    }

    async fn load_parent_chain(
        &self,
        org: &Organization,
    ) -> Result<Vec<Organization>, ServiceError> {
        if let Some(chain) = self.cache.get_parent_chain(org.id).await {
            return Ok(chain);
        }

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = org.parent_id;
        while let Some(parent_id) = current {
            // A repeat means the stored chain is corrupt; stop rather than spin.
            if !visited.insert(parent_id) {
                tracing::error!(org_id = %org.id, node = %parent_id, "Cycle found in stored parent chain");
                break;
            }
            let Some(parent) = self
                .store
                .find_organization_by_id(parent_id)
                .await
                .map_err(ServiceError::Store)?
            else {
                break;
            };
            current = parent.parent_id;
            chain.push(parent);
        }

        self.cache.put_parent_chain(org.id, &chain).await;
        Ok(chain)
    }

    /// Breadth-first walk collecting every descendant organization id.
    async fn collect_descendant_ids(&self, org_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        let mut ids = Vec::new();
        let mut visited = HashSet::from([org_id]);
        let mut queue = vec![org_id];

        while let Some(node_id) = queue.pop() {
            for child in self
                .store
                .list_children(node_id)
                .await
                .map_err(ServiceError::Store)?
            {
                if visited.insert(child.id) {
                    ids.push(child.id);
                    queue.push(child.id);
                }
            }
        }
        Ok(ids)
    }

    /// Walk upward from the proposed parent; reaching the node being
    /// re-parented (or revisiting any node) means the move would close a
    /// cycle.
    async fn ensure_no_cycle(&self, org_id: Uuid, new_parent_id: Uuid) -> Result<(), ServiceError> {
        let mut visited = HashSet::new();
        let mut current = Some(new_parent_id);

        while let Some(node_id) = current {
            if node_id == org_id {
                return Err(ServiceError::CircularHierarchy);
            }
            if !visited.insert(node_id) {
                return Err(ServiceError::CircularHierarchy);
            }
            current = self
                .store
                .find_organization_by_id(node_id)
                .await
                .map_err(ServiceError::Store)?
                .and_then(|o| o.parent_id);
        }
        Ok(())
    }

    async fn audit_op(
        &self,
        actor: &str,
        action: &str,
        org_id: Uuid,
        message: String,
        details: serde_json::Value,
    ) {
        let entry = AuditEntry::new(
            actor,
            action,
            "organization",
            &org_id.to_string(),
            message,
            true,
            details,
        );
        if let Err(e) = self.audit.log_operation(entry).await {
            tracing::warn!(error = %e, action = %action, "Failed to write audit entry");
        }
    }

    async fn publish(&self, event: InvalidationEvent) {
        if let Err(e) = self.invalidation.invalidate(&event).await {
            tracing::warn!(
                error = %e,
                event_type = %event.event_type,
                "Cache invalidation failed after mutation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::services::audit::RecordingAuditSink;
    use crate::store::InMemoryDirectory;

    struct Fixture {
        service: OrganizationService,
        store: Arc<InMemoryDirectory>,
        audit: Arc<RecordingAuditSink>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDirectory::new());
        let cache = DirectoryCache::new(Arc::new(MemoryCache::new()));
        let audit = Arc::new(RecordingAuditSink::new());
        let invalidation = Arc::new(InvalidationCoordinator::new(cache.clone()));
        let service = OrganizationService::new(
            store.clone(),
            cache,
            audit.clone(),
            invalidation,
        );
        Fixture {
            service,
            store,
            audit,
        }
    }

    fn create_req(name: &str, parent_id: Option<Uuid>) -> CreateOrganizationRequest {
        CreateOrganizationRequest {
            name: name.to_string(),
            description: None,
            parent_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let f = fixture();
        let org = f
            .service
            .create_organization(create_req("acme", None), "admin")
            .await
            .unwrap();

        let found = f.service.get_organization(org.id).await.unwrap();
        assert_eq!(found.name, "acme");
        assert!(found.is_operational());
        assert_eq!(f.audit.operations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let f = fixture();
        f.service
            .create_organization(create_req("acme", None), "admin")
            .await
            .unwrap();

        let result = f
            .service
            .create_organization(create_req("acme", None), "admin")
            .await;
        assert!(matches!(result, Err(ServiceError::NameConflict(_))));
    }

    #[tokio::test]
    async fn test_parent_must_be_active() {
        let f = fixture();
        let parent = f
            .service
            .create_organization(create_req("parent", None), "admin")
            .await
            .unwrap();
        f.service.deactivate(parent.id, "admin").await.unwrap();

        let result = f
            .service
            .create_organization(create_req("child", Some(parent.id)), "admin")
            .await;
        assert!(matches!(result, Err(ServiceError::ParentInactive)));
    }

    #[tokio::test]
    async fn test_reparent_cycle_rejected() {
        let f = fixture();
        let a = f
            .service
            .create_organization(create_req("a", None), "admin")
            .await
            .unwrap();
        let b = f
            .service
            .create_organization(create_req("b", Some(a.id)), "admin")
            .await
            .unwrap();
        let c = f
            .service
            .create_organization(create_req("c", Some(b.id)), "admin")
            .await
            .unwrap();

        // a under c closes a -> b -> c -> a.
        let patch = UpdateOrganizationRequest {
            parent_id: Some(Some(c.id)),
            ..Default::default()
        };
        let result = f.service.update_organization(a.id, patch, "admin").await;
        assert!(matches!(result, Err(ServiceError::CircularHierarchy)));

        // Self-parenting is rejected outright.
        let patch = UpdateOrganizationRequest {
            parent_id: Some(Some(a.id)),
            ..Default::default()
        };
        let result = f.service.update_organization(a.id, patch, "admin").await;
        assert!(matches!(result, Err(ServiceError::CircularHierarchy)));
    }

    #[tokio::test]
    async fn test_reparent_records_hierarchy_change() {
        let f = fixture();
        let a = f
            .service
            .create_organization(create_req("a", None), "admin")
            .await
            .unwrap();
        let b = f
            .service
            .create_organization(create_req("b", None), "admin")
            .await
            .unwrap();

        let patch = UpdateOrganizationRequest {
            parent_id: Some(Some(a.id)),
            ..Default::default()
        };
        f.service
            .update_organization(b.id, patch, "admin")
            .await
            .unwrap();

        let changes = f.audit.hierarchy_changes.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_parent_id, None);
        assert_eq!(changes[0].new_parent_id, Some(a.id));
    }

    #[tokio::test]
    async fn test_delete_refused_with_children() {
        let f = fixture();
        let parent = f
            .service
            .create_organization(create_req("parent", None), "admin")
            .await
            .unwrap();
        f.service
            .create_organization(create_req("child", Some(parent.id)), "admin")
            .await
            .unwrap();

        let result = f.service.delete_organization(parent.id, "admin").await;
        assert!(matches!(result, Err(ServiceError::HasChildOrganizations)));
    }

    #[tokio::test]
    async fn test_delete_refused_with_active_groups() {
        let f = fixture();
        let org = f
            .service
            .create_organization(create_req("acme", None), "admin")
            .await
            .unwrap();
        let group = crate::models::Group::new(org.id, "devs".to_string(), None, None);
        f.store.insert_group(&group).await.unwrap();

        let result = f.service.delete_organization(org.id, "admin").await;
        assert!(matches!(result, Err(ServiceError::HasActiveGroups)));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_org_and_records_actor() {
        let f = fixture();
        let org = f
            .service
            .create_organization(create_req("acme", None), "admin")
            .await
            .unwrap();
        f.service.delete_organization(org.id, "admin").await.unwrap();

        assert!(matches!(
            f.service.get_organization(org.id).await,
            Err(ServiceError::OrganizationNotFound)
        ));

        // Row survives with the deleting actor recorded.
        let raw = f
            .store
            .find_organization_by_id(org.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw.lifecycle.deleted_by(), Some("admin"));

        // Deleting again is a conflict, not a repeat.
        assert!(matches!(
            f.service.delete_organization(org.id, "admin").await,
            Err(ServiceError::AlreadyDeleted)
        ));
    }

    #[tokio::test]
    async fn test_deactivate_refused_with_active_children() {
        let f = fixture();
        let parent = f
            .service
            .create_organization(create_req("parent", None), "admin")
            .await
            .unwrap();
        f.service
            .create_organization(create_req("child", Some(parent.id)), "admin")
            .await
            .unwrap();

        let result = f.service.deactivate(parent.id, "admin").await;
        assert!(matches!(result, Err(ServiceError::HasActiveChildren)));
    }

    #[tokio::test]
    async fn test_activate_requires_active_parent() {
        let f = fixture();
        let parent = f
            .service
            .create_organization(create_req("parent", None), "admin")
            .await
            .unwrap();
        let child = f
            .service
            .create_organization(create_req("child", Some(parent.id)), "admin")
            .await
            .unwrap();

        f.service.deactivate(child.id, "admin").await.unwrap();
        f.service.deactivate(parent.id, "admin").await.unwrap();

        assert!(matches!(
            f.service.activate(child.id, "admin").await,
            Err(ServiceError::ParentInactive)
        ));

        f.service.activate(parent.id, "admin").await.unwrap();
        let child = f.service.activate(child.id, "admin").await.unwrap();
        assert!(child.is_active);
    }

    #[tokio::test]
    async fn test_hierarchy_view_and_invalidation() {
        let f = fixture();
        let root = f
            .service
            .create_organization(create_req("root", None), "admin")
            .await
            .unwrap();
        let mid = f
            .service
            .create_organization(create_req("mid", Some(root.id)), "admin")
            .await
            .unwrap();

        let hierarchy = f.service.get_hierarchy(mid.id).await.unwrap();
        assert_eq!(hierarchy.parent_chain.len(), 1);
        assert_eq!(hierarchy.parent_chain[0].id, root.id);
        assert!(hierarchy.children.is_empty());

        // A new child invalidates the cached view through the created event.
        let leaf = f
            .service
            .create_organization(create_req("leaf", Some(mid.id)), "admin")
            .await
            .unwrap();
        let hierarchy = f.service.get_hierarchy(mid.id).await.unwrap();
        assert_eq!(hierarchy.children.len(), 1);
        assert_eq!(hierarchy.children[0].id, leaf.id);
    }

    #[tokio::test]
    async fn test_deleted_child_leaves_parent_children_listing() {
        let f = fixture();
        let parent = f
            .service
            .create_organization(create_req("parent", None), "admin")
            .await
            .unwrap();
        let child = f
            .service
            .create_organization(create_req("child", Some(parent.id)), "admin")
            .await
            .unwrap();

        // Warm the parent's children listing.
        let children = f.service.list_children(parent.id, false).await.unwrap();
        assert_eq!(children.len(), 1);

        f.service.delete_organization(child.id, "admin").await.unwrap();

        let children = f.service.list_children(parent.id, false).await.unwrap();
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn test_reparent_refreshes_descendant_parent_chain() {
        let f = fixture();
        let a = f
            .service
            .create_organization(create_req("a", None), "admin")
            .await
            .unwrap();
        let b = f
            .service
            .create_organization(create_req("b", Some(a.id)), "admin")
            .await
            .unwrap();
        let c = f
            .service
            .create_organization(create_req("c", Some(b.id)), "admin")
            .await
            .unwrap();

        // Warm c's hierarchy view with the old chain.
        let hierarchy = f.service.get_hierarchy(c.id).await.unwrap();
        let chain: Vec<Uuid> = hierarchy.parent_chain.iter().map(|o| o.id).collect();
        assert_eq!(chain, vec![b.id, a.id]);

        let d = f
            .service
            .create_organization(create_req("d", None), "admin")
            .await
            .unwrap();
        let patch = UpdateOrganizationRequest {
            parent_id: Some(Some(d.id)),
            ..Default::default()
        };
        f.service.update_organization(b.id, patch, "admin").await.unwrap();

        let hierarchy = f.service.get_hierarchy(c.id).await.unwrap();
        let chain: Vec<Uuid> = hierarchy.parent_chain.iter().map(|o| o.id).collect();
        assert_eq!(chain, vec![b.id, d.id]);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let f = fixture();
        let org = f
            .service
            .create_organization(create_req("acme", None), "admin")
            .await
            .unwrap();
        f.service
            .create_organization(create_req("child", Some(org.id)), "admin")
            .await
            .unwrap();
        let group = crate::models::Group::new(org.id, "devs".to_string(), None, None);
        f.store.insert_group(&group).await.unwrap();
        f.store
            .insert_membership(&crate::models::GroupMembership::new(
                group.id,
                org.id,
                Uuid::new_v4(),
                "admin",
                None,
                None,
            ))
            .await
            .unwrap();

        let stats = f.service.get_stats(org.id).await.unwrap();
        assert_eq!(stats.child_count, 1);
        assert_eq!(stats.group_count, 1);
        assert_eq!(stats.user_count, 1);
    }
}
