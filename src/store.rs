//! Data-layer seam consumed by the webhook dispatchers.
//!
//! The org/user/invitation records live in the main application database;
//! this crate only needs the handful of operations below. The [`Store`]
//! trait is the boundary, and [`MemoryStore`] is an in-process
//! implementation used for local runs and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::plans::PlanLimits;

/// Internal user identifier.
pub type UserId = String;

/// Internal organization identifier.
pub type OrgId = String;

/// A locally stored invitation awaiting acceptance at the identity provider.
#[derive(Debug, Clone)]
pub struct PendingInvitation {
    /// Invitation ID issued by the identity provider
    pub external_id: String,
    /// Role the invited user will receive
    pub role: String,
    /// Customer the invited user is scoped to, if any
    pub customer_id: Option<String>,
}

/// Organization record, keyed locally but addressable by its identity
/// provider ID.
#[derive(Debug, Clone)]
pub struct Organization {
    pub id: OrgId,
    /// Organization ID issued by the identity provider
    pub external_id: String,
    /// Billing provider customer ID, if the org has ever subscribed
    pub billing_customer_id: Option<String>,
}

/// Identity fields used to create or update a user from an accepted
/// invitation.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// User ID issued by the identity provider
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub org_id: OrgId,
    pub role: String,
    pub customer_id: Option<String>,
}

/// Errors surfaced by the data layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Operations the webhook dispatchers need from the data layer.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a pending invitation by its identity-provider ID.
    async fn pending_invitation_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PendingInvitation>, StoreError>;

    /// Look up an organization by its identity-provider ID.
    async fn organization_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Organization>, StoreError>;

    /// Create or update a user from an accepted invitation.
    ///
    /// Returns the internal ID of the synced user.
    async fn sync_user_from_invitation(&self, user: NewUser) -> Result<UserId, StoreError>;

    /// Delete a pending invitation by its identity-provider ID.
    async fn delete_pending_invitation(&self, external_id: &str) -> Result<(), StoreError>;

    /// Apply new plan limits to the organization owning a billing customer.
    ///
    /// Returns `None` when no organization matches the customer ID.
    async fn update_organization_plan(
        &self,
        customer_id: &str,
        limits: &PlanLimits,
    ) -> Result<Option<OrgId>, StoreError>;
}

/// In-memory store used by the default binary wiring and by tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    invitations: HashMap<String, PendingInvitation>,
    organizations: Vec<Organization>,
    users: HashMap<String, NewUser>,
    plans: HashMap<OrgId, PlanLimits>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a pending invitation.
    pub async fn insert_invitation(&self, invitation: PendingInvitation) {
        let mut inner = self.inner.lock().await;
        inner
            .invitations
            .insert(invitation.external_id.clone(), invitation);
    }

    /// Seed an organization.
    pub async fn insert_organization(&self, org: Organization) {
        let mut inner = self.inner.lock().await;
        inner.organizations.push(org);
    }

    /// Number of users synced so far.
    pub async fn user_count(&self) -> usize {
        self.inner.lock().await.users.len()
    }

    /// Plan limits currently applied to an organization, if any.
    pub async fn plan_for_org(&self, org_id: &str) -> Option<PlanLimits> {
        self.inner.lock().await.plans.get(org_id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn pending_invitation_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PendingInvitation>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.invitations.get(external_id).cloned())
    }

    async fn organization_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Organization>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .organizations
            .iter()
            .find(|o| o.external_id == external_id)
            .cloned())
    }

    async fn sync_user_from_invitation(&self, user: NewUser) -> Result<UserId, StoreError> {
        let mut inner = self.inner.lock().await;
        let user_id = format!("user-{}", user.external_id);
        inner.users.insert(user_id.clone(), user);
        Ok(user_id)
    }

    async fn delete_pending_invitation(&self, external_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.invitations.remove(external_id);
        Ok(())
    }

    async fn update_organization_plan(
        &self,
        customer_id: &str,
        limits: &PlanLimits,
    ) -> Result<Option<OrgId>, StoreError> {
        let mut inner = self.inner.lock().await;
        let org_id = inner
            .organizations
            .iter()
            .find(|o| o.billing_customer_id.as_deref() == Some(customer_id))
            .map(|o| o.id.clone());

        if let Some(ref id) = org_id {
            inner.plans.insert(id.clone(), limits.clone());
        }

        Ok(org_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans::FREE_TIER;

    #[tokio::test]
    async fn test_invitation_lifecycle() {
        let store = MemoryStore::new();
        store
            .insert_invitation(PendingInvitation {
                external_id: "inv-1".to_string(),
                role: "member".to_string(),
                customer_id: None,
            })
            .await;

        let found = store
            .pending_invitation_by_external_id("inv-1")
            .await
            .unwrap();
        assert!(found.is_some());

        store.delete_pending_invitation("inv-1").await.unwrap();
        let gone = store
            .pending_invitation_by_external_id("inv-1")
            .await
            .unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_update_plan_unknown_customer() {
        let store = MemoryStore::new();
        let result = store
            .update_organization_plan("cust-missing", &FREE_TIER)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
