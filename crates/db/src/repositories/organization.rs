//! Organization repository.

use contab_core::chart::{ChartError, Organization};
use contab_shared::types::OrganizationId;
use contab_shared::{AppError, AppResult};
use tracing::info;

use crate::store::{Database, Tables};

/// Input for creating an organization.
#[derive(Debug, Clone)]
pub struct CreateOrganizationInput {
    /// Tax identification number.
    pub tax_id: String,
    /// Display name.
    pub name: String,
}

/// Organization repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    db: Database,
}

impl OrganizationRepository {
    /// Creates a new organization repository.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates an organization.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank tax id or name, `Conflict` when the
    /// (tax id, name) pair is taken.
    pub fn create(&self, input: CreateOrganizationInput) -> AppResult<Organization> {
        let tax_id = input.tax_id.trim().to_string();
        let name = input.name.trim().to_string();
        if tax_id.is_empty() || name.is_empty() {
            return Err(AppError::InvalidInput(
                "Organization tax id and name are required".into(),
            ));
        }

        let org = self.db.transaction(|tx| {
            if tx
                .organizations
                .find(|o| o.tax_id == tax_id && o.name == name)
                .is_some()
            {
                return Err(ChartError::DuplicateOrganization {
                    tax_id: tax_id.clone(),
                    name: name.clone(),
                }
                .into());
            }
            Ok::<_, AppError>(tx.organizations.insert(Organization {
                id: OrganizationId(0),
                tax_id,
                name,
                version: 0,
            }))
        })?;

        info!(org_id = %org.id, name = %org.name, "Organization created");
        Ok(org)
    }

    /// Finds an organization by ID.
    #[must_use]
    pub fn find_by_id(&self, id: OrganizationId) -> Option<Organization> {
        self.db.read(|t| t.organizations.get(id).cloned())
    }

    /// Lists every organization by creation order.
    #[must_use]
    pub fn list(&self) -> Vec<Organization> {
        self.db.read(|t| t.organizations.iter().cloned().collect())
    }
}

/// Loads an organization or fails with `NotFound`.
pub(crate) fn organization(tables: &Tables, id: OrganizationId) -> AppResult<&Organization> {
    tables
        .organizations
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Organization not found: {id}")))
}
