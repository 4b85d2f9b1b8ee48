use uuid::Uuid;

/// Marker for a caller holding platform-operator privileges. Constructed
/// explicitly at the call site; there is no default, so an unscoped query
/// can never be reached by leaving an argument out.
#[derive(Debug, Clone, Copy)]
pub struct PlatformAdmin;

/// Tenant scoping for list/query operations.
#[derive(Debug, Clone, Copy)]
pub enum QueryScope {
    /// Rows belonging to one tenant.
    Tenant(Uuid),
    /// All tenants. Requires the explicit platform-admin marker.
    Platform(PlatformAdmin),
}

impl QueryScope {
    pub fn tenant(tenant_id: Uuid) -> Self {
        Self::Tenant(tenant_id)
    }

    pub fn platform(admin: PlatformAdmin) -> Self {
        Self::Platform(admin)
    }

    pub(crate) fn tenant_filter(&self) -> Option<&Uuid> {
        match self {
            Self::Tenant(id) => Some(id),
            Self::Platform(_) => None,
        }
    }
}
