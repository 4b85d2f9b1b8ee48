pub mod cross_tenant;
pub mod guard;

pub use cross_tenant::{CrossTenantContext, CrossTenantError, CrossTenantReader};
pub use guard::{AccessControlGuard, AccessError, AccessRequestInput};
