pub mod auth;

pub use auth::{CurrentUser, StaffUser, SuperAdmin, TenantUser, authorize_tenant};
