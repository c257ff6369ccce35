pub mod access;
pub mod auth;
pub mod baas;
pub mod config;
pub mod dashboard;
pub mod database_validator;
pub mod delivery;
pub mod documents;
pub mod identity;
pub mod invites;
pub mod ledger;
pub mod maintenance;
pub mod notifications;
pub mod occupancy;
pub mod payments;
pub mod reports;
pub mod storage;
pub mod tenants;
pub mod units;

#[cfg(test)]
pub(crate) mod test_support;
