pub mod activity;
pub mod contract;
pub mod document;
pub mod maintenance_request;
pub mod notification;
pub mod notification_template;
pub mod payment;
pub mod profile;
pub mod tenant;
pub mod unit;
