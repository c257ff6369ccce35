pub mod logging;
pub mod money;
pub mod response;
pub mod validation;
