pub mod contract;
pub mod provisioning;
pub mod validation;
