pub mod assist;
pub mod health;
pub mod permissions;
pub mod roles;
