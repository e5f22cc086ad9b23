pub mod authorizer;
pub mod resolver;

pub use authorizer::{Authorizer, Capability, GroupPermissions};
pub use resolver::{Grant, PermissionResolver};
