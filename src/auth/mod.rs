mod countdown;
mod identity;
mod jwt;
mod manager;
mod middleware;
mod slot;
mod throttle;
mod types;

pub use identity::{AuthError, IdentityProvider, PostgresIdentity};
pub use manager::{AuthManager, LoginFailure};
pub use middleware::{bearer_token, AdminGuard};
pub use slot::{FileSlot, KeyValueSlot, MemorySlot};
pub use types::AdminUser;

#[cfg(test)]
pub use identity::MockIdentityProvider;
#[cfg(test)]
pub use types::Session;
