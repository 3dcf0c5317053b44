mod role;
mod token;

pub use role::Role;
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
