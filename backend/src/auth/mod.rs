//! Authentication primitives
//!
//! Password hashing (argon2 / bcrypt), session token issuance (JWT) and the
//! bearer-token extractor for protected routes.

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, TokenIssuer};
pub use middleware::AuthUser;
pub use password::PasswordService;
