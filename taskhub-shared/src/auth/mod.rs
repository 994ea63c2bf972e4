/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: access-token generation and validation
/// - [`middleware`]: bearer extraction and the per-request `AuthContext`
/// - [`authorization`]: role and tenant checks applied by route handlers
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **Constant-time Comparison**: password verification is constant-time

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
