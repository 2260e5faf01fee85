//! Authentication infrastructure module

mod jwt;
mod password;
mod service;

pub use jwt::{Claims, JwtConfig, JwtService, TokenIssuer};
pub use password::{Argon2Hasher, PasswordHasher};
pub use service::{AccountService, AuthService, Credentials};
