//! Authentication and authorization: password hashing, signed tokens, and
//! the per-request authorization gate.

pub mod gate;
pub mod password;
pub mod token;

pub use gate::{AuthGate, TOKEN_HEADER};
pub use token::TokenService;
