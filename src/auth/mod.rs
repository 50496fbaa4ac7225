pub mod handlers;
pub mod tokens;

pub use tokens::{Claims, TokenKeys, TokenKind, TokenPair};
