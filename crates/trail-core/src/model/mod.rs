pub mod entity;
pub mod ident;
pub mod user;
