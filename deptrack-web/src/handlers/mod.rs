//! HTTP request handlers, grouped by area

pub mod auth;
pub mod employees;
pub mod finance;
pub mod health;
pub mod inventory;
pub mod logs;
pub mod pages;
pub mod students;
pub mod study;
pub mod types;
pub mod users;

pub use auth::*;
pub use employees::*;
pub use finance::*;
pub use health::*;
pub use inventory::*;
pub use logs::*;
pub use pages::*;
pub use students::*;
pub use study::*;
pub use users::*;

pub use types::*;
