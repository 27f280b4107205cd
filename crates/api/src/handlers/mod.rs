pub mod auth;
pub mod notification;
pub mod project;
pub mod reference;
pub mod user;
