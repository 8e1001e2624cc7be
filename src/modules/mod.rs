pub mod auth;
pub mod calculator;
pub mod health;
pub mod recommendations;
pub mod students;
