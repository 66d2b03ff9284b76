pub mod aws;
pub mod command;
pub mod cost;
pub mod inventory;
pub mod invoke;
pub mod object_store;
