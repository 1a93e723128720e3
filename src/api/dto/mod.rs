//! Data Transfer Objects for control API request/response serialization.

pub mod client_dto;
pub mod execute_dto;

pub use client_dto::*;
pub use execute_dto::*;
