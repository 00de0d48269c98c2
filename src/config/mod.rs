//! Configuration models for the mapper.

pub mod mapper;

pub use mapper::MapperConfig;
