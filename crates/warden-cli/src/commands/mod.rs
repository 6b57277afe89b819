pub mod get;
pub mod lifecycle;
pub mod serve;
pub mod version;
