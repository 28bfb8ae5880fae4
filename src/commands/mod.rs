pub mod delete;
pub mod list;
pub mod metadata;
pub mod priority;
pub mod show;
pub mod status;
pub mod submit;
