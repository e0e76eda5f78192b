pub mod flash;
pub mod forms;
pub mod models;
