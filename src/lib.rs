pub mod analyzer;
pub mod config;
pub mod dom;
pub mod error;
pub mod image_wrapper;
pub mod page;
pub mod page_index;
pub mod search;
pub mod site;
