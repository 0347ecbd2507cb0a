//! Static site publishing: turns post source directories into the live site
//! and emits the page index the search box reads.

pub mod index_builder;
pub mod post;
pub mod publisher;

pub use index_builder::{build_page_index, render_template};
pub use post::Post;
pub use publisher::{PublishReport, Publisher};
