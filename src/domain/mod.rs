pub mod category;
pub mod news;
pub mod time;

pub use category::Classifier;
pub use news::{truncate_chars, Collection, NewsCategory, NewsItem, SourceType};
