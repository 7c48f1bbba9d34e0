//! Core data structures for parsed articles and fetch results.

mod article;
mod result;

pub use article::{
    AbstractSection, Article, Author, BodySection, FigureInfo, ReferenceInfo, TableInfo,
};
pub use result::FullTextResult;
