//! Version resolution for the documentation source

pub mod resolver;
pub mod source;

pub use resolver::{
    date_key, parse_date, tag_key, Resolution, ResolveMode, ResolvedVersion, ValueOrigin,
    VersionResolver,
};
pub use source::{GithubSource, TagLookup, VersionSource};
