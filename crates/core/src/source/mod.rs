//! Item sources.
//!
//! A source lists the inputs it knows about and reads each one into an ordered
//! list of [`Item`](crate::item::Item)s. [`CsvDirectorySource`] reads headed CSV
//! files with `id` and `domain` columns from a directory.

mod csv_dir;
mod error;
mod traits;

pub use csv_dir::CsvDirectorySource;
pub use error::SourceError;
pub use traits::ItemSource;
