//! Pure renderers over the extracted record. Neither mutates its input
//! and neither can fail; display is never a source of errors.

pub mod summary;
pub mod value;
