pub mod chunked;
pub mod form;
