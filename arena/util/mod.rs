pub mod form;
pub mod frame;
pub mod sse;
