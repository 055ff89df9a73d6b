pub mod draft;
pub mod preview;
pub mod resume;
