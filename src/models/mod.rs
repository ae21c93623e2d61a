pub mod device;
pub mod page_visit;
pub mod visitor;
