pub mod can_edit;
pub mod check;
pub mod grant;
pub mod node;
pub mod order;
pub mod pathway;
pub mod school;
pub mod summary;
pub mod visibility;
