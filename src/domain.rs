pub mod entity;
pub mod entity_class;
pub mod state;
