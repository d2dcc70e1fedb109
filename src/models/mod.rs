pub mod custom_field;
pub mod issue;
pub mod ticket;
