pub mod catalog;
pub mod contact;
pub mod invoice;
pub mod quote;
