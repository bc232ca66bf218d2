pub mod counter_store;
pub mod object_store;
pub mod response;
pub mod stack_status;
