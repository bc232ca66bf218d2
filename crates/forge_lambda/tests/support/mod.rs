pub mod fakes;
pub mod requests;
