pub mod macro_transform;
pub mod s3_cleanup;
pub mod sequence_value;
