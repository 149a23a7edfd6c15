pub mod agg;
pub mod browse;
pub mod feed;
pub mod follow;
pub mod init;
pub mod user;
