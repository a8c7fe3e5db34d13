pub mod init;
pub mod serve;
pub mod sweep;
pub mod tenants;
