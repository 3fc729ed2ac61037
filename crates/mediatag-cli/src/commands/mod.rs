pub mod init_config;
pub mod plugin_info;
pub mod tag;
