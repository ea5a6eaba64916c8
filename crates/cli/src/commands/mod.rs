pub mod chat;
pub mod fingerprint;
pub mod generate;
pub mod import;
pub mod init;
pub mod status;
pub mod summarize;
