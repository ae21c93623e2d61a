pub mod hash_ip;
pub mod session_token;
pub mod time;
