pub mod cipher;
pub mod password;
pub mod token;
