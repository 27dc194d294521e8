pub mod documents;
pub mod identity;
pub mod notify;
pub mod profiles;
pub mod storage;
