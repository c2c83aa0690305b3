pub(crate) mod auth;
pub(crate) mod referrals;
pub(crate) mod services;
