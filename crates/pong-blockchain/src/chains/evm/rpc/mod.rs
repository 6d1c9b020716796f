pub(crate) mod account;
pub(crate) mod events;
pub(crate) mod transactions;
