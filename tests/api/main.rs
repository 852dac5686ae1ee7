mod client_mirror;
mod health_check;
mod helpers;
mod home;
mod postgres_store;
mod subscriptions;
