//! Microsoft Graph access to the OneDrive item store

pub mod http_client;
pub mod onedrive_client;
pub mod onedrive_models;
