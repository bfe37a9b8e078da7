pub mod fill_expires_at;
