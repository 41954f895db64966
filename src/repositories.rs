pub mod admins;
pub mod orders;
pub mod otp;
pub mod payments;
pub mod sessions;
pub mod users;
pub mod wallets;

#[cfg(test)]
pub mod memory;
