pub mod pb {
    tonic::include_proto!("paygate");
}

pub mod convert;

pub mod auth;
pub mod card;
pub mod saldo;
pub mod topup;
pub mod transaction;
pub mod transfer;
pub mod withdraw;
