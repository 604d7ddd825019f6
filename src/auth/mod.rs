//! Account request contracts
//!
//! Typed bodies for the sign-up and sign-in collaborators that sit in front
//! of the connection cache. Credential storage and password hashing live
//! with those collaborators, not here.

pub mod contracts;

pub use contracts::{
    LoginRequest, NewAccount, SignupRequest, SignupResponse, INVALID_CREDENTIALS, SIGNUP_FAILED,
};
