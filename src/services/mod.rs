pub mod email;
pub mod otp;
pub mod session;
pub mod validation;
