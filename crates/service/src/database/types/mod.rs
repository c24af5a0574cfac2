mod dkid;

pub use dkid::DKid;
