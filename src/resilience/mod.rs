pub mod policy;

pub use policy::RxErrorPolicy;
