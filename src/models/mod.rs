pub mod payment;
pub mod receipt;
pub mod response;

pub use payment::*;
pub use receipt::*;
pub use response::*;
