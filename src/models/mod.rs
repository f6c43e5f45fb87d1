pub mod enums;
pub mod payment;
pub mod resident;

pub use enums::*;
pub use payment::*;
pub use resident::*;
