//! External service integrations.

pub mod services {
    pub use crate::services::*;
}

pub mod catalog {
    pub use crate::catalog::*;
}

pub mod storage {
    pub use crate::storage::*;
}
