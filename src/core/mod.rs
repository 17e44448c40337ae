// Domain-layer modules and shared errors/models
pub mod application {
    pub use crate::application::*;
}

pub mod extraction {
    pub use crate::extraction::*;
}

pub mod validation {
    pub use crate::validation::*;
}

pub mod features {
    pub use crate::features::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod recommendation {
    pub use crate::recommendation::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
