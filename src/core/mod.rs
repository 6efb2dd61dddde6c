// Domain-layer modules and shared errors/models
pub mod fetch_worker {
    pub use crate::fetch_worker::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod property_store {
    pub use crate::property_store::*;
}

pub mod errors {
    pub use crate::errors::*;
}
