//! External service integrations.

pub mod geoclient {
    pub use crate::geoclient::*;
}

pub mod batch_resolver {
    pub use crate::batch_resolver::*;
}

pub mod job_queue {
    pub use crate::job_queue::*;
}

pub mod sources {
    pub use crate::sources::*;
}
