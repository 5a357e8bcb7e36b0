// Domain-layer modules and shared errors/models
pub mod acquisition {
    pub use crate::acquisition::*;
}

pub mod ghost_loads {
    pub use crate::ghost_loads::*;
}

pub mod wellness {
    pub use crate::wellness::*;
}

pub mod agents {
    pub use crate::agents::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
