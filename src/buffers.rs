//! Types describing application buffers: the C type a value is requested as, the length / null
//! indicator and the fixed size layouts written into them.

mod fixed_sized;
mod indicator;
mod target_type;

pub use self::{
    fixed_sized::{Pod, read_pod, write_pod},
    indicator::Indicator,
    target_type::TargetType,
};
