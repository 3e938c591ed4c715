//! Built-in format drivers.

use std::sync::Arc;

use crate::driver::DriverImpl;

mod file;
mod mem;

pub(crate) fn builtin_drivers() -> Vec<Arc<dyn DriverImpl>> {
    vec![
        Arc::new(mem::MemDriver),
        Arc::new(file::FileDriver::bsq()),
        Arc::new(file::FileDriver::snap()),
    ]
}
