mod process;

pub use process::*;
