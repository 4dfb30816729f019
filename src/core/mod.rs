pub mod axes;
pub mod consts;
pub mod control_loop;
pub mod error;
pub mod events;
pub mod mount;
