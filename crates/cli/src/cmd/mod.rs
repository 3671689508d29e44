mod bridge;
mod clear;
mod help;
mod install;
mod list;
mod pack;
mod status;

pub use bridge::{cmd_bridge, cmd_run};
pub use clear::{cmd_clearcache, cmd_cleardata};
pub use help::cmd_help;
pub use install::{cmd_install, cmd_rebuild};
pub use list::cmd_list;
pub use pack::cmd_pack;
pub use status::cmd_status;
