pub mod wire;

pub use wire::{ApplicationContext, build_command_handler, initialize};
