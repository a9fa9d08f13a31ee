mod atomic_write;
pub mod file_header;
pub mod machine_save;
mod save_error;
mod save_plugin;

pub use atomic_write::atomic_write;
pub use machine_save::{
    apply_save_data, collect_save_data, decode_save, encode_save, ApplyReport, MachineSaveData,
    MachineThermalRecord,
};
pub use save_error::SaveError;
pub use save_plugin::{
    load_machines, save_machines, LoadMachinesEvent, MachineSavePlugin, SaveMachinesEvent,
    SaveSettings, SaveSlot,
};
